// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types raised by the document library

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the document library
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors raised while loading, saving or mutating a document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Unsupported format '{0}'")]
    UnsupportedFormat(String),

    #[error("Format '{0}' cannot be loaded, only exported")]
    ExportOnly(&'static str),

    #[error("Block index {index} out of range (document has {len} blocks)")]
    BlockOutOfRange { index: usize, len: usize },

    #[error("Block {index} is not a {expected}")]
    WrongBlockKind { index: usize, expected: &'static str },

    #[error("Cell ({row}, {column}) out of range for a {rows}x{columns} table")]
    CellOutOfRange {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },

    #[error("Bookmark '{0}' not found")]
    BookmarkNotFound(String),

    #[error("Bookmark '{0}' already exists")]
    BookmarkExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl DocumentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::Io {
            path: path.into(),
            source,
        }
    }
}
