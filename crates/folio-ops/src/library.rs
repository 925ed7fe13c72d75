// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Seam to the document library

use folio_document::{Document, DocumentResult, Format};
use std::path::Path;

/// Synchronous load/save entry points of the document library.
///
/// Calls may block; the operation layer always runs them on the blocking
/// pool under a timeout.
pub trait DocumentLibrary: Send + Sync + 'static {
    fn load(&self, path: &Path) -> DocumentResult<Document>;

    fn save(&self, document: &Document, path: &Path, format: Option<Format>) -> DocumentResult<()>;

    /// Document used for sessions opened without a source path
    fn blank(&self) -> Document {
        Document::new()
    }
}

/// The on-disk codecs of `folio-document`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLibrary;

impl DocumentLibrary for FileLibrary {
    fn load(&self, path: &Path) -> DocumentResult<Document> {
        folio_document::load(path)
    }

    fn save(&self, document: &Document, path: &Path, format: Option<Format>) -> DocumentResult<()> {
        folio_document::save(document, path, format)
    }
}
