// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Built-in operation handlers, one module per feature-area. Each module's
//! `handlers()` is that area's static registration table.

pub mod bookmark;
pub mod document;
pub mod paragraph;
pub mod properties;
pub mod table;
pub mod text;

use crate::error::HandlerError;
use crate::params::OperationParameters;

const PREVIEW_CHARS: usize = 80;

/// First characters of `text`, for listings
pub(crate) fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Block index argument
pub(crate) fn block_index(params: &OperationParameters) -> Result<usize, HandlerError> {
    params.required("index")
}

/// Optional heading level, rejected outside 1..=6
pub(crate) fn heading_level(params: &OperationParameters) -> Result<Option<u8>, HandlerError> {
    match params.optional::<u8>("level")? {
        Some(level) if !(1..=6).contains(&level) => {
            Err(HandlerError::invalid("level", "heading level must be between 1 and 6"))
        }
        other => Ok(other),
    }
}
