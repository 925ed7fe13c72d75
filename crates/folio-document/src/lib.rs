// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Folio document library
//!
//! A small structured document model (properties, paragraphs, headings,
//! tables and bookmarks) together with its on-disk codecs. The API is
//! synchronous and a [`Document`] is not safe to mutate from two threads at
//! once; the operation server wraps every instance in its own lock.

pub mod document;
pub mod error;
pub mod format;
pub mod model;

pub use document::{Document, Statistics, TextMatch};
pub use error::{DocumentError, DocumentResult};
pub use format::{load, save, Format};
pub use model::*;
