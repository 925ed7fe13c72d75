// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Folio tool API contract types and validation
//!
//! These types are shared between the operation layer, which produces them,
//! and the REST server and its tests, which put them on the wire.

pub mod error;
pub mod types;
pub mod validation;

pub use error::*;
pub use types::*;
