// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Operation dispatch and stateful document sessions
//!
//! A tool call names a feature-area (`paragraph`, `table`, ...) and an
//! operation within it. The [`Dispatcher`] resolves the handler from the
//! area's [`HandlerRegistry`], resolves the document the call works on (a
//! file loaded for this call alone, or an identity-scoped [`Session`] held in
//! the [`SessionStore`]), runs the handler on the blocking pool and persists
//! the document only if the handler changed it.

pub mod context;
pub mod dispatch;
pub mod error;
pub mod finalize;
pub mod handlers;
pub mod identity;
pub mod library;
pub mod params;
pub mod registry;
pub mod session;

pub use context::{ContextRequest, DocumentContext, OperationContext, SessionTarget};
pub use dispatch::Dispatcher;
pub use error::{HandlerError, HandlerResult, OperationError, OperationResult, RegistryError};
pub use finalize::HandlerOutput;
pub use identity::{AnonymousIdentity, Identity, IdentityAccessor};
pub use library::{DocumentLibrary, FileLibrary};
pub use params::OperationParameters;
pub use registry::{ArgumentSpec, FeatureArea, HandlerRegistry, OperationHandler, RegistrySet};
pub use session::{MissingSessionPolicy, Session, SessionConfig, SessionLease, SessionStore};
