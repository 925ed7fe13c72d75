// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Caller identity used to isolate sessions between clients

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque caller-distinguishing token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    const ANONYMOUS: &'static str = "anonymous";

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The single identity shared by every caller of a single-tenant server
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves who is making the current call.
///
/// Must be stable for one logical client and distinct across clients.
pub trait IdentityAccessor: Send + Sync {
    fn current_identity(&self) -> Identity;
}

/// Identity resolved once by the transport for the call in flight
impl IdentityAccessor for Identity {
    fn current_identity(&self) -> Identity {
        self.clone()
    }
}

/// Every caller is the same client. Isolation degrades to a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityAccessor for AnonymousIdentity {
    fn current_identity(&self) -> Identity {
        Identity::anonymous()
    }
}
