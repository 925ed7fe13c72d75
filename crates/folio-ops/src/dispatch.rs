// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Entry point composing registry lookup, context resolution, handler
//! execution and finalization

use crate::context::{run_blocking, ContextRequest, DocumentContext, OperationContext, SessionTarget};
use crate::error::{OperationError, OperationResult, RegistryError};
use crate::finalize::finalize;
use crate::identity::{Identity, IdentityAccessor};
use crate::library::{DocumentLibrary, FileLibrary};
use crate::params::OperationParameters;
use crate::registry::RegistrySet;
use crate::session::{SessionConfig, SessionStore};
use folio_api_contract::{ExportResponse, SessionSummary, ToolCallRequest, ToolCallResponse, ToolCatalog};
use folio_document::Format;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

/// Routes tool calls to handlers. Cheap to clone; clones share the
/// registries, the session store and the library.
#[derive(Clone)]
pub struct Dispatcher {
    registries: Arc<RegistrySet>,
    sessions: Option<Arc<SessionStore>>,
    library: Arc<dyn DocumentLibrary>,
    timeout: Duration,
}

impl Dispatcher {
    /// `sessions = None` runs every call in file mode
    pub fn new(
        registries: RegistrySet,
        sessions: Option<Arc<SessionStore>>,
        library: Arc<dyn DocumentLibrary>,
        timeout: Duration,
    ) -> Self {
        Self {
            registries: Arc::new(registries),
            sessions,
            library,
            timeout,
        }
    }

    /// Built-in feature-areas, a session store and the file library
    pub fn with_defaults(config: SessionConfig) -> Result<Self, RegistryError> {
        let timeout = config.operation_timeout();
        Ok(Self::new(
            RegistrySet::builtin()?,
            Some(Arc::new(SessionStore::new(config))),
            Arc::new(FileLibrary),
            timeout,
        ))
    }

    pub fn sessions(&self) -> Option<&Arc<SessionStore>> {
        self.sessions.as_ref()
    }

    pub fn registries(&self) -> &RegistrySet {
        &self.registries
    }

    pub fn catalog(&self) -> ToolCatalog {
        self.registries.catalog()
    }

    /// Execute one operation of feature-area `area`
    pub async fn dispatch(
        &self,
        identity: Arc<dyn IdentityAccessor>,
        area: &str,
        request: ToolCallRequest,
    ) -> OperationResult<ToolCallResponse> {
        let call_id = folio_logging::correlation_id();
        let span = info_span!(
            "dispatch",
            area,
            operation = %request.operation,
            call_id = %call_id
        );
        self.dispatch_inner(identity, area, request).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        identity: Arc<dyn IdentityAccessor>,
        area: &str,
        request: ToolCallRequest,
    ) -> OperationResult<ToolCallResponse> {
        let started = Instant::now();
        let registry = self.registries.resolve(area)?;
        let handler = registry.handler(&request.operation)?;
        let area = registry.area();
        let operation = handler.name();

        let session = match (request.session_id, request.open_session) {
            (Some(id), _) => Some(SessionTarget::Existing(id)),
            (None, true) => Some(SessionTarget::New),
            (None, false) => None,
        };
        if session.is_some() && self.sessions.is_none() {
            debug!("Sessions disabled; running in file mode");
        }

        let document = DocumentContext::acquire(ContextRequest {
            store: self.sessions.as_ref(),
            session,
            path: request.path.map(PathBuf::from),
            identity: identity.as_ref(),
            library: &self.library,
            timeout: self.timeout,
        })
        .await?;
        let session_id = document.session_id().map(str::to_owned);

        let ctx = OperationContext::new(
            document,
            request.output_path.map(PathBuf::from),
            self.sessions.clone(),
            Arc::clone(&identity),
        );
        let params = OperationParameters::from(request.arguments);

        let execution = run_blocking(operation, self.timeout, move || {
            let mut ctx = ctx;
            let result = handler.execute(&mut ctx, &params);
            (ctx, result)
        })
        .await;

        let (ctx, result) = match execution {
            Ok(done) => done,
            Err(err) => {
                if let (Some(id), Some(store)) = (&session_id, &self.sessions) {
                    // The handler may still be mutating the document
                    warn!(session_id = %id, error = %err, "Evicting session after failed execution");
                    store.evict(id).await;
                }
                return Err(err);
            }
        };

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let err = OperationError::from_handler(operation, err);
                debug!(error = %err, "Operation rejected");
                return Err(err);
            }
        };

        let response = finalize(ctx, area, operation, output).await?;
        info!(
            session_id = response.session_id.as_deref().unwrap_or("-"),
            modified = response.modified,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Operation completed"
        );
        Ok(response)
    }

    fn store(&self) -> OperationResult<&Arc<SessionStore>> {
        self.sessions
            .as_ref()
            .ok_or_else(|| OperationError::Internal("sessions are disabled".to_string()))
    }

    /// Open a session, optionally populated from `path`
    pub async fn create_session(
        &self,
        identity: &Identity,
        path: Option<PathBuf>,
    ) -> OperationResult<SessionSummary> {
        let store = self.store()?;
        let document = DocumentContext::acquire(ContextRequest {
            store: Some(store),
            session: Some(SessionTarget::New),
            path,
            identity,
            library: &self.library,
            timeout: self.timeout,
        })
        .await?;
        let id = document
            .session_id()
            .map(str::to_owned)
            .ok_or_else(|| OperationError::Internal("session context without an id".to_string()))?;
        drop(document);
        Ok(store.get(&id, identity).await?.summary())
    }

    pub async fn close_session(&self, session_id: &str, identity: &Identity) -> OperationResult<()> {
        self.store()?.remove(session_id, identity).await
    }

    pub async fn list_sessions(&self, identity: &Identity) -> OperationResult<Vec<SessionSummary>> {
        Ok(self.store()?.list(identity).await)
    }

    pub async fn session_summary(
        &self,
        session_id: &str,
        identity: &Identity,
    ) -> OperationResult<SessionSummary> {
        Ok(self.store()?.get(session_id, identity).await?.summary())
    }

    /// Serialize a session's current document to `output_path`. The session
    /// itself is unchanged.
    pub async fn export_session(
        &self,
        session_id: &str,
        identity: &Identity,
        output_path: PathBuf,
        format: Option<&str>,
    ) -> OperationResult<ExportResponse> {
        let format = match format {
            Some(name) => name
                .parse::<Format>()
                .map_err(|e| OperationError::invalid("format", e.to_string()))?,
            None => Format::from_path(&output_path)
                .map_err(|e| OperationError::invalid("output_path", e.to_string()))?,
        };

        let store = self.store()?;
        let session = store.get(session_id, identity).await?;
        let document = DocumentContext::acquire(ContextRequest {
            store: Some(store),
            session: Some(SessionTarget::Existing(session.id().to_string())),
            path: None,
            identity,
            library: &self.library,
            timeout: self.timeout,
        })
        .await?;
        let revision = document.revision().unwrap_or_default();

        let target = output_path.clone();
        run_blocking("export", self.timeout, move || document.export(&target, Some(format))).await??;
        info!(session_id, path = %output_path.display(), %format, "Session exported");

        Ok(ExportResponse {
            session_id: session_id.to_string(),
            path: output_path.display().to_string(),
            format: format.as_str().to_string(),
            revision,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("areas", &self.registries.areas())
            .field("sessions", &self.sessions.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
