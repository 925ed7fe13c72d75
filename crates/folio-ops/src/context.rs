// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Document context resolution and the per-call operation context

use crate::error::{HandlerError, OperationError, OperationResult};
use crate::identity::{Identity, IdentityAccessor};
use crate::library::DocumentLibrary;
use crate::session::{MissingSessionPolicy, SessionLease, SessionStore};
use folio_api_contract::Persistence;
use folio_document::{Document, Format};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Run a potentially blocking library call on the blocking pool, giving up
/// after `timeout`.
///
/// On timeout the closure keeps running to completion in the background
/// (blocking tasks cannot be preempted); whatever it owns, including a
/// session lock, is released when it returns.
pub(crate) async fn run_blocking<T, F>(operation: &str, timeout: Duration, f: F) -> OperationResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join)) => Err(OperationError::Internal(format!(
            "'{}' aborted: {}",
            operation, join
        ))),
        Err(_) => Err(OperationError::Timeout {
            operation: operation.to_string(),
            after: timeout,
        }),
    }
}

async fn load_document(
    library: &Arc<dyn DocumentLibrary>,
    path: &Path,
    timeout: Duration,
) -> OperationResult<Document> {
    let library = Arc::clone(library);
    let owned = path.to_path_buf();
    run_blocking("load", timeout, move || library.load(&owned))
        .await?
        .map_err(|source| OperationError::DocumentLoad {
            path: path.to_path_buf(),
            source,
        })
}

/// Which session a call wants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    /// A session created earlier, by id
    Existing(String),
    /// A fresh session, populated from the call's path or blank
    New,
}

/// Inputs to [`DocumentContext::acquire`]
pub struct ContextRequest<'a> {
    pub store: Option<&'a Arc<SessionStore>>,
    pub session: Option<SessionTarget>,
    pub path: Option<PathBuf>,
    pub identity: &'a dyn IdentityAccessor,
    pub library: &'a Arc<dyn DocumentLibrary>,
    pub timeout: Duration,
}

enum Lease {
    Session(SessionLease),
    File(Box<Document>),
}

/// Scoped access to the document a call operates on.
///
/// Either borrowed from a session (holding that session's lock) or loaded
/// from a path for this call alone. Dropping the context releases it on every
/// exit path.
pub struct DocumentContext {
    lease: Lease,
    source_path: Option<PathBuf>,
    library: Arc<dyn DocumentLibrary>,
    timeout: Duration,
}

impl DocumentContext {
    pub async fn acquire(request: ContextRequest<'_>) -> OperationResult<Self> {
        let ContextRequest {
            store,
            session,
            path,
            identity,
            library,
            timeout,
        } = request;

        if let (Some(store), Some(target)) = (store, session) {
            let identity = identity.current_identity();
            let (id, policy) = match &target {
                SessionTarget::Existing(id) => {
                    (Some(id.as_str()), store.config().missing_session_policy())
                }
                SessionTarget::New => (None, MissingSessionPolicy::Reject),
            };
            let source = path.as_ref();
            let session = store
                .get_or_create(id, &identity, policy, move || async move {
                    match source {
                        Some(path) => Ok((load_document(library, path, timeout).await?, Some(path.clone()))),
                        None => Ok((library.blank(), None)),
                    }
                })
                .await?;
            // The path only seeds a session when this call created it
            if path.is_some() && session.source_path() != path.as_ref() {
                debug!(session_id = session.id(), "Ignoring source path for an existing session");
            }
            let lease = session.lock().await?;
            return Ok(Self {
                source_path: session.source_path().cloned(),
                lease: Lease::Session(lease),
                library: Arc::clone(library),
                timeout,
            });
        }

        let path = path.ok_or_else(|| {
            OperationError::invalid("path", "a source path is required when no session is used")
        })?;
        let document = load_document(library, &path, timeout).await?;
        Ok(Self {
            lease: Lease::File(Box::new(document)),
            source_path: Some(path),
            library: Arc::clone(library),
            timeout,
        })
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.lease {
            Lease::Session(lease) => Some(lease.id()),
            Lease::File(_) => None,
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn revision(&self) -> Option<u64> {
        match &self.lease {
            Lease::Session(lease) => Some(lease.session().revision()),
            Lease::File(_) => None,
        }
    }

    pub fn document(&self) -> &Document {
        match &self.lease {
            Lease::Session(lease) => &**lease,
            Lease::File(document) => &**document,
        }
    }

    pub fn document_mut(&mut self) -> &mut Document {
        match &mut self.lease {
            Lease::Session(lease) => &mut **lease,
            Lease::File(document) => &mut **document,
        }
    }

    /// Serialize the current document to `path` without affecting where the
    /// context itself persists. Blocking; call from the blocking pool.
    pub fn export(&self, path: &Path, format: Option<Format>) -> OperationResult<()> {
        self.library
            .save(self.document(), path, format)
            .map_err(|source| OperationError::DocumentSave {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Persist a modification and release the context.
    ///
    /// Session mode keeps the document resident and records a new revision;
    /// `output_path` is ignored there because exporting is a separate action.
    /// File mode writes to `output_path`, or back to the source path.
    pub async fn save(self, output_path: Option<&Path>) -> OperationResult<(Persistence, Option<u64>)> {
        match self.lease {
            Lease::Session(lease) => {
                if output_path.is_some() {
                    debug!(session_id = lease.id(), "Session edit kept resident; output path not written");
                }
                let revision = lease.commit();
                Ok((Persistence::Resident, Some(revision)))
            }
            Lease::File(document) => {
                let target = output_path
                    .map(Path::to_path_buf)
                    .or(self.source_path)
                    .ok_or_else(|| OperationError::invalid("output_path", "nowhere to save the document"))?;
                let library = self.library;
                let dest = target.clone();
                run_blocking("save", self.timeout, move || library.save(&document, &dest, None))
                    .await?
                    .map_err(|source| OperationError::DocumentSave {
                        path: target.clone(),
                        source,
                    })?;
                Ok((
                    Persistence::Saved {
                        path: target.display().to_string(),
                    },
                    None,
                ))
            }
        }
    }
}

/// Everything a handler sees of the call it serves
pub struct OperationContext {
    document: DocumentContext,
    output_path: Option<PathBuf>,
    modified: bool,
    sessions: Option<Arc<SessionStore>>,
    identity: Arc<dyn IdentityAccessor>,
}

impl OperationContext {
    pub fn new(
        document: DocumentContext,
        output_path: Option<PathBuf>,
        sessions: Option<Arc<SessionStore>>,
        identity: Arc<dyn IdentityAccessor>,
    ) -> Self {
        Self {
            document,
            output_path,
            modified: false,
            sessions,
            identity,
        }
    }

    pub fn document(&self) -> &Document {
        self.document.document()
    }

    /// Raw mutable access. Handlers that change the document through this
    /// must call [`OperationContext::mark_modified`] themselves.
    pub fn document_mut(&mut self) -> &mut Document {
        self.document.document_mut()
    }

    /// Apply a mutation, flagging the document as modified when it succeeds
    pub fn edit<T, E, F>(&mut self, f: F) -> Result<T, HandlerError>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: Into<HandlerError>,
    {
        let value = f(self.document.document_mut()).map_err(Into::into)?;
        self.modified = true;
        Ok(value)
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn session_id(&self) -> Option<&str> {
        self.document.session_id()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.document.source_path()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn revision(&self) -> Option<u64> {
        self.document.revision()
    }

    pub fn identity(&self) -> Identity {
        self.identity.current_identity()
    }

    pub fn sessions(&self) -> Option<&Arc<SessionStore>> {
        self.sessions.as_ref()
    }

    pub fn export(&self, path: &Path, format: Option<Format>) -> Result<(), HandlerError> {
        self.document
            .export(path, format)
            .map_err(|e| HandlerError::Operation(Box::new(e)))
    }

    pub(crate) fn into_parts(self) -> (DocumentContext, Option<PathBuf>, bool) {
        (self.document, self.output_path, self.modified)
    }
}
