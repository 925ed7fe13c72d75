// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Normalizing handler output into the tool response

use crate::context::OperationContext;
use crate::error::{HandlerError, OperationResult};
use crate::registry::FeatureArea;
use folio_api_contract::{Persistence, ToolCallResponse, ToolResult};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// What a handler produced
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    Message(String),
    Structured(Value),
    List(Vec<Value>),
}

impl HandlerOutput {
    pub fn message(text: impl Into<String>) -> Self {
        HandlerOutput::Message(text.into())
    }

    pub fn structured<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        serde_json::to_value(value)
            .map(HandlerOutput::Structured)
            .map_err(|e| HandlerError::Failed(format!("unserializable result: {}", e)))
    }

    pub fn list<T: Serialize>(items: impl IntoIterator<Item = T>) -> Result<Self, HandlerError> {
        items
            .into_iter()
            .map(|item| serde_json::to_value(&item))
            .collect::<Result<Vec<_>, _>>()
            .map(HandlerOutput::List)
            .map_err(|e| HandlerError::Failed(format!("unserializable result: {}", e)))
    }
}

impl From<HandlerOutput> for ToolResult {
    fn from(output: HandlerOutput) -> Self {
        match output {
            HandlerOutput::Message(text) => ToolResult::Message(text),
            HandlerOutput::Structured(value) => ToolResult::Structured(value),
            HandlerOutput::List(items) => ToolResult::List(items),
        }
    }
}

/// Persist the call's document if, and only if, the handler modified it,
/// then release the context and build the response.
pub(crate) async fn finalize(
    ctx: OperationContext,
    area: FeatureArea,
    operation: &str,
    output: HandlerOutput,
) -> OperationResult<ToolCallResponse> {
    let (document, output_path, modified) = ctx.into_parts();
    let session_id = document.session_id().map(str::to_owned);

    let (persisted, revision) = if modified {
        document.save(output_path.as_deref()).await?
    } else {
        if output_path.is_some() {
            debug!(operation, "Read-only call; output path left untouched");
        }
        (Persistence::None, document.revision())
    };

    Ok(ToolCallResponse {
        area: area.as_str().to_string(),
        operation: operation.to_string(),
        session_id,
        modified,
        persisted,
        revision,
        result: output.into(),
    })
}
