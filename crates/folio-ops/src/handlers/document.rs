// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `document` feature-area

use super::preview;
use crate::context::OperationContext;
use crate::error::{HandlerError, HandlerResult};
use crate::finalize::HandlerOutput;
use crate::params::OperationParameters;
use crate::registry::{ArgumentSpec, OperationHandler};
use folio_api_contract::ArgumentType;
use folio_document::{BlockContent, Format};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

pub fn handlers() -> Vec<Arc<dyn OperationHandler>> {
    vec![Arc::new(Info), Arc::new(Export), Arc::new(Outline)]
}

pub struct Info;

impl OperationHandler for Info {
    fn name(&self) -> &'static str {
        "info"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["summary"]
    }

    fn description(&self) -> &'static str {
        "Properties, block counts and where the document came from"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut OperationContext, _params: &OperationParameters) -> HandlerResult {
        let doc = ctx.document();
        Ok(HandlerOutput::Structured(json!({
            "session_id": ctx.session_id(),
            "source_path": ctx.source_path().map(|p| p.display().to_string()),
            "revision": ctx.revision(),
            "properties": doc.properties,
            "statistics": doc.statistics(),
        })))
    }
}

pub struct Export;

const EXPORT_ARGS: &[ArgumentSpec] = &[
    ArgumentSpec::required("path", ArgumentType::String, "Destination file"),
    ArgumentSpec::optional(
        "format",
        ArgumentType::String,
        "json, text or markdown; inferred from the extension when omitted",
    ),
];

impl OperationHandler for Export {
    fn name(&self) -> &'static str {
        "export"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["save_as"]
    }

    fn description(&self) -> &'static str {
        "Write a copy of the current document to a file"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        EXPORT_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let path: PathBuf = params.required::<String>("path")?.into();
        let format = params
            .optional::<String>("format")?
            .map(|f| f.parse::<Format>())
            .transpose()
            .map_err(|e| HandlerError::invalid("format", e.to_string()))?;
        ctx.export(&path, format)?;
        Ok(HandlerOutput::message(format!(
            "Exported document to {}",
            path.display()
        )))
    }
}

pub struct Outline;

impl OperationHandler for Outline {
    fn name(&self) -> &'static str {
        "outline"
    }

    fn description(&self) -> &'static str {
        "Headings in document order with their levels"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut OperationContext, _params: &OperationParameters) -> HandlerResult {
        let headings = ctx
            .document()
            .blocks()
            .iter()
            .enumerate()
            .filter_map(|(index, block)| match &block.content {
                BlockContent::Heading(h) => Some(json!({
                    "index": index,
                    "level": h.level,
                    "text": preview(&h.text),
                })),
                _ => None,
            });
        HandlerOutput::list(headings)
    }
}
