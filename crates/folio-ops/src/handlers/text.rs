// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `text` feature-area

use crate::context::OperationContext;
use crate::error::{HandlerError, HandlerResult};
use crate::finalize::HandlerOutput;
use crate::params::OperationParameters;
use crate::registry::{ArgumentSpec, OperationHandler};
use folio_api_contract::ArgumentType;
use serde_json::json;
use std::sync::Arc;

pub fn handlers() -> Vec<Arc<dyn OperationHandler>> {
    vec![Arc::new(Find), Arc::new(Replace), Arc::new(Statistics)]
}

pub struct Find;

const FIND_ARGS: &[ArgumentSpec] = &[
    ArgumentSpec::required("text", ArgumentType::String, "Text to search for"),
    ArgumentSpec::optional(
        "case_sensitive",
        ArgumentType::Boolean,
        "Match case exactly (default true)",
    ),
];

impl OperationHandler for Find {
    fn name(&self) -> &'static str {
        "find"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["search"]
    }

    fn description(&self) -> &'static str {
        "Locate occurrences of a string in every block"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        FIND_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let needle: String = params.required("text")?;
        if needle.is_empty() {
            return Err(HandlerError::invalid("text", "search text must not be empty"));
        }
        let case_sensitive = params.optional("case_sensitive")?.unwrap_or(true);
        HandlerOutput::list(ctx.document().find(&needle, case_sensitive))
    }
}

pub struct Replace;

const REPLACE_ARGS: &[ArgumentSpec] = &[
    ArgumentSpec::required("find", ArgumentType::String, "Text to replace"),
    ArgumentSpec::required(
        "replace",
        ArgumentType::String,
        "Replacement; an empty string deletes the matches",
    ),
    ArgumentSpec::optional("limit", ArgumentType::Integer, "Maximum number of replacements"),
];

impl OperationHandler for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn description(&self) -> &'static str {
        "Replace occurrences of a string across the document"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        REPLACE_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let find: String = params.required("find")?;
        let with: String = params.required("replace")?;
        let limit: Option<usize> = params.optional("limit")?;
        let count = ctx.document_mut().replace(&find, &with, limit)?;
        // No match, nothing to persist
        if count > 0 {
            ctx.mark_modified();
        }
        HandlerOutput::structured(&json!({ "replacements": count }))
    }
}

pub struct Statistics;

impl OperationHandler for Statistics {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["stats", "word_count"]
    }

    fn description(&self) -> &'static str {
        "Block, word and character counts"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut OperationContext, _params: &OperationParameters) -> HandlerResult {
        HandlerOutput::structured(&ctx.document().statistics())
    }
}
