// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `bookmark` feature-area

use super::{block_index, preview};
use crate::context::OperationContext;
use crate::error::HandlerResult;
use crate::finalize::HandlerOutput;
use crate::params::OperationParameters;
use crate::registry::{ArgumentSpec, OperationHandler};
use folio_api_contract::ArgumentType;
use serde_json::json;
use std::sync::Arc;

pub fn handlers() -> Vec<Arc<dyn OperationHandler>> {
    vec![Arc::new(Add), Arc::new(Get), Arc::new(List), Arc::new(Delete)]
}

const NAME: ArgumentSpec = ArgumentSpec::required("name", ArgumentType::String, "Bookmark name");
const NAME_ONLY: &[ArgumentSpec] = &[NAME];

pub struct Add;

const ADD_ARGS: &[ArgumentSpec] = &[
    NAME,
    ArgumentSpec::required("index", ArgumentType::Integer, "Block the bookmark points at"),
];

impl OperationHandler for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn description(&self) -> &'static str {
        "Attach a named bookmark to a block"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        ADD_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let name: String = params.required("name")?;
        let index = block_index(params)?;
        ctx.edit(|doc| doc.add_bookmark(&name, index))?;
        Ok(HandlerOutput::message(format!(
            "Bookmark '{}' added at block {}",
            name, index
        )))
    }
}

pub struct Get;

impl OperationHandler for Get {
    fn name(&self) -> &'static str {
        "get"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["goto"]
    }

    fn description(&self) -> &'static str {
        "Resolve a bookmark to its block"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        NAME_ONLY
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let name: String = params.required("name")?;
        let doc = ctx.document();
        let index = doc.bookmark(&name)?;
        let block = doc.block(index)?;
        HandlerOutput::structured(&json!({
            "name": name,
            "index": index,
            "kind": block.content.kind(),
            "text": preview(&block.content.plain_text()),
        }))
    }
}

pub struct List;

impl OperationHandler for List {
    fn name(&self) -> &'static str {
        "list"
    }

    fn description(&self) -> &'static str {
        "Every bookmark, sorted by name"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut OperationContext, _params: &OperationParameters) -> HandlerResult {
        HandlerOutput::list(
            ctx.document()
                .bookmarks()
                .into_iter()
                .map(|(name, index)| json!({ "name": name, "index": index })),
        )
    }
}

pub struct Delete;

impl OperationHandler for Delete {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["remove"]
    }

    fn description(&self) -> &'static str {
        "Remove a bookmark; the block stays"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        NAME_ONLY
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let name: String = params.required("name")?;
        ctx.edit(|doc| doc.remove_bookmark(&name))?;
        Ok(HandlerOutput::message(format!("Bookmark '{}' removed", name)))
    }
}
