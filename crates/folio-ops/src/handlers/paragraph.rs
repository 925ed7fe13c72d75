// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `paragraph` feature-area: paragraphs and headings

use super::{block_index, heading_level};
use crate::context::OperationContext;
use crate::error::{HandlerError, HandlerResult};
use crate::finalize::HandlerOutput;
use crate::params::OperationParameters;
use crate::registry::{ArgumentSpec, OperationHandler};
use folio_api_contract::ArgumentType;
use folio_document::{Block, BlockContent, DocumentError, Heading, Paragraph};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn handlers() -> Vec<Arc<dyn OperationHandler>> {
    vec![
        Arc::new(Add),
        Arc::new(Insert),
        Arc::new(Get),
        Arc::new(List),
        Arc::new(Update),
        Arc::new(Delete),
        Arc::new(SetStyle),
    ]
}

const TEXT: ArgumentSpec = ArgumentSpec::required("text", ArgumentType::String, "Paragraph text");
const STYLE: ArgumentSpec =
    ArgumentSpec::optional("style", ArgumentType::String, "Named paragraph style");
const LEVEL: ArgumentSpec = ArgumentSpec::optional(
    "level",
    ArgumentType::Integer,
    "Heading level 1-6; creates a heading instead of a paragraph",
);
const INDEX: ArgumentSpec =
    ArgumentSpec::required("index", ArgumentType::Integer, "Zero-based block index");
const INDEX_ONLY: &[ArgumentSpec] = &[INDEX];

/// Paragraph or heading built from `text`, `style` and `level`
fn content_from(params: &OperationParameters) -> Result<BlockContent, HandlerError> {
    let text: String = params.required("text")?;
    match heading_level(params)? {
        Some(level) => {
            if params.contains("style") {
                return Err(HandlerError::invalid("style", "headings do not take a style"));
            }
            Ok(BlockContent::Heading(Heading { level, text }))
        }
        None => Ok(BlockContent::Paragraph(Paragraph {
            text,
            style: params.optional("style")?,
        })),
    }
}

fn describe(index: usize, block: &Block) -> Option<Value> {
    match &block.content {
        BlockContent::Paragraph(p) => Some(json!({
            "index": index,
            "kind": "paragraph",
            "text": p.text,
            "style": p.style,
        })),
        BlockContent::Heading(h) => Some(json!({
            "index": index,
            "kind": "heading",
            "level": h.level,
            "text": h.text,
        })),
        BlockContent::Table(_) => None,
    }
}

/// Index of a paragraph or heading; tables are managed by their own area
fn text_block(ctx: &OperationContext, index: usize) -> Result<&Block, HandlerError> {
    let block = ctx.document().block(index)?;
    if matches!(block.content, BlockContent::Table(_)) {
        return Err(DocumentError::WrongBlockKind {
            index,
            expected: "paragraph or heading",
        }
        .into());
    }
    Ok(block)
}

pub struct Add;

const ADD_ARGS: &[ArgumentSpec] = &[TEXT, STYLE, LEVEL];

impl OperationHandler for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["append"]
    }

    fn description(&self) -> &'static str {
        "Append a paragraph or heading to the end of the document"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        ADD_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let content = content_from(params)?;
        let kind = content.kind();
        let index = ctx.edit(|doc| Ok::<_, HandlerError>(doc.push_block(content)))?;
        HandlerOutput::structured(&json!({ "index": index, "kind": kind }))
    }
}

pub struct Insert;

const INSERT_ARGS: &[ArgumentSpec] = &[
    ArgumentSpec::required(
        "index",
        ArgumentType::Integer,
        "Position to insert before; the block count appends",
    ),
    TEXT,
    STYLE,
    LEVEL,
];

impl OperationHandler for Insert {
    fn name(&self) -> &'static str {
        "insert"
    }

    fn description(&self) -> &'static str {
        "Insert a paragraph or heading before the given block"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        INSERT_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        let content = content_from(params)?;
        let kind = content.kind();
        let index = ctx.edit(|doc| doc.insert_block(index, content))?;
        HandlerOutput::structured(&json!({ "index": index, "kind": kind }))
    }
}

pub struct Get;

impl OperationHandler for Get {
    fn name(&self) -> &'static str {
        "get"
    }

    fn description(&self) -> &'static str {
        "Text, kind and style of one paragraph or heading"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        INDEX_ONLY
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        let block = text_block(ctx, index)?;
        let value = describe(index, block)
            .ok_or_else(|| HandlerError::Failed(format!("block {} has no text", index)))?;
        Ok(HandlerOutput::Structured(value))
    }
}

pub struct List;

impl OperationHandler for List {
    fn name(&self) -> &'static str {
        "list"
    }

    fn description(&self) -> &'static str {
        "Every paragraph and heading in document order"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut OperationContext, _params: &OperationParameters) -> HandlerResult {
        let items = ctx
            .document()
            .blocks()
            .iter()
            .enumerate()
            .filter_map(|(i, b)| describe(i, b));
        HandlerOutput::list(items)
    }
}

pub struct Update;

const UPDATE_ARGS: &[ArgumentSpec] = &[INDEX, TEXT];

impl OperationHandler for Update {
    fn name(&self) -> &'static str {
        "update"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["set_text"]
    }

    fn description(&self) -> &'static str {
        "Replace the text of a paragraph or heading"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        UPDATE_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        let text: String = params.required("text")?;
        ctx.edit(|doc| doc.set_text(index, text))?;
        Ok(HandlerOutput::message(format!("Updated block {}", index)))
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
        "Remove a paragraph or heading; bookmarks on it are removed too"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        INDEX_ONLY
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        text_block(ctx, index)?;
        let (removed, bookmarks) = ctx.edit(|doc| doc.remove_block(index))?;
        HandlerOutput::structured(&json!({
            "index": index,
            "kind": removed.content.kind(),
            "removed_bookmarks": bookmarks,
        }))
    }
}

pub struct SetStyle;

const SET_STYLE_ARGS: &[ArgumentSpec] = &[
    INDEX,
    ArgumentSpec::optional(
        "style",
        ArgumentType::String,
        "Style name; omit to clear the style",
    ),
];

impl OperationHandler for SetStyle {
    fn name(&self) -> &'static str {
        "set_style"
    }

    fn description(&self) -> &'static str {
        "Set or clear the named style of a paragraph"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        SET_STYLE_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        let style: Option<String> = params.optional("style")?;
        if style.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(HandlerError::invalid(
                "style",
                "style name must not be blank; omit it to clear",
            ));
        }
        let message = match &style {
            Some(name) => format!("Applied style '{}' to paragraph {}", name, index),
            None => format!("Cleared style of paragraph {}", index),
        };
        ctx.edit(|doc| doc.set_paragraph_style(index, style))?;
        Ok(HandlerOutput::message(message))
    }
}
