// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `table` feature-area

use super::block_index;
use crate::context::OperationContext;
use crate::error::{HandlerError, HandlerResult};
use crate::finalize::HandlerOutput;
use crate::params::OperationParameters;
use crate::registry::{ArgumentSpec, OperationHandler};
use folio_api_contract::ArgumentType;
use folio_document::{BlockContent, Table};
use serde_json::json;
use std::sync::Arc;

pub fn handlers() -> Vec<Arc<dyn OperationHandler>> {
    vec![
        Arc::new(Add),
        Arc::new(Get),
        Arc::new(List),
        Arc::new(SetCell),
        Arc::new(AddRow),
        Arc::new(Delete),
    ]
}

const INDEX: ArgumentSpec =
    ArgumentSpec::required("index", ArgumentType::Integer, "Block index of the table");
const INDEX_ONLY: &[ArgumentSpec] = &[INDEX];

/// Largest table `add` will create
const MAX_CELLS: usize = 10_000;

pub struct Add;

const ADD_ARGS: &[ArgumentSpec] = &[
    ArgumentSpec::optional("rows", ArgumentType::Integer, "Row count; defaults to the data's"),
    ArgumentSpec::optional("columns", ArgumentType::Integer, "Column count; defaults to the data's"),
    ArgumentSpec::optional("data", ArgumentType::Table, "Initial cell values, row by row"),
    ArgumentSpec::optional("index", ArgumentType::Integer, "Insert position; appends when omitted"),
];

impl OperationHandler for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["create"]
    }

    fn description(&self) -> &'static str {
        "Create a table, empty or filled from data"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        ADD_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let data: Vec<Vec<String>> = params.optional("data")?.unwrap_or_default();
        let rows = params.optional::<usize>("rows")?.unwrap_or(data.len());
        let columns = params
            .optional::<usize>("columns")?
            .unwrap_or_else(|| data.iter().map(Vec::len).max().unwrap_or(0));
        if rows == 0 || columns == 0 {
            return Err(HandlerError::invalid(
                if rows == 0 { "rows" } else { "columns" },
                "a table needs at least one row and one column",
            ));
        }
        if rows.saturating_mul(columns) > MAX_CELLS {
            return Err(HandlerError::invalid(
                "rows",
                format!("a table may have at most {} cells", MAX_CELLS),
            ));
        }
        if data.len() > rows || data.iter().any(|r| r.len() > columns) {
            return Err(HandlerError::invalid(
                "data",
                format!("data does not fit a {}x{} table", rows, columns),
            ));
        }

        let mut table = Table::new(rows, columns);
        for (target, source) in table.rows.iter_mut().zip(data) {
            for (cell, value) in target.iter_mut().zip(source) {
                *cell = value;
            }
        }
        let at: Option<usize> = params.optional("index")?;
        let index = ctx.edit(|doc| match at {
            Some(at) => doc.insert_block(at, BlockContent::Table(table)),
            None => Ok(doc.push_block(BlockContent::Table(table))),
        })?;
        HandlerOutput::structured(&json!({ "index": index, "rows": rows, "columns": columns }))
    }
}

pub struct Get;

impl OperationHandler for Get {
    fn name(&self) -> &'static str {
        "get"
    }

    fn description(&self) -> &'static str {
        "Cell values of one table"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        INDEX_ONLY
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        let table = ctx.document().table(index)?;
        HandlerOutput::structured(&json!({
            "index": index,
            "rows": table.row_count(),
            "columns": table.column_count(),
            "cells": table.rows,
        }))
    }
}

pub struct List;

impl OperationHandler for List {
    fn name(&self) -> &'static str {
        "list"
    }

    fn description(&self) -> &'static str {
        "Every table with its dimensions"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut OperationContext, _params: &OperationParameters) -> HandlerResult {
        let tables = ctx
            .document()
            .blocks()
            .iter()
            .enumerate()
            .filter_map(|(index, block)| match &block.content {
                BlockContent::Table(t) => Some(json!({
                    "index": index,
                    "rows": t.row_count(),
                    "columns": t.column_count(),
                })),
                _ => None,
            });
        HandlerOutput::list(tables)
    }
}

pub struct SetCell;

const SET_CELL_ARGS: &[ArgumentSpec] = &[
    INDEX,
    ArgumentSpec::required("row", ArgumentType::Integer, "Zero-based row"),
    ArgumentSpec::required("column", ArgumentType::Integer, "Zero-based column"),
    ArgumentSpec::required("value", ArgumentType::String, "New cell text"),
];

impl OperationHandler for SetCell {
    fn name(&self) -> &'static str {
        "set_cell"
    }

    fn description(&self) -> &'static str {
        "Replace the text of one cell"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        SET_CELL_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        let row: usize = params.required("row")?;
        let column: usize = params.required("column")?;
        let value: String = params.required("value")?;
        ctx.edit(|doc| doc.set_cell(index, row, column, value))?;
        Ok(HandlerOutput::message(format!(
            "Set cell ({}, {}) of table {}",
            row, column, index
        )))
    }
}

pub struct AddRow;

const ADD_ROW_ARGS: &[ArgumentSpec] = &[
    INDEX,
    ArgumentSpec::optional(
        "values",
        ArgumentType::StringList,
        "Cell values; missing trailing cells are left empty",
    ),
];

impl OperationHandler for AddRow {
    fn name(&self) -> &'static str {
        "add_row"
    }

    fn description(&self) -> &'static str {
        "Append a row to a table"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        ADD_ROW_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        let values: Vec<String> = params.optional("values")?.unwrap_or_default();
        let row = ctx.edit(|doc| doc.add_row(index, values))?;
        HandlerOutput::structured(&json!({ "index": index, "row": row }))
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
        "Remove a table"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        INDEX_ONLY
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let index = block_index(params)?;
        ctx.document().table(index)?;
        let (_, bookmarks) = ctx.edit(|doc| doc.remove_block(index))?;
        HandlerOutput::structured(&json!({ "index": index, "removed_bookmarks": bookmarks }))
    }
}
