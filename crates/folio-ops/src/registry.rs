// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Feature-areas, operation handlers and their registries

use crate::context::OperationContext;
use crate::error::{HandlerResult, OperationError, OperationResult, RegistryError};
use crate::params::OperationParameters;
use folio_api_contract::{
    ArgumentDescriptor, ArgumentType, OperationDescriptor, ToolCatalog, ToolDescriptor,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A family of related operations exposed as one tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureArea {
    Document,
    Paragraph,
    Table,
    Bookmark,
    Properties,
    Text,
}

impl FeatureArea {
    pub const ALL: [FeatureArea; 6] = [
        FeatureArea::Document,
        FeatureArea::Paragraph,
        FeatureArea::Table,
        FeatureArea::Bookmark,
        FeatureArea::Properties,
        FeatureArea::Text,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureArea::Document => "document",
            FeatureArea::Paragraph => "paragraph",
            FeatureArea::Table => "table",
            FeatureArea::Bookmark => "bookmark",
            FeatureArea::Properties => "properties",
            FeatureArea::Text => "text",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FeatureArea::Document => "Whole-document inspection and export",
            FeatureArea::Paragraph => "Create, read, edit and style paragraphs and headings",
            FeatureArea::Table => "Create tables and edit their cells and rows",
            FeatureArea::Bookmark => "Named anchors attached to blocks",
            FeatureArea::Properties => "Core and custom document properties",
            FeatureArea::Text => "Search, replace and text statistics",
        }
    }

    /// Static registration table of the area
    pub fn handlers(self) -> Vec<Arc<dyn OperationHandler>> {
        use crate::handlers;
        match self {
            FeatureArea::Document => handlers::document::handlers(),
            FeatureArea::Paragraph => handlers::paragraph::handlers(),
            FeatureArea::Table => handlers::table::handlers(),
            FeatureArea::Bookmark => handlers::bookmark::handlers(),
            FeatureArea::Properties => handlers::properties::handlers(),
            FeatureArea::Text => handlers::text::handlers(),
        }
    }

    fn valid_names() -> Vec<String> {
        Self::ALL.iter().map(|a| a.as_str().to_string()).collect()
    }
}

impl fmt::Display for FeatureArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureArea {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|area| area.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OperationError::UnknownFeatureArea {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

/// Declared argument of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: &'static str,
    pub arg_type: ArgumentType,
    pub required: bool,
    pub description: &'static str,
}

impl ArgumentSpec {
    pub const fn required(name: &'static str, arg_type: ArgumentType, description: &'static str) -> Self {
        Self {
            name,
            arg_type,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, arg_type: ArgumentType, description: &'static str) -> Self {
        Self {
            name,
            arg_type,
            required: false,
            description,
        }
    }
}

impl From<&ArgumentSpec> for ArgumentDescriptor {
    fn from(spec: &ArgumentSpec) -> Self {
        ArgumentDescriptor {
            name: spec.name.to_string(),
            arg_type: spec.arg_type,
            required: spec.required,
            description: spec.description.to_string(),
        }
    }
}

/// One named operation of a feature-area.
///
/// Handlers hold no per-call state. A single instance serves every
/// concurrent call and runs on the blocking pool.
pub trait OperationHandler: Send + Sync + 'static {
    /// Canonical operation name
    fn name(&self) -> &'static str;

    /// Alternative names resolving to this handler
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    /// True when the operation never modifies the document
    fn read_only(&self) -> bool {
        false
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        &[]
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult;
}

/// Name to handler table of one feature-area
pub struct HandlerRegistry {
    area: FeatureArea,
    handlers: Vec<Arc<dyn OperationHandler>>,
    /// Lowercased canonical names and aliases to index in `handlers`
    index: HashMap<String, usize>,
}

impl HandlerRegistry {
    pub fn build(
        area: FeatureArea,
        handlers: Vec<Arc<dyn OperationHandler>>,
    ) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        for (position, handler) in handlers.iter().enumerate() {
            let names = std::iter::once(handler.name()).chain(handler.aliases().iter().copied());
            for name in names {
                if index.insert(name.to_lowercase(), position).is_some() {
                    return Err(RegistryError::DuplicateOperation {
                        area,
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(Self {
            area,
            handlers,
            index,
        })
    }

    /// Registry of `area` built from its static registration table
    pub fn for_area(area: FeatureArea) -> Result<Self, RegistryError> {
        Self::build(area, area.handlers())
    }

    pub fn area(&self) -> FeatureArea {
        self.area
    }

    /// Resolve an operation name, ignoring case
    pub fn handler(&self, name: &str) -> OperationResult<Arc<dyn OperationHandler>> {
        self.index
            .get(&name.trim().to_lowercase())
            .map(|&i| Arc::clone(&self.handlers[i]))
            .ok_or_else(|| OperationError::UnknownOperation {
                area: self.area,
                name: name.to_string(),
                valid: self.names(),
            })
    }

    /// Canonical operation names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|h| h.name().to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn describe(&self) -> ToolDescriptor {
        let mut operations: Vec<OperationDescriptor> = self
            .handlers
            .iter()
            .map(|h| OperationDescriptor {
                name: h.name().to_string(),
                aliases: h.aliases().iter().map(|a| a.to_string()).collect(),
                description: h.description().to_string(),
                read_only: h.read_only(),
                arguments: h.arguments().iter().map(ArgumentDescriptor::from).collect(),
            })
            .collect();
        operations.sort_by(|a, b| a.name.cmp(&b.name));
        ToolDescriptor {
            area: self.area.as_str().to_string(),
            description: self.area.description().to_string(),
            operations,
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("area", &self.area)
            .field("operations", &self.names())
            .finish()
    }
}

/// One registry per feature-area
#[derive(Debug)]
pub struct RegistrySet {
    registries: HashMap<FeatureArea, HandlerRegistry>,
}

impl RegistrySet {
    /// Every built-in feature-area
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_registries(
            FeatureArea::ALL
                .into_iter()
                .map(HandlerRegistry::for_area)
                .collect::<Result<Vec<_>, _>>()?,
        )
    }

    pub fn from_registries(
        registries: impl IntoIterator<Item = HandlerRegistry>,
    ) -> Result<Self, RegistryError> {
        let mut map = HashMap::new();
        for registry in registries {
            let area = registry.area();
            if map.insert(area, registry).is_some() {
                return Err(RegistryError::DuplicateArea(area));
            }
        }
        Ok(Self { registries: map })
    }

    pub fn get(&self, area: FeatureArea) -> Option<&HandlerRegistry> {
        self.registries.get(&area)
    }

    /// Resolve a feature-area name to its registry
    pub fn resolve(&self, name: &str) -> OperationResult<&HandlerRegistry> {
        let area: FeatureArea = name.parse()?;
        self.get(area).ok_or_else(|| OperationError::UnknownFeatureArea {
            name: name.to_string(),
            valid: self.areas().iter().map(|a| a.as_str().to_string()).collect(),
        })
    }

    /// Registered areas in declaration order
    pub fn areas(&self) -> Vec<FeatureArea> {
        FeatureArea::ALL
            .into_iter()
            .filter(|a| self.registries.contains_key(a))
            .collect()
    }

    pub fn catalog(&self) -> ToolCatalog {
        ToolCatalog {
            tools: self
                .areas()
                .into_iter()
                .filter_map(|a| self.get(a))
                .map(HandlerRegistry::describe)
                .collect(),
        }
    }
}
