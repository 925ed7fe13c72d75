// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! On-disk formats: native JSON, plain text and Markdown (export only)

use crate::document::Document;
use crate::error::{DocumentError, DocumentResult};
use crate::model::{BlockContent, Heading, Paragraph};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Text,
    Markdown,
}

impl Format {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> DocumentResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        ext.parse()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Text => "text",
            Format::Markdown => "markdown",
        }
    }

    pub fn can_load(self) -> bool {
        !matches!(self, Format::Markdown)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Format {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "txt" | "text" => Ok(Format::Text),
            "md" | "markdown" => Ok(Format::Markdown),
            other => Err(DocumentError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Load a document, inferring the format from the extension
pub fn load(path: &Path) -> DocumentResult<Document> {
    let format = Format::from_path(path)?;
    if !format.can_load() {
        return Err(DocumentError::ExportOnly(format.as_str()));
    }
    let raw = fs::read_to_string(path).map_err(|e| DocumentError::io(path, e))?;
    debug!(path = %path.display(), %format, bytes = raw.len(), "Loaded document source");
    decode(&raw, format).map_err(|reason| DocumentError::Malformed {
        path: path.to_path_buf(),
        reason,
    })
}

/// Save a document. `format` defaults to the one implied by the extension.
pub fn save(document: &Document, path: &Path, format: Option<Format>) -> DocumentResult<()> {
    let format = match format {
        Some(f) => f,
        None => Format::from_path(path)?,
    };
    let encoded = encode(document, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DocumentError::io(parent, e))?;
    }
    // Write to a sibling temp file first so a failed write never truncates
    // the existing document.
    let tmp = path.with_extension(format!("{}.tmp", format.as_str()));
    fs::write(&tmp, encoded).map_err(|e| DocumentError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| DocumentError::io(path, e))?;
    debug!(path = %path.display(), %format, "Saved document");
    Ok(())
}

pub fn decode(raw: &str, format: Format) -> Result<Document, String> {
    match format {
        Format::Json => {
            let doc: Document = serde_json::from_str(raw).map_err(|e| e.to_string())?;
            doc.validate()
        }
        Format::Text => Ok(decode_text(raw)),
        Format::Markdown => Err("markdown is export-only".to_string()),
    }
}

pub fn encode(document: &Document, format: Format) -> DocumentResult<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(document)
            .map_err(|e| DocumentError::InvalidArgument(e.to_string())),
        Format::Text => Ok(encode_text(document)),
        Format::Markdown => Ok(encode_markdown(document)),
    }
}

/// Blank-line separated paragraphs; line breaks inside a paragraph are kept
fn decode_text(raw: &str) -> Document {
    let normalized = raw.replace("\r\n", "\n");
    Document::from_contents(
        normalized
            .split("\n\n")
            .map(|chunk| chunk.trim_matches('\n'))
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| {
                BlockContent::Paragraph(Paragraph {
                    text: chunk.to_string(),
                    style: None,
                })
            }),
    )
}

fn encode_text(document: &Document) -> String {
    let mut out = document
        .blocks()
        .iter()
        .map(|b| b.content.plain_text())
        .collect::<Vec<_>>()
        .join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn encode_markdown(document: &Document) -> String {
    let mut parts = Vec::new();
    if let Some(title) = &document.properties.title {
        parts.push(format!("# {}", title));
    }
    for block in document.blocks() {
        let rendered = match &block.content {
            BlockContent::Paragraph(p) => p.text.clone(),
            BlockContent::Heading(Heading { level, text }) => {
                format!("{} {}", "#".repeat(usize::from(*level).clamp(1, 6)), text)
            }
            BlockContent::Table(table) => {
                let columns = table.column_count();
                let mut lines = Vec::new();
                for (i, row) in table.rows.iter().enumerate() {
                    let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
                    lines.push(format!("| {} |", cells.join(" | ")));
                    if i == 0 {
                        lines.push(format!("|{}", " --- |".repeat(columns.max(1))));
                    }
                }
                lines.join("\n")
            }
        };
        parts.push(rendered);
    }
    let mut out = parts.join("\n\n");
    out.push('\n');
    out
}
