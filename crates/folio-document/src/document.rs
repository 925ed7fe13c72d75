// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory document and its mutation API

use crate::error::{DocumentError, DocumentResult};
use crate::model::*;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A loaded document.
///
/// Not synchronized: callers that share one instance across threads must
/// serialize access themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    bookmarks: BTreeMap<String, Bookmark>,
    #[serde(default)]
    next_id: u64,
}

/// One occurrence found by [`Document::find`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMatch {
    pub block: usize,
    /// Byte offset within the block's plain text
    pub offset: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub blocks: usize,
    pub paragraphs: usize,
    pub headings: usize,
    pub tables: usize,
    pub bookmarks: usize,
    pub words: usize,
    pub characters: usize,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a sequence of block contents, assigning ids
    pub fn from_contents(contents: impl IntoIterator<Item = BlockContent>) -> Self {
        let mut doc = Self::new();
        for content in contents {
            doc.push_block(content);
        }
        doc
    }

    /// Repair invariants after deserialization: block ids unique, `next_id`
    /// past every id, bookmarks anchored to existing blocks.
    pub(crate) fn validate(mut self) -> Result<Self, String> {
        let mut seen = std::collections::HashSet::new();
        for block in &self.blocks {
            if !seen.insert(block.id) {
                return Err(format!("duplicate block id {}", block.id.0));
            }
        }
        let max_id = self.blocks.iter().map(|b| b.id.0 + 1).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id);
        for (name, bookmark) in &self.bookmarks {
            if name != &bookmark.name {
                return Err(format!("bookmark key '{}' does not match its name", name));
            }
            if !seen.contains(&bookmark.block) {
                return Err(format!("bookmark '{}' points at a missing block", name));
            }
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> DocumentResult<&Block> {
        self.blocks.get(index).ok_or(DocumentError::BlockOutOfRange {
            index,
            len: self.blocks.len(),
        })
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    fn allocate_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    fn mark_modified(&mut self) {
        self.properties.modified_at = Some(Utc::now());
    }

    /// Append a block and return its index
    pub fn push_block(&mut self, content: BlockContent) -> usize {
        let id = self.allocate_id();
        self.blocks.push(Block { id, content });
        self.mark_modified();
        self.blocks.len() - 1
    }

    /// Insert a block before `index`; `index == len()` appends
    pub fn insert_block(&mut self, index: usize, content: BlockContent) -> DocumentResult<usize> {
        if index > self.blocks.len() {
            return Err(DocumentError::BlockOutOfRange {
                index,
                len: self.blocks.len(),
            });
        }
        let id = self.allocate_id();
        self.blocks.insert(index, Block { id, content });
        self.mark_modified();
        Ok(index)
    }

    /// Remove a block. Bookmarks anchored to it are removed too and returned.
    pub fn remove_block(&mut self, index: usize) -> DocumentResult<(Block, Vec<String>)> {
        self.block(index)?;
        let block = self.blocks.remove(index);
        let orphaned: Vec<String> = self
            .bookmarks
            .values()
            .filter(|b| b.block == block.id)
            .map(|b| b.name.clone())
            .collect();
        for name in &orphaned {
            self.bookmarks.remove(name);
        }
        self.mark_modified();
        Ok((block, orphaned))
    }

    /// Replace the text of a paragraph or heading
    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> DocumentResult<()> {
        let len = self.blocks.len();
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(DocumentError::BlockOutOfRange { index, len })?;
        match &mut block.content {
            BlockContent::Paragraph(p) => p.text = text.into(),
            BlockContent::Heading(h) => h.text = text.into(),
            BlockContent::Table(_) => {
                return Err(DocumentError::WrongBlockKind {
                    index,
                    expected: "paragraph or heading",
                });
            }
        }
        self.mark_modified();
        Ok(())
    }

    pub fn paragraph_mut(&mut self, index: usize) -> DocumentResult<&mut Paragraph> {
        let len = self.blocks.len();
        match self.blocks.get_mut(index).map(|b| &mut b.content) {
            Some(BlockContent::Paragraph(p)) => Ok(p),
            Some(_) => Err(DocumentError::WrongBlockKind {
                index,
                expected: "paragraph",
            }),
            None => Err(DocumentError::BlockOutOfRange { index, len }),
        }
    }

    pub fn set_paragraph_style(
        &mut self,
        index: usize,
        style: Option<String>,
    ) -> DocumentResult<()> {
        self.paragraph_mut(index)?.style = style;
        self.mark_modified();
        Ok(())
    }

    pub fn table(&self, index: usize) -> DocumentResult<&Table> {
        match &self.block(index)?.content {
            BlockContent::Table(t) => Ok(t),
            _ => Err(DocumentError::WrongBlockKind {
                index,
                expected: "table",
            }),
        }
    }

    fn table_mut(&mut self, index: usize) -> DocumentResult<&mut Table> {
        let len = self.blocks.len();
        match self.blocks.get_mut(index).map(|b| &mut b.content) {
            Some(BlockContent::Table(t)) => Ok(t),
            Some(_) => Err(DocumentError::WrongBlockKind {
                index,
                expected: "table",
            }),
            None => Err(DocumentError::BlockOutOfRange { index, len }),
        }
    }

    pub fn set_cell(
        &mut self,
        index: usize,
        row: usize,
        column: usize,
        value: impl Into<String>,
    ) -> DocumentResult<()> {
        let table = self.table_mut(index)?;
        let (rows, columns) = (table.row_count(), table.column_count());
        let cell = table
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(column))
            .ok_or(DocumentError::CellOutOfRange {
                row,
                column,
                rows,
                columns,
            })?;
        *cell = value.into();
        self.mark_modified();
        Ok(())
    }

    /// Append a row, padding or rejecting `values` to match the column count
    pub fn add_row(&mut self, index: usize, values: Vec<String>) -> DocumentResult<usize> {
        let table = self.table_mut(index)?;
        let columns = table.column_count();
        if values.len() > columns {
            return Err(DocumentError::InvalidArgument(format!(
                "row has {} values but the table has {} columns",
                values.len(),
                columns
            )));
        }
        let mut row = values;
        row.resize(columns, String::new());
        table.rows.push(row);
        let added = table.rows.len() - 1;
        self.mark_modified();
        Ok(added)
    }

    pub fn add_bookmark(&mut self, name: &str, index: usize) -> DocumentResult<()> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(DocumentError::InvalidArgument(format!(
                "invalid bookmark name '{}'",
                name
            )));
        }
        if self.bookmarks.contains_key(name) {
            return Err(DocumentError::BookmarkExists(name.to_string()));
        }
        let block = self.block(index)?.id;
        self.bookmarks.insert(
            name.to_string(),
            Bookmark {
                name: name.to_string(),
                block,
            },
        );
        self.mark_modified();
        Ok(())
    }

    /// Resolve a bookmark to the current index of its block
    pub fn bookmark(&self, name: &str) -> DocumentResult<usize> {
        self.bookmarks
            .get(name)
            .and_then(|b| self.index_of(b.block))
            .ok_or_else(|| DocumentError::BookmarkNotFound(name.to_string()))
    }

    /// Every bookmark with the current index of its block, sorted by name
    pub fn bookmarks(&self) -> Vec<(String, usize)> {
        self.bookmarks
            .values()
            .filter_map(|b| self.index_of(b.block).map(|i| (b.name.clone(), i)))
            .collect()
    }

    pub fn remove_bookmark(&mut self, name: &str) -> DocumentResult<()> {
        self.bookmarks
            .remove(name)
            .ok_or_else(|| DocumentError::BookmarkNotFound(name.to_string()))?;
        self.mark_modified();
        Ok(())
    }

    pub fn find(&self, needle: &str, case_sensitive: bool) -> Vec<TextMatch> {
        if needle.is_empty() {
            return Vec::new();
        }
        let mut matches = Vec::new();
        for (index, block) in self.blocks.iter().enumerate() {
            let text = block.content.plain_text();
            let ranges: Vec<(usize, usize)> = if case_sensitive {
                text.match_indices(needle)
                    .map(|(offset, found)| (offset, offset + found.len()))
                    .collect()
            } else {
                find_folded(&text, needle)
            };
            for (start, end) in ranges {
                matches.push(TextMatch {
                    block: index,
                    offset: start,
                    text: text[start..end].to_string(),
                });
            }
        }
        matches
    }

    /// Replace occurrences of `find` across paragraphs, headings and table
    /// cells, stopping after `limit` replacements when given. Returns the
    /// number of replacements made.
    pub fn replace(&mut self, find: &str, with: &str, limit: Option<usize>) -> DocumentResult<usize> {
        if find.is_empty() {
            return Err(DocumentError::InvalidArgument(
                "search text must not be empty".to_string(),
            ));
        }
        let mut remaining = limit.unwrap_or(usize::MAX);
        let mut count = 0;
        let mut replace_in = |s: &mut String| {
            if remaining == 0 {
                return;
            }
            let found = s.matches(find).count().min(remaining);
            if found > 0 {
                *s = s.replacen(find, with, found);
                remaining -= found;
                count += found;
            }
        };
        for block in &mut self.blocks {
            match &mut block.content {
                BlockContent::Paragraph(p) => replace_in(&mut p.text),
                BlockContent::Heading(h) => replace_in(&mut h.text),
                BlockContent::Table(t) => t.rows.iter_mut().flatten().for_each(&mut replace_in),
            }
        }
        if count > 0 {
            self.mark_modified();
        }
        Ok(count)
    }

    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics {
            blocks: self.blocks.len(),
            bookmarks: self.bookmarks.len(),
            ..Default::default()
        };
        for block in &self.blocks {
            match block.content {
                BlockContent::Paragraph(_) => stats.paragraphs += 1,
                BlockContent::Heading(_) => stats.headings += 1,
                BlockContent::Table(_) => stats.tables += 1,
            }
            let text = block.content.plain_text();
            stats.words += text.split_whitespace().count();
            stats.characters += text.chars().filter(|c| !c.is_control()).count();
        }
        stats
    }

    pub fn set_property(&mut self, name: &str, value: Option<String>) -> DocumentResult<()> {
        let props = &mut self.properties;
        match name {
            "title" => props.title = value,
            "author" => props.author = value,
            "subject" => props.subject = value,
            "keywords" => {
                props.keywords = value
                    .map(|v| {
                        v.split(',')
                            .map(|k| k.trim().to_string())
                            .filter(|k| !k.is_empty())
                            .collect()
                    })
                    .unwrap_or_default()
            }
            "modified_at" => {
                return Err(DocumentError::InvalidArgument(
                    "modified_at is maintained by the library".to_string(),
                ));
            }
            custom => match value {
                Some(v) => {
                    props.custom.insert(custom.to_string(), v);
                }
                None => {
                    props.custom.remove(custom);
                }
            },
        }
        self.mark_modified();
        Ok(())
    }
}

/// Non-overlapping case-insensitive matches of `needle` in `text`, as byte
/// ranges of `text`. Both sides are lowercased per character so a match
/// always starts and ends on a source character boundary.
fn find_folded(text: &str, needle: &str) -> Vec<(usize, usize)> {
    // (folded char, byte start of its source char, byte end of its source char)
    let folded: Vec<(char, usize, usize)> = text
        .char_indices()
        .flat_map(|(at, c)| c.to_lowercase().map(move |l| (l, at, at + c.len_utf8())))
        .collect();
    let pattern: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();

    let mut ranges = Vec::new();
    let mut i = 0;
    while i + pattern.len() <= folded.len() {
        let window = &folded[i..i + pattern.len()];
        let starts_clean = i == 0 || folded[i - 1].1 != window[0].1;
        let last = window[window.len() - 1];
        let ends_clean = folded.get(i + pattern.len()).map_or(true, |next| next.1 != last.1);
        if starts_clean
            && ends_clean
            && window.iter().zip(&pattern).all(|((c, _, _), p)| c == p)
        {
            ranges.push((window[0].1, last.2));
            i += pattern.len();
        } else {
            i += 1;
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> BlockContent {
        BlockContent::Paragraph(Paragraph {
            text: text.to_string(),
            style: None,
        })
    }

    #[test]
    fn bookmarks_follow_their_block_across_insertions() {
        let mut doc = Document::from_contents([para("a"), para("b")]);
        doc.add_bookmark("second", 1).unwrap();
        doc.insert_block(0, para("zero")).unwrap();
        assert_eq!(doc.bookmark("second").unwrap(), 2);
    }

    #[test]
    fn removing_a_block_drops_its_bookmarks() {
        let mut doc = Document::from_contents([para("a"), para("b")]);
        doc.add_bookmark("first", 0).unwrap();
        let (_, orphaned) = doc.remove_block(0).unwrap();
        assert_eq!(orphaned, vec!["first".to_string()]);
        assert!(matches!(
            doc.bookmark("first"),
            Err(DocumentError::BookmarkNotFound(_))
        ));
    }

    #[test]
    fn replace_respects_limit_across_blocks() {
        let mut doc = Document::from_contents([para("cat cat"), para("cat")]);
        assert_eq!(doc.replace("cat", "dog", Some(2)).unwrap(), 2);
        assert_eq!(doc.block(0).unwrap().content.plain_text(), "dog dog");
        assert_eq!(doc.block(1).unwrap().content.plain_text(), "cat");
    }

    #[test]
    fn set_cell_rejects_out_of_range() {
        let mut doc = Document::new();
        let index = doc.push_block(BlockContent::Table(Table::new(2, 2)));
        let err = doc.set_cell(index, 5, 0, "x").unwrap_err();
        assert!(matches!(err, DocumentError::CellOutOfRange { rows: 2, .. }));
    }

    #[test]
    fn find_is_case_insensitive_on_request() {
        let doc = Document::from_contents([para("Hello hello")]);
        assert_eq!(doc.find("HELLO", false).len(), 2);
        assert_eq!(doc.find("HELLO", true).len(), 0);
    }

    #[test]
    fn case_insensitive_find_handles_non_ascii_text() {
        // 'İ' lowercases to two chars, which changes the byte length
        let doc = Document::from_contents([para("İstanbul Éclair HELLO")]);
        let found = doc.find("hello", false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offset, 18);
        assert_eq!(found[0].text, "HELLO");

        let found = doc.find("éCLAIR", false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offset, 10);
        assert_eq!(found[0].text, "Éclair");

        // A match may not end inside the fold of a single source char
        let found = doc.find("i", false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "i");
        assert_eq!(doc.find("i̇stanbul", false)[0].text, "İstanbul");
    }

    #[test]
    fn validate_rejects_dangling_bookmarks() {
        let json = r#"{"blocks":[],"bookmarks":{"x":{"name":"x","block":7}}}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert!(doc.validate().is_err());
    }
}
