//! Slash trigger detection against the structured document.
//!
//! The text before the cursor is rebuilt from the inline runs of the
//! enclosing block, so a trigger split across differently styled runs is
//! still found.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Element, Position, Selection, resolve};

static TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([A-Za-z0-9_]*)$").expect("valid regex"));

/// A block's flattened text and the cursor's offset into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockText {
    pub block: Vec<usize>,
    pub text: String,
    /// Character offset of the cursor into `text`.
    pub cursor: usize,
}

impl BlockText {
    /// Text before the cursor.
    pub fn before_cursor(&self) -> &str {
        let end = crate::document::char_to_byte(&self.text, self.cursor);
        &self.text[..end]
    }
}

/// Rebuild the text of the block containing `position`.
///
/// Works whether `position` points into a text run or at the block itself.
pub fn block_text(root: &Element, position: &Position) -> Option<BlockText> {
    let cursor = resolve(root, position)?;
    let block = root.element(&cursor.block)?;
    Some(BlockText {
        text: block.text(),
        cursor: cursor.offset,
        block: cursor.block,
    })
}

/// A slash trigger ending at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    /// Word characters after the slash, lowercased.
    pub query: String,
    /// Characters to delete to remove the trigger, slash included.
    pub match_len: usize,
}

/// Match `/word` anchored at the end of `before`.
pub fn find_trigger(before: &str) -> Option<TriggerMatch> {
    let found = TRIGGER.find(before)?;
    Some(TriggerMatch {
        query: found.as_str()[1..].to_lowercase(),
        match_len: found.as_str().chars().count(),
    })
}

/// Result of scanning the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// A range is selected; the menu must close.
    RangeSelected,
    NoMatch,
    Match(TriggerMatch),
}

/// Scan the selection for a trigger ending at the cursor.
pub fn scan(root: &Element, selection: &Selection) -> Scan {
    if !selection.is_collapsed() {
        return Scan::RangeSelected;
    }
    let Some(text) = block_text(root, selection.head()) else {
        return Scan::NoMatch;
    };
    let accepts = root
        .element(&text.block)
        .is_some_and(|block| block.kind().accepts_commands());
    if !accepts {
        return Scan::NoMatch;
    }
    find_trigger(text.before_cursor()).map_or(Scan::NoMatch, |found| {
        tracing::trace!(query = %found.query, len = found.match_len, "trigger found");
        Scan::Match(found)
    })
}
