//! Positions and selections inside the document tree.

use super::types::{Element, NodeRef, TextRun};

/// A location: the path of a parent node plus an offset into it.
///
/// When the parent is a text run the offset is relative to that run only.
/// When the parent is a text block the offset counts characters across all
/// of its runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub path: Vec<usize>,
    pub offset: usize,
}

impl Position {
    pub const fn new(path: Vec<usize>, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Anchor/focus selection. Collapsed when both ends coincide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn collapsed(position: Position) -> Self {
        Self {
            anchor: position.clone(),
            focus: position,
        }
    }

    pub const fn range(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// The caret end of the selection.
    pub const fn head(&self) -> &Position {
        &self.focus
    }
}

/// A position resolved to its enclosing text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCursor {
    /// Path of the text block.
    pub block: Vec<usize>,
    /// Character offset into the block's concatenated text.
    pub offset: usize,
}

impl BlockCursor {
    pub fn position(&self) -> Position {
        Position::new(self.block.clone(), self.offset)
    }
}

/// Map `position` onto its text block, walking up from a text run parent.
///
/// Returns `None` when the position does not address a text block or is out
/// of range.
pub fn resolve(root: &Element, position: &Position) -> Option<BlockCursor> {
    match root.node(&position.path)? {
        NodeRef::Element(element) => {
            if !element.kind().is_text_block() || position.offset > element.text_len() {
                return None;
            }
            Some(BlockCursor {
                block: position.path.clone(),
                offset: position.offset,
            })
        }
        NodeRef::Text(run) => {
            if position.offset > run.char_len() {
                return None;
            }
            let (own_index, block_path) = position.path.split_last()?;
            let block = root.element(block_path)?;
            if !block.kind().is_text_block() {
                return None;
            }
            let preceding: usize = block.children()[..*own_index]
                .iter()
                .filter_map(|n| n.as_text())
                .map(TextRun::char_len)
                .sum();
            Some(BlockCursor {
                block: block_path.to_vec(),
                offset: preceding + position.offset,
            })
        }
    }
}

/// Last position inside the document: the end of the last text block in
/// document order.
///
/// Blocks without text after it (a closing rule) are skipped. A document
/// with no text block at all yields the root-level position after its last
/// child, which [`resolve`] rejects.
pub fn end_of_document(root: &Element) -> Position {
    fn last_text_block(element: &Element, path: &mut Vec<usize>) -> Option<usize> {
        if element.kind().is_text_block() {
            return Some(element.text_len());
        }
        for (i, child) in element.children().iter().enumerate().rev() {
            let Some(child) = child.as_element() else {
                continue;
            };
            path.push(i);
            if let Some(len) = last_text_block(child, path) {
                return Some(len);
            }
            path.pop();
        }
        None
    }

    let mut path = Vec::new();
    match last_text_block(root, &mut path) {
        Some(len) => Position::new(path, len),
        None => Position::new(Vec::new(), root.child_count()),
    }
}
