//! The structured editing surface.
//!
//! Holds the document tree and selection, applies edits in atomic change
//! batches, and queues one change notification per batch that altered the
//! tree. Content can be replaced by a raw load (history starts empty) or by
//! a merge that keeps the identity of blocks that did not change.

mod actions;

use std::collections::VecDeque;

use thiserror::Error;

pub use actions::{Action, ActionError};

use crate::document::{
    BlockCursor, Element, ElementKind, InlineStyle, Node, Position, Selection, end_of_document,
    parse, resolve, serialize,
};

/// Largest table the surface will build on either axis.
pub const MAX_TABLE_SIZE: usize = 20;

/// Invalid reads or writes against the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("position {path:?}:{offset} is not inside a text block")]
    InvalidPosition { path: Vec<usize>, offset: usize },
    #[error("cannot delete {requested} characters, only {available} before the cursor")]
    DeleteOutOfRange { requested: usize, available: usize },
    #[error("a {0} cannot be split")]
    CannotSplit(&'static str),
}

/// The surface could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("table size {rows}x{columns} is outside 1..={MAX_TABLE_SIZE}")]
    TableSize { rows: usize, columns: usize },
}

/// Construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Rows of an inserted table, header row included.
    pub table_rows: usize,
    pub table_columns: usize,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            table_rows: 2,
            table_columns: 2,
        }
    }
}

impl SurfaceOptions {
    fn validate(self) -> Result<Self, SurfaceError> {
        let range = 1..=MAX_TABLE_SIZE;
        if range.contains(&self.table_rows) && range.contains(&self.table_columns) {
            Ok(self)
        } else {
            Err(SurfaceError::TableSize {
                rows: self.table_rows,
                columns: self.table_columns,
            })
        }
    }
}

/// A content-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChange {
    /// Document revision after the change.
    pub revision: u64,
}

#[derive(Debug, Clone)]
struct Snapshot {
    root: Element,
    selection: Selection,
    pending_style: Option<InlineStyle>,
    block_ids: Vec<u64>,
}

/// The structured editing engine.
#[derive(Debug)]
pub struct Surface {
    root: Element,
    selection: Selection,
    /// Style for the next typed text, set by emphasis toggles.
    pending_style: Option<InlineStyle>,
    /// Identity of each root-level block.
    block_ids: Vec<u64>,
    next_id: u64,
    revision: u64,
    undo_depth: usize,
    notifications: VecDeque<DataChange>,
    options: SurfaceOptions,
}

impl Surface {
    /// Create an empty surface: one empty paragraph, cursor inside it.
    ///
    /// # Errors
    /// Returns an error if the options are out of range.
    pub fn create(options: SurfaceOptions) -> Result<Self, SurfaceError> {
        let options = options.validate()?;
        let root = parse("");
        let mut surface = Self {
            selection: Selection::collapsed(start_of_document(&root)),
            root,
            pending_style: None,
            block_ids: Vec::new(),
            next_id: 0,
            revision: 0,
            undo_depth: 0,
            notifications: VecDeque::new(),
            options,
        };
        surface.block_ids = surface.fresh_ids(surface.root.child_count());
        Ok(surface)
    }

    pub const fn root(&self) -> &Element {
        &self.root
    }

    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    pub const fn options(&self) -> SurfaceOptions {
        self.options
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of recorded history steps.
    pub const fn undo_depth(&self) -> usize {
        self.undo_depth
    }

    pub const fn pending_style(&self) -> Option<InlineStyle> {
        self.pending_style
    }

    /// Identity of the root-level block at `index`.
    pub fn block_id(&self, index: usize) -> Option<u64> {
        self.block_ids.get(index).copied()
    }

    /// Serialized markdown of the whole document.
    pub fn get_data(&self) -> String {
        serialize(&self.root)
    }

    /// Replace the content without diffing. History is cleared.
    pub fn load_data(&mut self, text: &str) {
        self.root = parse(text);
        self.block_ids = self.fresh_ids(self.root.child_count());
        self.selection = Selection::collapsed(start_of_document(&self.root));
        self.pending_style = None;
        self.undo_depth = 0;
        self.notify();
    }

    /// Replace the content, keeping the identity of unchanged blocks.
    ///
    /// Records one history step. The cursor is moved to the end of the
    /// document; callers that want the old selection restore it afterwards.
    pub fn merge_data(&mut self, text: &str) {
        let merged = parse(text);
        self.block_ids = self.reconcile_ids(&self.root.clone(), &merged);
        self.root = merged;
        self.selection = Selection::collapsed(end_of_document(&self.root));
        self.pending_style = None;
        self.undo_depth += 1;
        self.notify();
    }

    /// Set the selection after checking both ends address text blocks.
    ///
    /// # Errors
    /// Returns the first invalid end; the selection is left unchanged.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), ModelError> {
        for end in [&selection.anchor, &selection.focus] {
            if resolve(&self.root, end).is_none() {
                return Err(invalid(end));
            }
        }
        if selection != self.selection {
            self.pending_style = None;
        }
        self.selection = selection;
        Ok(())
    }

    /// Collapse the selection at the end of the last block.
    pub fn select_end(&mut self) {
        self.selection = Selection::collapsed(end_of_document(&self.root));
        self.pending_style = None;
    }

    /// Run `edit` as one atomic batch.
    ///
    /// On `Err` every modification made by the batch is rolled back. On `Ok`
    /// exactly one notification is queued if the tree changed.
    ///
    /// # Errors
    /// Propagates the error returned by `edit`.
    pub fn change<T, E>(&mut self, edit: impl FnOnce(&mut Writer<'_>) -> Result<T, E>) -> Result<T, E> {
        let before = self.snapshot();
        let result = edit(&mut Writer { surface: self });
        match result {
            Ok(value) => {
                if self.root != before.root {
                    self.block_ids = self.reconcile_ids(&before.root, &self.root.clone());
                    self.undo_depth += 1;
                    self.notify();
                }
                Ok(value)
            }
            Err(e) => {
                self.restore(before);
                Err(e)
            }
        }
    }

    /// Oldest pending notification.
    pub fn take_notification(&mut self) -> Option<DataChange> {
        self.notifications.pop_front()
    }

    /// Type `text` at the cursor, replacing a range selection first.
    ///
    /// # Errors
    /// Fails if the cursor is invalid or `text` holds a newline inside a table cell.
    pub fn type_text(&mut self, text: &str) -> Result<(), ModelError> {
        self.change(|w| {
            w.delete_selection()?;
            w.insert_text(text)
        })
    }

    /// Enter: split the current block.
    ///
    /// # Errors
    /// Fails inside table cells.
    pub fn enter(&mut self) -> Result<(), ModelError> {
        self.change(|w| {
            w.delete_selection()?;
            w.split_block()
        })
    }

    /// Backspace: delete the selection or the character before the cursor,
    /// or at the start of a block unwrap it or join it with the previous one.
    ///
    /// # Errors
    /// Fails if the cursor is invalid.
    pub fn backspace(&mut self) -> Result<(), ModelError> {
        self.change(|w| {
            if w.delete_selection()? {
                return Ok(());
            }
            let cursor = w.cursor()?;
            if cursor.offset > 0 {
                return w.remove_before_cursor(1);
            }
            w.join_backward(&cursor);
            Ok(())
        })
    }

    pub fn move_left(&mut self) {
        let Some(cursor) = self.head_cursor() else {
            return self.select_end();
        };
        let target = if cursor.offset > 0 {
            Some(BlockCursor {
                offset: cursor.offset - 1,
                ..cursor
            })
        } else {
            self.neighbour_block(&cursor.block, false)
                .map(|(block, len)| BlockCursor { block, offset: len })
        };
        if let Some(target) = target {
            self.collapse_to(&target);
        }
    }

    pub fn move_right(&mut self) {
        let Some(cursor) = self.head_cursor() else {
            return self.select_end();
        };
        let len = self.root.element(&cursor.block).map_or(0, Element::text_len);
        let target = if cursor.offset < len {
            Some(BlockCursor {
                offset: cursor.offset + 1,
                ..cursor
            })
        } else {
            self.neighbour_block(&cursor.block, true)
                .map(|(block, _)| BlockCursor { block, offset: 0 })
        };
        if let Some(target) = target {
            self.collapse_to(&target);
        }
    }

    pub fn move_home(&mut self) {
        if let Some(cursor) = self.head_cursor() {
            self.collapse_to(&BlockCursor { offset: 0, ..cursor });
        }
    }

    pub fn move_end(&mut self) {
        if let Some(cursor) = self.head_cursor() {
            let len = self.root.element(&cursor.block).map_or(0, Element::text_len);
            self.collapse_to(&BlockCursor { offset: len, ..cursor });
        }
    }

    fn head_cursor(&self) -> Option<BlockCursor> {
        resolve(&self.root, self.selection.head())
    }

    fn collapse_to(&mut self, cursor: &BlockCursor) {
        self.selection = Selection::collapsed(cursor.position());
        self.pending_style = None;
    }

    /// Previous or next text block in document order, with its length.
    fn neighbour_block(&self, block: &[usize], forward: bool) -> Option<(Vec<usize>, usize)> {
        let blocks = text_blocks(&self.root);
        let index = blocks.iter().position(|(path, _)| path == block)?;
        let target = if forward {
            index.checked_add(1)?
        } else {
            index.checked_sub(1)?
        };
        blocks.into_iter().nth(target)
    }

    fn notify(&mut self) {
        self.revision += 1;
        tracing::debug!(revision = self.revision, "surface content changed");
        self.notifications.push_back(DataChange {
            revision: self.revision,
        });
    }

    fn fresh_ids(&mut self, count: usize) -> Vec<u64> {
        (0..count)
            .map(|_| {
                self.next_id += 1;
                self.next_id
            })
            .collect()
    }

    /// Carry block identities across a content replacement.
    ///
    /// Blocks in the common prefix and common suffix of the two documents
    /// keep their ids; everything in between gets fresh ones.
    fn reconcile_ids(&mut self, old: &Element, new: &Element) -> Vec<u64> {
        let old_blocks = old.children();
        let new_blocks = new.children();
        let prefix = old_blocks
            .iter()
            .zip(new_blocks)
            .take_while(|(a, b)| a == b)
            .count();
        let max_suffix = old_blocks.len().min(new_blocks.len()) - prefix;
        let suffix = old_blocks
            .iter()
            .rev()
            .zip(new_blocks.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        let middle = new_blocks.len() - prefix - suffix;
        let old_ids = self.block_ids.clone();
        let mut ids: Vec<u64> = old_ids.iter().take(prefix).copied().collect();
        ids.extend(self.fresh_ids(middle));
        ids.extend(old_ids.iter().skip(old_ids.len().saturating_sub(suffix)).copied());
        ids
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            root: self.root.clone(),
            selection: self.selection.clone(),
            pending_style: self.pending_style,
            block_ids: self.block_ids.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.root = snapshot.root;
        self.selection = snapshot.selection;
        self.pending_style = snapshot.pending_style;
        self.block_ids = snapshot.block_ids;
    }
}

/// Mutable access to the surface inside a change batch.
pub struct Writer<'a> {
    surface: &'a mut Surface,
}

impl Writer<'_> {
    pub fn root(&self) -> &Element {
        &self.surface.root
    }

    pub fn selection(&self) -> &Selection {
        &self.surface.selection
    }

    pub const fn options(&self) -> SurfaceOptions {
        self.surface.options
    }

    /// The caret resolved to its text block.
    ///
    /// # Errors
    /// Fails if the caret does not address a text block.
    pub fn cursor(&self) -> Result<BlockCursor, ModelError> {
        let head = self.surface.selection.head();
        resolve(&self.surface.root, head).ok_or_else(|| invalid(head))
    }

    /// Collapse the selection at `block`/`offset`.
    ///
    /// # Errors
    /// Fails if the target is not inside a text block.
    pub fn set_cursor(&mut self, block: Vec<usize>, offset: usize) -> Result<(), ModelError> {
        let position = Position::new(block, offset);
        if resolve(&self.surface.root, &position).is_none() {
            return Err(invalid(&position));
        }
        self.surface.selection = Selection::collapsed(position);
        Ok(())
    }

    pub const fn pending_style(&self) -> Option<InlineStyle> {
        self.surface.pending_style
    }

    pub fn set_pending_style(&mut self, style: Option<InlineStyle>) {
        self.surface.pending_style = style;
    }

    /// Text of the cursor's block before the cursor.
    ///
    /// # Errors
    /// Fails if the cursor is invalid.
    pub fn text_before_cursor(&self) -> Result<String, ModelError> {
        let cursor = self.cursor()?;
        let text = self.block(&cursor.block)?.text();
        Ok(text.chars().take(cursor.offset).collect())
    }

    /// Insert `text` at the cursor. Each `\n` splits the block, except in a
    /// code block where it is kept as text.
    ///
    /// # Errors
    /// Fails if the cursor is invalid or a newline lands in a table cell.
    pub fn insert_text(&mut self, text: &str) -> Result<(), ModelError> {
        self.open_trailing_paragraph();
        let cursor = self.cursor()?;
        if matches!(self.block(&cursor.block)?.kind(), ElementKind::CodeBlock { .. }) {
            return self.insert_segment(text);
        }
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                self.split_block()?;
            }
            self.insert_segment(segment)?;
        }
        Ok(())
    }

    /// Insert `text` and place the cursor at `(line_delta, column)` relative
    /// to the insertion point, in the form returned by
    /// [`crate::catalog::cursor_after_insert`].
    ///
    /// # Errors
    /// Fails like [`Self::insert_text`].
    pub fn insert_text_with_cursor(&mut self, text: &str, (line_delta, column): (usize, usize)) -> Result<(), ModelError> {
        self.open_trailing_paragraph();
        let start = self.cursor()?;
        self.insert_text(text)?;
        let Some(line) = text.split('\n').nth(line_delta) else {
            return Ok(());
        };
        let chars = line.get(..column).map_or(column, |s| s.chars().count());
        if line_delta == 0 {
            return self.set_cursor(start.block, start.offset + chars);
        }
        let mut block = start.block;
        if let Some(last) = block.last_mut() {
            *last += line_delta;
        }
        self.set_cursor(block, chars)
    }

    /// Delete `count` characters before the cursor.
    ///
    /// # Errors
    /// Fails if fewer than `count` characters precede the cursor in its block.
    pub fn remove_before_cursor(&mut self, count: usize) -> Result<(), ModelError> {
        let cursor = self.cursor()?;
        if count > cursor.offset {
            return Err(ModelError::DeleteOutOfRange {
                requested: count,
                available: cursor.offset,
            });
        }
        let start = cursor.offset - count;
        self.block_mut(&cursor.block)?.remove_text(start, cursor.offset);
        self.set_cursor(cursor.block, start)
    }

    /// Delete a range selection inside one block. Returns whether anything
    /// was selected. Ranges spanning blocks collapse to their focus.
    ///
    /// # Errors
    /// Fails if either end is invalid.
    pub fn delete_selection(&mut self) -> Result<bool, ModelError> {
        let selection = self.surface.selection.clone();
        if selection.is_collapsed() {
            return Ok(false);
        }
        let root = &self.surface.root;
        let anchor = resolve(root, &selection.anchor).ok_or_else(|| invalid(&selection.anchor))?;
        let focus = resolve(root, &selection.focus).ok_or_else(|| invalid(&selection.focus))?;
        if anchor.block != focus.block {
            self.set_cursor(focus.block, focus.offset)?;
            return Ok(false);
        }
        let (start, end) = (anchor.offset.min(focus.offset), anchor.offset.max(focus.offset));
        self.block_mut(&anchor.block)?.remove_text(start, end);
        self.set_cursor(anchor.block, start)?;
        Ok(true)
    }

    /// Split the cursor's block in two and move the cursor to the start of
    /// the second half. Code blocks get a literal newline instead.
    ///
    /// # Errors
    /// Fails inside table cells and other nested blocks.
    pub fn split_block(&mut self) -> Result<(), ModelError> {
        self.open_trailing_paragraph();
        let cursor = self.cursor()?;
        let block = self.block(&cursor.block)?;
        let (kind, empty) = (block.kind().clone(), block.text_len() == 0);
        if matches!(kind, ElementKind::CodeBlock { .. }) {
            return self.insert_segment("\n");
        }
        let [index] = cursor.block[..] else {
            return Err(ModelError::CannotSplit(kind.name()));
        };
        // Enter on an empty list item or quote leaves the list.
        if empty && matches!(kind, ElementKind::ListItem(_) | ElementKind::BlockQuote) {
            self.block_mut(&cursor.block)?.set_kind(ElementKind::Paragraph);
            return Ok(());
        }
        let tail = self.block_mut(&cursor.block)?.split_off(cursor.offset);
        let at_end = tail.iter().all(|n| n.as_text().is_none_or(|r| r.data().is_empty()));
        let next_kind = match kind {
            ElementKind::ListItem(marker) => ElementKind::ListItem(marker.continuation()),
            ElementKind::Heading(_) if at_end => ElementKind::Paragraph,
            other => other,
        };
        let mut next = Element::with_children(next_kind, tail);
        next.normalize_runs();
        self.surface
            .root
            .children_mut()
            .insert(index + 1, Node::Element(next));
        self.set_cursor(vec![index + 1], 0)
    }

    /// When the caret sits after the last root block (a document holding no
    /// text block), append an empty paragraph and move the caret into it.
    fn open_trailing_paragraph(&mut self) {
        let count = self.surface.root.child_count();
        let head = self.surface.selection.head();
        if !head.path.is_empty() || head.offset != count {
            return;
        }
        self.insert_block(count, Element::text_block(ElementKind::Paragraph, Vec::new()));
        self.surface.selection = Selection::collapsed(Position::new(vec![count], 0));
    }

    /// Insert a root-level block at `index`.
    pub(crate) fn insert_block(&mut self, index: usize, block: Element) {
        let children = self.surface.root.children_mut();
        let index = index.min(children.len());
        children.insert(index, Node::Element(block));
    }

    /// Replace the root-level block at `index`.
    pub(crate) fn replace_block(&mut self, index: usize, block: Element) {
        if let Some(slot) = self.surface.root.children_mut().get_mut(index) {
            *slot = Node::Element(block);
        }
    }

    /// Run a structural action. A failed action leaves the batch untouched.
    ///
    /// # Errors
    /// Returns [`ActionError::Unsupported`] when the action does not apply at
    /// the cursor.
    pub fn execute(&mut self, action: Action) -> Result<(), ActionError> {
        let before = self.surface.snapshot();
        let result = actions::execute(self, action);
        if result.is_err() {
            self.surface.restore(before);
        }
        result
    }

    pub(crate) fn block(&self, path: &[usize]) -> Result<&Element, ModelError> {
        self.surface
            .root
            .element(path)
            .ok_or_else(|| invalid(&Position::new(path.to_vec(), 0)))
    }

    pub(crate) fn block_mut(&mut self, path: &[usize]) -> Result<&mut Element, ModelError> {
        self.surface
            .root
            .element_mut(path)
            .ok_or_else(|| invalid(&Position::new(path.to_vec(), 0)))
    }

    fn insert_segment(&mut self, text: &str) -> Result<(), ModelError> {
        if text.is_empty() {
            return Ok(());
        }
        let cursor = self.cursor()?;
        let pending = self.surface.pending_style;
        let block = self.block_mut(&cursor.block)?;
        let style = pending.unwrap_or_else(|| block.style_at(cursor.offset));
        block.insert_text(cursor.offset, text, style);
        let offset = cursor.offset + text.chars().count();
        self.set_cursor(cursor.block, offset)?;
        self.surface.pending_style = pending;
        Ok(())
    }

    /// Backspace at the start of a block.
    fn join_backward(&mut self, cursor: &BlockCursor) {
        let [index] = cursor.block[..] else {
            return;
        };
        let Ok(block) = self.block(&cursor.block) else {
            return;
        };
        if !matches!(block.kind(), ElementKind::Paragraph) {
            if let Ok(block) = self.block_mut(&cursor.block) {
                block.set_kind(ElementKind::Paragraph);
            }
            return;
        }
        let Some(previous_index) = index.checked_sub(1) else {
            return;
        };
        let previous = self
            .surface
            .root
            .children()
            .get(previous_index)
            .and_then(Node::as_element)
            .map(|p| (p.kind().is_text_block(), p.text_len()));
        let children = self.surface.root.children_mut();
        match previous {
            Some((true, joined_at)) => {
                let Node::Element(current) = children.remove(index) else {
                    return;
                };
                if let Some(Node::Element(previous)) = children.get_mut(previous_index) {
                    previous.children_mut().extend(current.children().iter().cloned());
                    previous.normalize_runs();
                }
                self.surface.selection =
                    Selection::collapsed(Position::new(vec![previous_index], joined_at));
            }
            Some((false, _)) => {
                children.remove(previous_index);
                self.surface.selection = Selection::collapsed(Position::new(vec![previous_index], 0));
            }
            None => {}
        }
    }
}

fn invalid(position: &Position) -> ModelError {
    ModelError::InvalidPosition {
        path: position.path.clone(),
        offset: position.offset,
    }
}

fn start_of_document(root: &Element) -> Position {
    text_blocks(root)
        .into_iter()
        .next()
        .map_or_else(|| end_of_document(root), |(path, _)| Position::new(path, 0))
}

/// All text blocks in document order with their lengths.
fn text_blocks(root: &Element) -> Vec<(Vec<usize>, usize)> {
    fn walk(element: &Element, path: &mut Vec<usize>, out: &mut Vec<(Vec<usize>, usize)>) {
        if element.kind().is_text_block() {
            out.push((path.clone(), element.text_len()));
            return;
        }
        for (i, child) in element.children().iter().enumerate() {
            if let Some(child) = child.as_element() {
                path.push(i);
                walk(child, path, out);
                path.pop();
            }
        }
    }
    let mut out = Vec::new();
    walk(root, &mut Vec::new(), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_with(text: &str) -> Surface {
        let mut surface = Surface::create(SurfaceOptions::default()).unwrap();
        surface.load_data(text);
        while surface.take_notification().is_some() {}
        surface
    }

    fn cursor_at(surface: &mut Surface, block: Vec<usize>, offset: usize) {
        surface
            .set_selection(Selection::collapsed(Position::new(block, offset)))
            .unwrap();
    }

    #[test]
    fn test_create_starts_with_empty_paragraph() {
        let surface = Surface::create(SurfaceOptions::default()).unwrap();
        assert_eq!(surface.get_data(), "");
        assert_eq!(surface.root().child_count(), 1);
        assert_eq!(surface.selection().head(), &Position::new(vec![0], 0));
    }

    #[test]
    fn test_create_rejects_bad_table_size() {
        let options = SurfaceOptions {
            table_rows: 0,
            table_columns: 2,
        };
        assert_eq!(
            Surface::create(options).unwrap_err(),
            SurfaceError::TableSize { rows: 0, columns: 2 }
        );
    }

    #[test]
    fn test_load_data_clears_history_and_notifies_once() {
        let mut surface = Surface::create(SurfaceOptions::default()).unwrap();
        surface.load_data("# Title\nbody");
        assert_eq!(surface.undo_depth(), 0);
        assert!(surface.take_notification().is_some());
        assert!(surface.take_notification().is_none());
        assert_eq!(surface.get_data(), "# Title\nbody");
    }

    #[test]
    fn test_merge_data_keeps_ids_of_unchanged_blocks() {
        let mut surface = surface_with("a\nb\nc");
        let first = surface.block_id(0);
        let last = surface.block_id(2);
        let middle = surface.block_id(1);
        surface.merge_data("a\nB\nc");
        assert_eq!(surface.block_id(0), first);
        assert_eq!(surface.block_id(2), last);
        assert_ne!(surface.block_id(1), middle);
        assert_eq!(surface.undo_depth(), 1);
        assert!(surface.take_notification().is_some());
    }

    #[test]
    fn test_change_batch_emits_single_notification() {
        let mut surface = surface_with("hello");
        cursor_at(&mut surface, vec![0], 5);
        surface
            .change(|w| -> Result<(), ModelError> {
                w.remove_before_cursor(2)?;
                w.insert_text("p!")
            })
            .unwrap();
        assert_eq!(surface.get_data(), "help!");
        assert!(surface.take_notification().is_some());
        assert!(surface.take_notification().is_none());
    }

    #[test]
    fn test_failed_change_rolls_back() {
        let mut surface = surface_with("hello");
        cursor_at(&mut surface, vec![0], 5);
        let result = surface.change(|w| {
            w.insert_text("!!")?;
            w.remove_before_cursor(99)
        });
        assert!(result.is_err());
        assert_eq!(surface.get_data(), "hello");
        assert!(surface.take_notification().is_none());
        assert_eq!(surface.selection().head(), &Position::new(vec![0], 5));
    }

    #[test]
    fn test_change_without_edit_is_silent() {
        let mut surface = surface_with("x");
        surface.change(|_| Ok::<_, ModelError>(())).unwrap();
        assert!(surface.take_notification().is_none());
    }

    #[test]
    fn test_set_selection_rejects_invalid_position() {
        let mut surface = surface_with("abc");
        let bad = Selection::collapsed(Position::new(vec![3], 0));
        assert!(surface.set_selection(bad).is_err());
        assert_eq!(surface.selection().head(), &Position::new(vec![0], 0));
    }

    #[test]
    fn test_type_text_with_newline_splits_block() {
        let mut surface = surface_with("");
        surface.type_text("one\ntwo").unwrap();
        assert_eq!(surface.get_data(), "one\ntwo");
        assert_eq!(surface.selection().head(), &Position::new(vec![1], 3));
    }

    #[test]
    fn test_enter_continues_numbered_list() {
        let mut surface = surface_with("1. first");
        cursor_at(&mut surface, vec![0], 5);
        surface.enter().unwrap();
        surface.type_text("second").unwrap();
        assert_eq!(surface.get_data(), "1. first\n2. second");
    }

    #[test]
    fn test_enter_on_empty_list_item_leaves_list() {
        let mut surface = surface_with("- ");
        cursor_at(&mut surface, vec![0], 0);
        surface.enter().unwrap();
        assert_eq!(surface.get_data(), "");
    }

    #[test]
    fn test_enter_at_heading_end_starts_paragraph() {
        let mut surface = surface_with("# Title");
        cursor_at(&mut surface, vec![0], 5);
        surface.enter().unwrap();
        surface.type_text("body").unwrap();
        assert_eq!(surface.get_data(), "# Title\nbody");
    }

    #[test]
    fn test_enter_in_code_block_inserts_newline() {
        let mut surface = surface_with("```\nfn\n```");
        cursor_at(&mut surface, vec![0], 2);
        surface.enter().unwrap();
        assert_eq!(surface.get_data(), "```\nfn\n\n```");
    }

    #[test]
    fn test_enter_in_table_cell_is_rejected() {
        let mut surface = surface_with("| a | b |\n|---|---|");
        cursor_at(&mut surface, vec![0, 0, 0], 1);
        assert_eq!(surface.enter(), Err(ModelError::CannotSplit("tableCell")));
        assert_eq!(surface.get_data(), "| a | b |\n|---|---|");
    }

    #[test]
    fn test_backspace_joins_paragraphs() {
        let mut surface = surface_with("ab\ncd");
        cursor_at(&mut surface, vec![1], 0);
        surface.backspace().unwrap();
        assert_eq!(surface.get_data(), "abcd");
        assert_eq!(surface.selection().head(), &Position::new(vec![0], 2));
    }

    #[test]
    fn test_backspace_unwraps_heading() {
        let mut surface = surface_with("## x");
        cursor_at(&mut surface, vec![0], 0);
        surface.backspace().unwrap();
        assert_eq!(surface.get_data(), "x");
    }

    #[test]
    fn test_rule_only_document_opens_paragraph_on_typing() {
        let mut surface = surface_with("---");
        surface.type_text("x").unwrap();
        assert_eq!(surface.get_data(), "---\nx");
        assert_eq!(surface.selection().head(), &Position::new(vec![1], 1));
        assert!(surface.take_notification().is_some());
        assert!(surface.take_notification().is_none());
    }

    #[test]
    fn test_merge_ending_in_rule_puts_cursor_in_last_text_block() {
        let mut surface = surface_with("a\nb");
        surface.merge_data("a\n---");
        assert_eq!(surface.selection().head(), &Position::new(vec![0], 1));
        surface.type_text("!").unwrap();
        assert_eq!(surface.get_data(), "a!\n---");
    }

    #[test]
    fn test_backspace_deletes_range_selection() {
        let mut surface = surface_with("hello");
        surface
            .set_selection(Selection::range(Position::new(vec![0], 1), Position::new(vec![0], 4)))
            .unwrap();
        surface.backspace().unwrap();
        assert_eq!(surface.get_data(), "ho");
    }

    #[test]
    fn test_movement_crosses_blocks() {
        let mut surface = surface_with("ab\ncd");
        cursor_at(&mut surface, vec![0], 2);
        surface.move_right();
        assert_eq!(surface.selection().head(), &Position::new(vec![1], 0));
        surface.move_left();
        assert_eq!(surface.selection().head(), &Position::new(vec![0], 2));
        surface.move_home();
        assert_eq!(surface.selection().head(), &Position::new(vec![0], 0));
        surface.move_end();
        assert_eq!(surface.selection().head(), &Position::new(vec![0], 2));
    }

    #[test]
    fn test_insert_text_with_cursor_on_later_line() {
        let mut surface = surface_with("");
        surface
            .change(|w| w.insert_text_with_cursor("```\n\n```", (1, 0)))
            .unwrap();
        assert_eq!(surface.selection().head(), &Position::new(vec![1], 0));
    }

    #[test]
    fn test_typed_text_inherits_style_before_cursor() {
        let mut surface = surface_with("**bold**");
        cursor_at(&mut surface, vec![0], 4);
        surface.type_text("er").unwrap();
        assert_eq!(surface.get_data(), "**bolder**");
    }
}
