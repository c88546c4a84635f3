//! Plain-text editing mode.
//!
//! The document is edited as text in a rope-backed buffer. Slash triggers
//! expand when a space is typed after them; completion items and a
//! quick-pick of the catalog are offered on demand.

mod buffer;
mod completion;
mod expand;
mod tasks;

pub use buffer::{Cursor, Direction, TextBuffer};
pub use completion::{CompletionItem, Snippet, accept, completions};
pub use expand::{Expansion, expand_after_space};
pub use tasks::toggle_task_line;

use crossterm::event::KeyCode;

use crate::catalog::Catalog;

/// A plain-text editor bound to a command catalog.
#[derive(Debug)]
pub struct PlainEditor {
    buffer: TextBuffer,
    catalog: Catalog,
}

impl PlainEditor {
    pub fn new(text: &str, catalog: Catalog) -> Self {
        Self {
            buffer: TextBuffer::from_text(text),
            catalog,
        }
    }

    pub const fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub const fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Insert `text` at the cursor. A lone space may expand a trigger.
    pub fn insert(&mut self, text: &str) -> Option<Expansion> {
        self.buffer.insert_str(text);
        if text == " " {
            expand_after_space(&mut self.buffer, &self.catalog)
        } else {
            None
        }
    }

    /// Type `text` one character at a time, returning the expansions it caused.
    pub fn type_text(&mut self, text: &str) -> Vec<Expansion> {
        let mut expansions = Vec::new();
        let mut utf8 = [0; 4];
        for ch in text.chars() {
            if let Some(expansion) = self.insert(ch.encode_utf8(&mut utf8)) {
                expansions.push(expansion);
            }
        }
        expansions
    }

    /// Paste `text` as one insertion; it never expands triggers.
    pub fn paste(&mut self, text: &str) {
        self.buffer.insert_str(text);
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => self.buffer.split_line(),
            KeyCode::Backspace => {
                self.buffer.delete_back();
            }
            KeyCode::Left => self.buffer.move_cursor(Direction::Left),
            KeyCode::Right => self.buffer.move_cursor(Direction::Right),
            KeyCode::Up => self.buffer.move_cursor(Direction::Up),
            KeyCode::Down => self.buffer.move_cursor(Direction::Down),
            KeyCode::Home => self.buffer.move_home(),
            KeyCode::End => self.buffer.move_end(),
            _ => {}
        }
    }

    /// Completion items for the token at the cursor.
    pub fn completions(&self) -> Vec<CompletionItem> {
        completions(&self.catalog, &self.buffer)
    }

    /// Accept completion `index`. Returns `false` when there is no such item.
    pub fn accept_completion(&mut self, index: usize) -> bool {
        let Some(item) = self.completions().into_iter().nth(index) else {
            return false;
        };
        accept(&mut self.buffer, &item);
        true
    }

    /// Insert catalog entry `index`'s trigger literally at the cursor.
    pub fn insert_trigger(&mut self, index: usize) -> bool {
        let Some(trigger) = self.catalog.commands().get(index).map(|c| c.trigger.clone()) else {
            return false;
        };
        self.buffer.insert_str(&trigger);
        true
    }

    /// Toggle the checkbox on the cursor's line.
    pub fn toggle_task(&mut self) -> bool {
        let line = self.buffer.cursor().line;
        let Some(toggled) = self
            .buffer
            .line_at(line)
            .and_then(|text| toggle_task_line(&text))
        else {
            return false;
        };
        self.buffer.replace_line(line, &toggled);
        true
    }
}
