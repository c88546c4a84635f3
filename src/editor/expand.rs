//! Space-triggered expansion of slash triggers in plain text.

use super::buffer::{Cursor, TextBuffer};
use crate::catalog::{Catalog, cursor_after_insert};

/// A trigger that was expanded in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub trigger: String,
    /// Whether the replacement went onto a new line.
    pub new_line: bool,
    pub cursor: Cursor,
}

/// Expand the longest trigger ending just before a space that was typed at
/// the cursor. The trigger and the space are both replaced.
///
/// Headings and tables typed after other text on the line are moved onto a
/// new line.
pub fn expand_after_space(buffer: &mut TextBuffer, catalog: &Catalog) -> Option<Expansion> {
    let prefix = buffer.line_prefix();
    let before = prefix.strip_suffix(' ')?;
    let command = catalog.longest_suffix_match(before)?;
    let line = buffer.cursor().line;
    let start = before.len() - command.trigger.len();
    let kind = command.kind();
    let new_line = kind.starts_new_line() && !before[..start].trim().is_empty();
    let (line_delta, col) = cursor_after_insert(kind, &command.replacement);

    let cursor = if new_line {
        buffer.replace_range(line, start, prefix.len(), &format!("\n{}", command.replacement));
        Cursor::at(line + 1 + line_delta, col)
    } else {
        buffer.replace_range(line, start, prefix.len(), &command.replacement);
        if line_delta == 0 {
            Cursor::at(line, start + col)
        } else {
            Cursor::at(line + line_delta, col)
        }
    };
    buffer.move_to(cursor.line, cursor.col);
    tracing::debug!(trigger = %command.trigger, new_line, "expanded trigger");
    Some(Expansion {
        trigger: command.trigger.clone(),
        new_line,
        cursor: buffer.cursor(),
    })
}
