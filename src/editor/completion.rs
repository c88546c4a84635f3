//! Completion items for a slash token being typed in plain text.

use std::sync::LazyLock;

use regex::Regex;

use super::buffer::{Cursor, TextBuffer};
use crate::catalog::{Catalog, Command, CommandKind, end_of};

static TYPED_TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\w*)$").expect("valid regex"));

const TABLE_SNIPPET: &str = "|  |  |\n|----------|----------|\n|  |  |";

/// Text to insert and where the cursor goes, relative to the insertion
/// point: `(line_delta, column)` with a byte column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    pub cursor: (usize, usize),
}

/// One offered completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub detail: String,
    pub documentation: String,
    /// Line and byte range replaced when the item is accepted.
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub snippet: Snippet,
    /// Exact trigger matches sort first.
    pub sort_text: String,
}

/// Completion items for the `/word` ending at the cursor, best match first.
///
/// Triggers are matched case-sensitively against the text as typed.
pub fn completions(catalog: &Catalog, buffer: &TextBuffer) -> Vec<CompletionItem> {
    let prefix = buffer.line_prefix();
    let Some(found) = TYPED_TRIGGER.find(&prefix) else {
        return Vec::new();
    };
    let typed = found.as_str();
    let has_content_before = !prefix[..found.start()].trim().is_empty();
    let line = buffer.cursor().line;
    let mut items: Vec<CompletionItem> = catalog
        .commands()
        .iter()
        .filter(|c| c.trigger.starts_with(typed))
        .map(|command| CompletionItem {
            label: command.trigger.clone(),
            detail: command.description.clone(),
            documentation: format!("Insert {}", command.description.to_lowercase()),
            line,
            start: found.start(),
            end: prefix.len(),
            snippet: snippet(command, has_content_before),
            sort_text: format!("{}{}", if command.trigger == typed { '0' } else { '1' }, command.trigger),
        })
        .collect();
    items.sort_by(|a, b| a.sort_text.cmp(&b.sort_text));
    items
}

fn snippet(command: &Command, has_content_before: bool) -> Snippet {
    let kind = command.kind();
    let (text, cursor) = match kind {
        CommandKind::Table if has_content_before => (format!("\n{TABLE_SNIPPET}"), (1, 2)),
        CommandKind::Heading if has_content_before => {
            (format!("\n{}", command.replacement), (1, command.replacement.len()))
        }
        CommandKind::Table => (TABLE_SNIPPET.to_string(), (0, 2)),
        CommandKind::Emphasis => {
            let marker = if command.trigger == "/bold" { "**" } else { "*" };
            (format!("{marker}{marker}"), (0, marker.len()))
        }
        CommandKind::InlineCode => ("``".to_string(), (0, 1)),
        CommandKind::CodeBlock => ("```\n\n```".to_string(), (0, 3)),
        CommandKind::Heading | CommandKind::Other => {
            (command.replacement.clone(), end_of(&command.replacement))
        }
    };
    Snippet { text, cursor }
}

/// Replace the typed token with `item`'s snippet and place the cursor.
pub fn accept(buffer: &mut TextBuffer, item: &CompletionItem) {
    buffer.replace_range(item.line, item.start, item.end, &item.snippet.text);
    let (line_delta, col) = item.snippet.cursor;
    let cursor = if line_delta == 0 {
        Cursor::at(item.line, item.start + col)
    } else {
        Cursor::at(item.line + line_delta, col)
    };
    buffer.move_to(cursor.line, cursor.col);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_end(text: &str) -> TextBuffer {
        let mut buffer = TextBuffer::from_text(text);
        buffer.move_to_end();
        buffer
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn test_no_slash_no_items() {
        assert!(completions(&Catalog::builtin(), &at_end("hello")).is_empty());
    }

    #[test]
    fn test_prefix_filter_and_exact_first() {
        let items = completions(&Catalog::builtin(), &at_end("/code"));
        assert_eq!(labels(&items), vec!["/code", "/codeblock"]);
        assert_eq!(items[0].sort_text, "0/code");
        assert_eq!(items[1].sort_text, "1/codeblock");
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(completions(&Catalog::builtin(), &at_end("/H")).is_empty());
    }

    #[test]
    fn test_item_metadata_and_range() {
        let items = completions(&Catalog::builtin(), &at_end("see /qu"));
        let quote = &items[0];
        assert_eq!(quote.label, "/quote");
        assert_eq!(quote.detail, "Quote");
        assert_eq!(quote.documentation, "Insert quote");
        assert_eq!((quote.start, quote.end), (4, 7));
    }

    #[test]
    fn test_heading_after_content_gets_newline() {
        let items = completions(&Catalog::builtin(), &at_end("Intro /h3"));
        let h3 = items.iter().find(|i| i.label == "/h3").unwrap();
        assert_eq!(h3.snippet.text, "\n### ");
        assert_eq!(h3.snippet.cursor, (1, 4));
    }

    #[test]
    fn test_accept_bold_places_cursor_between_markers() {
        let mut buffer = at_end("make /bo");
        let items = completions(&Catalog::builtin(), &buffer);
        accept(&mut buffer, &items[0]);
        assert_eq!(buffer.text(), "make ****");
        assert_eq!(buffer.cursor(), Cursor::at(0, 7));
    }

    #[test]
    fn test_accept_table_after_content() {
        let mut buffer = at_end("x /table");
        let items = completions(&Catalog::builtin(), &buffer);
        accept(&mut buffer, &items[0]);
        assert_eq!(buffer.text(), format!("x \n{TABLE_SNIPPET}"));
        assert_eq!(buffer.cursor(), Cursor::at(1, 2));
    }

    #[test]
    fn test_accept_codeblock_cursor_after_fence() {
        let mut buffer = at_end("/codeb");
        let items = completions(&Catalog::builtin(), &buffer);
        accept(&mut buffer, &items[0]);
        assert_eq!(buffer.text(), "```\n\n```");
        assert_eq!(buffer.cursor(), Cursor::at(0, 3));
    }
}
