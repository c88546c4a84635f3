//! Structural actions the surface understands, looked up by name.

use thiserror::Error;

use super::{ModelError, Writer};
use crate::document::{Element, ElementKind, ListMarker, Node, TextRun};

/// A structural operation on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Paragraph,
    Heading(u8),
    BulletedList,
    NumberedList,
    TodoList,
    BlockQuote,
    CodeBlock,
    HorizontalLine,
    InsertTable,
    Bold,
    Italic,
    Code,
}

/// Action names accepted in catalog entries.
const ACTIONS: &[(&str, Action)] = &[
    ("paragraph", Action::Paragraph),
    ("heading1", Action::Heading(1)),
    ("heading2", Action::Heading(2)),
    ("heading3", Action::Heading(3)),
    ("heading4", Action::Heading(4)),
    ("heading5", Action::Heading(5)),
    ("heading6", Action::Heading(6)),
    ("bulletedList", Action::BulletedList),
    ("numberedList", Action::NumberedList),
    ("todoList", Action::TodoList),
    ("blockQuote", Action::BlockQuote),
    ("codeBlock", Action::CodeBlock),
    ("horizontalLine", Action::HorizontalLine),
    ("insertTable", Action::InsertTable),
    ("bold", Action::Bold),
    ("italic", Action::Italic),
    ("code", Action::Code),
];

impl Action {
    /// Resolve an action name. Unknown names yield `None`.
    pub fn lookup(name: &str) -> Option<Self> {
        ACTIONS.iter().find(|(n, _)| *n == name).map(|(_, a)| *a)
    }

    pub fn name(self) -> &'static str {
        ACTIONS
            .iter()
            .find(|(_, a)| *a == self)
            .map_or("unknown", |(n, _)| *n)
    }
}

/// A structural action could not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{action} is not supported in a {context}")]
    Unsupported {
        action: &'static str,
        context: &'static str,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub(super) fn execute(writer: &mut Writer<'_>, action: Action) -> Result<(), ActionError> {
    let cursor = writer.cursor()?;
    let block = writer.block(&cursor.block)?;
    let context = block.kind().name();
    let unsupported = || ActionError::Unsupported {
        action: action.name(),
        context,
    };
    if !block.kind().accepts_commands() {
        return Err(unsupported());
    }
    match action {
        Action::Bold | Action::Italic | Action::Code => {
            let mut style = writer
                .pending_style()
                .unwrap_or_else(|| block.style_at(cursor.offset));
            match action {
                Action::Bold => style.bold = !style.bold,
                Action::Italic => style.italic = !style.italic,
                _ => style.code = !style.code,
            }
            writer.set_pending_style(Some(style));
            Ok(())
        }
        Action::HorizontalLine | Action::InsertTable => {
            let [index] = cursor.block[..] else {
                return Err(unsupported());
            };
            let replace = block.is_empty_text_block() && matches!(block.kind(), ElementKind::Paragraph);
            let inserted = if action == Action::InsertTable {
                let options = writer.options();
                table(options.table_rows, options.table_columns)
            } else {
                Element::new(ElementKind::HorizontalLine {
                    marker: "---".to_string(),
                })
            };
            if replace {
                writer.replace_block(index, inserted);
            } else {
                writer.insert_block(index + 1, inserted);
            }
            let at = if replace { index } else { index + 1 };
            if action == Action::InsertTable {
                return writer.set_cursor(vec![at, 0, 0], 0).map_err(ActionError::from);
            }
            let follows_text = writer
                .root()
                .element(&[at + 1])
                .is_some_and(|next| next.kind().is_text_block());
            if !follows_text {
                writer.insert_block(at + 1, Element::text_block(ElementKind::Paragraph, Vec::new()));
            }
            writer.set_cursor(vec![at + 1], 0).map_err(ActionError::from)
        }
        _ => {
            if cursor.block.len() != 1 {
                return Err(unsupported());
            }
            let kind = block_kind(action);
            let code = matches!(kind, ElementKind::CodeBlock { .. });
            let block = writer.block_mut(&cursor.block)?;
            if code {
                let text = block.text();
                *block = Element::text_block(kind, vec![TextRun::plain(text)]);
            } else {
                block.set_kind(kind);
            }
            writer.set_cursor(cursor.block, cursor.offset).map_err(ActionError::from)
        }
    }
}

fn block_kind(action: Action) -> ElementKind {
    match action {
        Action::Heading(level) => ElementKind::Heading(level),
        Action::BulletedList => ElementKind::ListItem(ListMarker::bullet()),
        Action::NumberedList => ElementKind::ListItem(ListMarker::numbered()),
        Action::TodoList => ElementKind::ListItem(ListMarker::task()),
        Action::BlockQuote => ElementKind::BlockQuote,
        Action::CodeBlock => ElementKind::CodeBlock {
            language: String::new(),
        },
        _ => ElementKind::Paragraph,
    }
}

/// An empty table; the first row is the header.
fn table(rows: usize, columns: usize) -> Element {
    let row = || {
        let cells = (0..columns)
            .map(|_| Node::Element(Element::text_block(ElementKind::TableCell, Vec::new())))
            .collect();
        Node::Element(Element::with_children(ElementKind::TableRow, cells))
    };
    let delimiter = format!("|{}", "---|".repeat(columns));
    Element::with_children(ElementKind::Table { delimiter }, (0..rows).map(|_| row()).collect())
}
