//! Slash command catalog.
//!
//! The catalog is static configuration: an ordered list of commands loaded
//! once at startup (builtin or from a JSON file) and never mutated. Order is
//! significant; it is the candidate order shown in the menu and the
//! tie-break when two entries share a trigger.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read command catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid command catalog {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("command trigger {0:?} must start with '/'")]
    BadTrigger(String),
}

/// A single slash command.
///
/// Serialized as `{ trigger, description, replacement, action? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub trigger: String,
    pub description: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Command {
    pub fn new(trigger: &str, description: &str, replacement: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
            description: description.to_string(),
            replacement: replacement.to_string(),
            action: None,
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// Formatting family of this command, used for newline and cursor rules.
    pub fn kind(&self) -> CommandKind {
        CommandKind::of(&self.trigger)
    }
}

/// Families of commands that get special newline or cursor handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Heading,
    Table,
    Emphasis,
    InlineCode,
    CodeBlock,
    Other,
}

impl CommandKind {
    pub fn of(trigger: &str) -> Self {
        match trigger {
            "/table" => Self::Table,
            "/bold" | "/italic" => Self::Emphasis,
            "/code" => Self::InlineCode,
            "/codeblock" => Self::CodeBlock,
            t if is_heading_trigger(t) => Self::Heading,
            _ => Self::Other,
        }
    }

    /// Whether content already on the line pushes this command onto a new line.
    pub const fn starts_new_line(self) -> bool {
        matches!(self, Self::Heading | Self::Table)
    }
}

fn is_heading_trigger(trigger: &str) -> bool {
    trigger
        .strip_prefix("/h")
        .is_some_and(|level| matches!(level, "1" | "2" | "3" | "4" | "5" | "6"))
}

/// Where the cursor lands after `replacement` was inserted at `(0, 0)`.
///
/// Returned as `(line_delta, column)`: lines below the insertion line, and a
/// byte column. Column is relative to the insertion column when
/// `line_delta == 0` and absolute otherwise.
pub fn cursor_after_insert(kind: CommandKind, replacement: &str) -> (usize, usize) {
    match kind {
        CommandKind::Emphasis => (0, replacement.len() / 2),
        CommandKind::InlineCode => (0, 1.min(replacement.len())),
        CommandKind::CodeBlock if replacement.contains('\n') => (1, 0),
        CommandKind::Table if replacement.starts_with("| ") => (0, 2),
        _ => end_of(replacement),
    }
}

/// `(line_delta, column)` of the end of `text`.
pub fn end_of(text: &str) -> (usize, usize) {
    let line_delta = text.matches('\n').count();
    let last = text.rsplit('\n').next().unwrap_or_default();
    (line_delta, last.len())
}

/// Ordered command list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    commands: Vec<Command>,
}

impl Catalog {
    pub const fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// The stock command set, in display order.
    ///
    /// `/numbered` appears twice; both entries are offered.
    pub fn builtin() -> Self {
        let commands = vec![
            Command::new("/text", "Text", "").with_action("paragraph"),
            Command::new("/bullet", "Bullet Point", "* ").with_action("bulletedList"),
            Command::new("/numbered", "Numbered List", "1. ").with_action("numberedList"),
            Command::new("/h1", "Header 1", "# ").with_action("heading1"),
            Command::new("/h2", "Header 2", "## ").with_action("heading2"),
            Command::new("/h3", "Header 3", "### ").with_action("heading3"),
            Command::new("/h4", "Header 4", "#### ").with_action("heading4"),
            Command::new("/h5", "Header 5", "##### ").with_action("heading5"),
            Command::new("/h6", "Header 6", "###### ").with_action("heading6"),
            Command::new("/bold", "Bold text", "****").with_action("bold"),
            Command::new("/italic", "Italic text", "**").with_action("italic"),
            Command::new("/code", "Inline code", "``").with_action("code"),
            Command::new("/codeblock", "Code block", "```\n\n```").with_action("codeBlock"),
            Command::new("/quote", "Quote", "> ").with_action("blockQuote"),
            Command::new("/list", "Bullet list", "- ").with_action("bulletedList"),
            Command::new("/numbered", "Numbered list", "1. ").with_action("numberedList"),
            Command::new("/task", "Task list", "- [ ] ").with_action("todoList"),
            Command::new("/line", "Horizontal line", "---\n").with_action("horizontalLine"),
            Command::new(
                "/table",
                "Table",
                "| Column 1 | Column 2 |\n|----------|----------|\n| | |",
            )
            .with_action("insertTable"),
        ];
        Self { commands }
    }

    /// Load a catalog from a JSON array of command objects.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or a
    /// trigger does not start with `/`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog: Self = serde_json::from_str(&content).map_err(|source| CatalogError::Json {
            path: path.display().to_string(),
            source,
        })?;
        if let Some(bad) = catalog.commands.iter().find(|c| !c.trigger.starts_with('/')) {
            return Err(CatalogError::BadTrigger(bad.trigger.clone()));
        }
        tracing::debug!(path = %path.display(), count = catalog.len(), "loaded command catalog");
        Ok(catalog)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands whose lowercased trigger starts with `/` + `query`.
    ///
    /// `query` is expected to be lowercase already. Catalog order is kept.
    pub fn filter(&self, query: &str) -> Vec<Command> {
        let prefix = format!("/{query}");
        self.commands
            .iter()
            .filter(|c| c.trigger.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Longest trigger that `text` ends with; the earlier entry wins a tie.
    pub fn longest_suffix_match(&self, text: &str) -> Option<&Command> {
        self.commands
            .iter()
            .filter(|c| !c.trigger.is_empty() && text.ends_with(c.trigger.as_str()))
            .fold(None, |best: Option<&Command>, c| match best {
                Some(b) if b.trigger.len() >= c.trigger.len() => Some(b),
                _ => Some(c),
            })
    }
}
