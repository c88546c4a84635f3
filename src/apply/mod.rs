//! Executing a chosen command against the structured surface.
//!
//! The trigger text is removed and the command's effect applied inside one
//! change batch, so listeners see a single notification with the trigger
//! already gone.

use crate::catalog::{Command, CommandKind, cursor_after_insert};
use crate::surface::{Action, ModelError, Surface, Writer};

/// What a command does, resolved from its action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEffect {
    /// Run a structural action; insert `fallback` if it fails.
    Structural {
        action: Action,
        fallback: Option<String>,
    },
    /// Insert literal text.
    Insert(String),
    /// No action and an empty replacement.
    Nothing,
}

impl CommandEffect {
    /// Unknown action names degrade to the plain replacement.
    pub fn resolve(command: &Command) -> Self {
        let fallback = (!command.replacement.is_empty()).then(|| command.replacement.clone());
        match command.action.as_deref() {
            Some(name) => match Action::lookup(name) {
                Some(action) => Self::Structural { action, fallback },
                None => {
                    tracing::debug!(action = name, trigger = %command.trigger, "unknown action, using replacement");
                    fallback.map_or(Self::Nothing, Self::Insert)
                }
            },
            None => fallback.map_or(Self::Nothing, Self::Insert),
        }
    }
}

/// How a command ended up being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Action(Action),
    /// The action failed and the replacement text was inserted instead.
    Fallback,
    Inserted,
    /// Only the trigger was removed.
    TriggerRemoved,
}

/// Remove the `match_len` characters of trigger before the cursor and apply
/// `command`.
///
/// Headings and tables go on a fresh line when text precedes the trigger.
///
/// # Errors
/// Fails if the trigger cannot be removed or the fallback text cannot be
/// inserted; the document is then left exactly as it was.
pub fn apply(surface: &mut Surface, command: &Command, match_len: usize) -> Result<Applied, ModelError> {
    let effect = CommandEffect::resolve(command);
    surface.change(|writer| {
        writer.remove_before_cursor(match_len)?;
        let kind = command.kind();
        if kind.starts_new_line() && !writer.text_before_cursor()?.trim().is_empty() {
            writer.split_block()?;
        }
        match effect {
            CommandEffect::Structural { action, fallback } => match writer.execute(action) {
                Ok(()) => Ok(Applied::Action(action)),
                Err(e) => {
                    tracing::warn!(trigger = %command.trigger, error = %e, "action failed, inserting replacement");
                    match fallback {
                        Some(text) => insert(writer, kind, &text).map(|()| Applied::Fallback),
                        None => Ok(Applied::TriggerRemoved),
                    }
                }
            },
            CommandEffect::Insert(text) => insert(writer, kind, &text).map(|()| Applied::Inserted),
            CommandEffect::Nothing => Ok(Applied::TriggerRemoved),
        }
    })
}

fn insert(writer: &mut Writer<'_>, kind: CommandKind, text: &str) -> Result<(), ModelError> {
    writer.insert_text_with_cursor(text, cursor_after_insert(kind, text))
}
