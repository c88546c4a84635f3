//! Command menu state machine.
//!
//! `Closed` or `Open` with a non-empty candidate list and a selected index
//! that is always in range. Scans open, refilter or close the menu; arrow
//! keys move the selection with wraparound; Enter executes.

use crossterm::event::KeyCode;

use crate::catalog::{Catalog, Command};
use crate::scanner::Scan;

/// Menu visibility and candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MenuState {
    #[default]
    Closed,
    Open {
        candidates: Vec<Command>,
        selected: usize,
    },
}

/// What a key press did to the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not for the menu; pass it to the editing surface.
    Ignored,
    /// Handled by the menu; the surface must not see it.
    Consumed,
    /// Run this command. The menu is already closed.
    Execute(Command),
}

/// The slash-command menu bound to a catalog.
#[derive(Debug, Clone, Default)]
pub struct CommandMenu {
    catalog: Catalog,
    state: MenuState,
}

impl CommandMenu {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            state: MenuState::Closed,
        }
    }

    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Replace the catalog. An open menu is closed.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        self.close();
    }

    pub const fn state(&self) -> &MenuState {
        &self.state
    }

    pub const fn is_open(&self) -> bool {
        matches!(self.state, MenuState::Open { .. })
    }

    pub const fn selected_index(&self) -> Option<usize> {
        match &self.state {
            MenuState::Open { selected, .. } => Some(*selected),
            MenuState::Closed => None,
        }
    }

    pub fn candidates(&self) -> &[Command] {
        match &self.state {
            MenuState::Open { candidates, .. } => candidates,
            MenuState::Closed => &[],
        }
    }

    /// Feed the scanner's verdict for the latest content change.
    pub fn on_scan(&mut self, scan: &Scan) {
        let Scan::Match(found) = scan else {
            self.close();
            return;
        };
        let candidates = self.catalog.filter(&found.query);
        if candidates.is_empty() {
            tracing::debug!(query = %found.query, "no command matches, menu closed");
            self.close();
        } else {
            tracing::debug!(query = %found.query, count = candidates.len(), "menu open");
            self.state = MenuState::Open {
                candidates,
                selected: 0,
            };
        }
    }

    /// Handle a key press while the menu may be open.
    pub fn handle_key(&mut self, key: KeyCode) -> KeyOutcome {
        let MenuState::Open {
            candidates,
            selected,
        } = &mut self.state
        else {
            return KeyOutcome::Ignored;
        };
        let count = candidates.len();
        match key {
            KeyCode::Down => {
                *selected = (*selected + 1) % count;
                KeyOutcome::Consumed
            }
            KeyCode::Up => {
                *selected = (*selected + count - 1) % count;
                KeyOutcome::Consumed
            }
            KeyCode::Enter => {
                let index = *selected;
                self.pick(index)
                    .map_or(KeyOutcome::Consumed, KeyOutcome::Execute)
            }
            KeyCode::Esc => {
                self.close();
                KeyOutcome::Consumed
            }
            _ => KeyOutcome::Ignored,
        }
    }

    /// Pointer selection of candidate `index`. Closes the menu when it hits.
    pub fn pick(&mut self, index: usize) -> Option<Command> {
        let command = self.candidates().get(index).cloned()?;
        self.close();
        Some(command)
    }

    pub fn close(&mut self) {
        self.state = MenuState::Closed;
    }
}
