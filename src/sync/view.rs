//! Surface side of the sync session.
//!
//! Owns the structured surface and the command menu. Host pushes arrive as
//! [`HostMessage`]s; local edits leave as [`SurfaceMessage`]s unless the echo
//! token marks them as the surface's own reaction to a push.

use crossterm::event::KeyCode;

use super::echo::EchoSuppressor;
use super::eol::normalize;
use super::protocol::{HostMessage, PersistedState, SurfaceMessage};
use crate::apply::apply;
use crate::catalog::{Catalog, Command};
use crate::menu::{CommandMenu, KeyOutcome};
use crate::scanner::{Scan, scan};
use crate::surface::{Surface, SurfaceError, SurfaceOptions};

/// Storage for the `{ text }` blob that outlives one surface.
pub trait StateStore {
    fn load(&self) -> Option<PersistedState>;
    fn store(&mut self, state: PersistedState);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    state: Option<PersistedState>,
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Option<PersistedState> {
        self.state.clone()
    }

    fn store(&mut self, state: PersistedState) {
        self.state = Some(state);
    }
}

/// User input reaching the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyCode),
    /// Typed text, delivered one character at a time.
    Text(String),
    /// Pointer selection of a menu candidate.
    Pick(usize),
    PlainPaste,
}

/// What the surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceView {
    pub text: String,
    pub menu: Vec<String>,
    pub selected: Option<usize>,
    pub dirty: bool,
    pub scroll_top: usize,
}

/// A structured surface wired to the boundary protocol.
#[derive(Debug)]
pub struct SurfaceSession<T> {
    surface: Surface,
    menu: CommandMenu,
    echo: EchoSuppressor,
    /// Set once content has been loaded, from the store or a push.
    loaded: bool,
    /// Serialized content after the last push.
    saved_data: Option<String>,
    scroll_top: usize,
    store: T,
}

impl<T: StateStore> SurfaceSession<T> {
    /// Create the surface and restore stored state.
    ///
    /// Returns the session and the `initialized` message for the host.
    ///
    /// # Errors
    /// Returns an error if the surface cannot be constructed.
    pub fn start(options: SurfaceOptions, store: T) -> Result<(Self, SurfaceMessage), SurfaceError> {
        let surface = Surface::create(options)?;
        let mut session = Self {
            surface,
            menu: CommandMenu::new(Catalog::default()),
            echo: EchoSuppressor::new(),
            loaded: false,
            saved_data: None,
            scroll_top: 0,
            store,
        };
        if let Some(state) = session.store.load() {
            tracing::debug!(len = state.text.len(), "restoring surface state");
            let _guard = session.echo.arm();
            session.surface.load_data(&state.text);
            session.loaded = true;
            session.saved_data = Some(session.surface.get_data());
            // Echoes only; nothing leaves.
            let restored = session.process_notifications();
            debug_assert!(restored.is_empty());
        }
        Ok((session, SurfaceMessage::Initialized))
    }

    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    pub const fn menu(&self) -> &CommandMenu {
        &self.menu
    }

    pub const fn echo(&self) -> &EchoSuppressor {
        &self.echo
    }

    pub const fn store(&self) -> &T {
        &self.store
    }

    pub fn into_store(self) -> T {
        self.store
    }

    pub const fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    /// Content differs from what the host last pushed.
    pub fn is_dirty(&self) -> bool {
        self.saved_data.as_deref() != Some(self.surface.get_data().as_str())
    }

    pub fn view(&self) -> SurfaceView {
        SurfaceView {
            text: self.surface.get_data(),
            menu: self
                .menu
                .candidates()
                .iter()
                .map(|c| c.trigger.clone())
                .collect(),
            selected: self.menu.selected_index(),
            dirty: self.is_dirty(),
            scroll_top: self.scroll_top,
        }
    }

    pub fn handle_host_message(&mut self, message: HostMessage) -> Vec<SurfaceMessage> {
        tracing::debug!(?message, "surface received");
        match message {
            HostMessage::DocumentChanged { text } => {
                let text = normalize(&text);
                self.store.store(PersistedState { text: text.clone() });
                self.set_editor_content(&text)
            }
            HostMessage::ScrollChanged { scroll_top } => {
                self.scroll_top = scroll_top;
                Vec::new()
            }
            HostMessage::SetSlashCommands { commands } => {
                tracing::debug!(count = commands.len(), "catalog received");
                self.menu.set_catalog(commands);
                Vec::new()
            }
        }
    }

    fn set_editor_content(&mut self, text: &str) -> Vec<SurfaceMessage> {
        let out = if !self.loaded {
            let _guard = self.echo.arm();
            self.surface.load_data(text);
            self.loaded = true;
            self.process_notifications()
        } else if self.surface.get_data() == text {
            tracing::debug!("pushed content already shown");
            Vec::new()
        } else {
            let selection = self.surface.selection().clone();
            let _guard = self.echo.arm();
            self.surface.merge_data(text);
            if let Err(e) = self.surface.set_selection(selection) {
                tracing::warn!(error = %e, "selection invalid after merge, cursor moved to end");
                self.surface.select_end();
            }
            self.process_notifications()
        };
        self.saved_data = Some(self.surface.get_data());
        out
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<SurfaceMessage> {
        match event {
            InputEvent::Key(key) => match self.menu.handle_key(key) {
                KeyOutcome::Consumed => Vec::new(),
                KeyOutcome::Execute(command) => self.execute(&command),
                KeyOutcome::Ignored => self.edit_key(key),
            },
            InputEvent::Text(text) => {
                let mut out = Vec::new();
                let mut utf8 = [0; 4];
                for ch in text.chars() {
                    if let Err(e) = self.surface.type_text(ch.encode_utf8(&mut utf8)) {
                        tracing::warn!(error = %e, "typing rejected");
                    }
                    out.extend(self.process_notifications());
                }
                out
            }
            InputEvent::Pick(index) => match self.menu.pick(index) {
                Some(command) => self.execute(&command),
                None => Vec::new(),
            },
            InputEvent::PlainPaste => vec![SurfaceMessage::PlainPaste],
        }
    }

    fn edit_key(&mut self, key: KeyCode) -> Vec<SurfaceMessage> {
        let edited = match key {
            KeyCode::Enter => self.surface.enter(),
            KeyCode::Backspace => self.surface.backspace(),
            KeyCode::Left => {
                self.surface.move_left();
                Ok(())
            }
            KeyCode::Right => {
                self.surface.move_right();
                Ok(())
            }
            KeyCode::Home => {
                self.surface.move_home();
                Ok(())
            }
            KeyCode::End => {
                self.surface.move_end();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = edited {
            tracing::warn!(?key, error = %e, "edit rejected");
        }
        if matches!(key, KeyCode::Left | KeyCode::Right | KeyCode::Home | KeyCode::End) {
            let found = scan(self.surface.root(), self.surface.selection());
            self.menu.on_scan(&found);
        }
        self.process_notifications()
    }

    fn execute(&mut self, command: &Command) -> Vec<SurfaceMessage> {
        let match_len = match scan(self.surface.root(), self.surface.selection()) {
            Scan::Match(found) => found.match_len,
            Scan::NoMatch | Scan::RangeSelected => 0,
        };
        match apply(&mut self.surface, command, match_len) {
            Ok(applied) => tracing::debug!(trigger = %command.trigger, ?applied, "command applied"),
            Err(e) => tracing::warn!(trigger = %command.trigger, error = %e, "command not applied"),
        }
        self.process_notifications()
    }

    /// Drain change notifications: rescan for the menu, then either swallow
    /// the echo of a push or report the new content.
    fn process_notifications(&mut self) -> Vec<SurfaceMessage> {
        let mut out = Vec::new();
        while let Some(change) = self.surface.take_notification() {
            let found = scan(self.surface.root(), self.surface.selection());
            self.menu.on_scan(&found);
            if self.echo.take() {
                tracing::trace!(revision = change.revision, "echo swallowed");
                continue;
            }
            let text = self.surface.get_data();
            self.store.store(PersistedState { text: text.clone() });
            out.push(SurfaceMessage::WebviewChanged { text });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> SurfaceSession<MemoryStateStore> {
        let (mut session, msg) = SurfaceSession::start(SurfaceOptions::default(), MemoryStateStore::default()).unwrap();
        assert_eq!(msg, SurfaceMessage::Initialized);
        session.handle_host_message(HostMessage::SetSlashCommands {
            commands: Catalog::builtin(),
        });
        session
    }

    fn push(session: &mut SurfaceSession<MemoryStateStore>, text: &str) -> Vec<SurfaceMessage> {
        session.handle_host_message(HostMessage::DocumentChanged { text: text.into() })
    }

    fn changed(text: &str) -> SurfaceMessage {
        SurfaceMessage::WebviewChanged { text: text.into() }
    }

    #[test]
    fn test_first_push_loads_without_history() {
        let mut session = started();
        assert!(push(&mut session, "# Title\nbody").is_empty());
        assert_eq!(session.surface().get_data(), "# Title\nbody");
        assert_eq!(session.surface().undo_depth(), 0);
        assert!(!session.is_dirty());
        assert!(!session.echo().is_armed());
    }

    #[test]
    fn test_identical_push_is_skipped() {
        let mut session = started();
        push(&mut session, "same");
        let revision = session.surface().revision();
        assert!(push(&mut session, "same").is_empty());
        assert_eq!(session.surface().revision(), revision);
        assert!(!session.echo().is_armed());
    }

    #[test]
    fn test_differing_push_merges_silently() {
        let mut session = started();
        push(&mut session, "one\ntwo");
        assert!(push(&mut session, "one\ntwo\nthree").is_empty());
        assert_eq!(session.surface().undo_depth(), 1);
        assert_eq!(session.surface().get_data(), "one\ntwo\nthree");
    }

    #[test]
    fn test_push_with_crlf_is_normalized() {
        let mut session = started();
        push(&mut session, "a\r\nb");
        assert_eq!(session.surface().get_data(), "a\nb");
    }

    #[test]
    fn test_typing_reports_changes_and_opens_menu() {
        let mut session = started();
        push(&mut session, "");
        let out = session.handle_input(InputEvent::Text("/h".into()));
        assert_eq!(out, vec![changed("/"), changed("/h")]);
        let view = session.view();
        assert_eq!(view.menu, vec!["/h1", "/h2", "/h3", "/h4", "/h5", "/h6"]);
        assert_eq!(view.selected, Some(0));
        assert!(view.dirty);
    }

    #[test]
    fn test_menu_navigation_keys_do_not_reach_surface() {
        let mut session = started();
        push(&mut session, "");
        session.handle_input(InputEvent::Text("/h".into()));
        let revision = session.surface().revision();
        assert!(session.handle_input(InputEvent::Key(KeyCode::Up)).is_empty());
        assert_eq!(session.menu().selected_index(), Some(5));
        assert!(session.handle_input(InputEvent::Key(KeyCode::Down)).is_empty());
        assert_eq!(session.menu().selected_index(), Some(0));
        assert_eq!(session.surface().revision(), revision);
    }

    #[test]
    fn test_enter_executes_selected_command() {
        let mut session = started();
        push(&mut session, "");
        session.handle_input(InputEvent::Text("/h2".into()));
        let out = session.handle_input(InputEvent::Key(KeyCode::Enter));
        assert_eq!(out, vec![changed("## ")]);
        assert!(!session.menu().is_open());
        session.handle_input(InputEvent::Text("Title".into()));
        assert_eq!(session.surface().get_data(), "## Title");
    }

    #[test]
    fn test_trigger_after_text_moves_heading_to_next_line() {
        let mut session = started();
        push(&mut session, "");
        session.handle_input(InputEvent::Text("Hello/h2".into()));
        session.handle_input(InputEvent::Key(KeyCode::Enter));
        assert_eq!(session.surface().get_data(), "Hello\n## ");
        assert_eq!(session.surface().selection().head().path[0], 1);
    }

    #[test]
    fn test_pick_executes_candidate() {
        let mut session = started();
        push(&mut session, "");
        session.handle_input(InputEvent::Text("/ta".into()));
        assert_eq!(session.view().menu, vec!["/task", "/table"]);
        session.handle_input(InputEvent::Pick(1));
        assert_eq!(session.surface().get_data(), "| | |\n|---|---|\n| | |");
        assert_eq!(session.surface().selection().head().path[..3], [0, 0, 0]);
    }

    #[test]
    fn test_esc_closes_menu_then_reaches_surface() {
        let mut session = started();
        push(&mut session, "");
        session.handle_input(InputEvent::Text("/b".into()));
        assert!(session.menu().is_open());
        assert!(session.handle_input(InputEvent::Key(KeyCode::Esc)).is_empty());
        assert!(!session.menu().is_open());
        assert!(session.handle_input(InputEvent::Key(KeyCode::Esc)).is_empty());
    }

    #[test]
    fn test_unmatched_query_closes_menu() {
        let mut session = started();
        push(&mut session, "");
        session.handle_input(InputEvent::Text("/zz".into()));
        assert!(!session.menu().is_open());
        assert_eq!(session.handle_input(InputEvent::Key(KeyCode::Enter)).len(), 1);
    }

    #[test]
    fn test_push_keeps_selection_or_falls_back_to_end() {
        let mut session = started();
        push(&mut session, "first\nsecond");
        session.handle_input(InputEvent::Key(KeyCode::End));
        push(&mut session, "first!\nsecond");
        assert_eq!(session.surface().selection().head().path[0], 0);

        push(&mut session, "a\nb\nc");
        let end = crate::document::end_of_document(session.surface().root());
        session
            .surface
            .set_selection(crate::document::Selection::collapsed(end))
            .unwrap();
        push(&mut session, "a");
        assert_eq!(session.surface().selection().head().path[0], 0);
    }

    #[test]
    fn test_restored_state_is_shown_before_first_push() {
        let mut store = MemoryStateStore::default();
        store.store(PersistedState { text: "# kept".into() });
        let (mut session, _) = SurfaceSession::start(SurfaceOptions::default(), store).unwrap();
        assert_eq!(session.surface().get_data(), "# kept");
        assert!(!session.echo().is_armed());
        assert!(!session.is_dirty());
        assert!(push(&mut session, "# kept").is_empty());
        assert_eq!(session.surface().undo_depth(), 0);
    }

    #[test]
    fn test_rule_only_document_accepts_typing() {
        let mut session = started();
        push(&mut session, "---");
        let out = session.handle_input(InputEvent::Text("x".into()));
        assert_eq!(out, vec![changed("---\nx")]);
        assert_eq!(session.surface().get_data(), "---\nx");
    }

    #[test]
    fn test_push_ending_in_rule_keeps_surface_editable() {
        let mut session = started();
        push(&mut session, "a\nb\nc\nd");
        session
            .surface
            .set_selection(crate::document::Selection::collapsed(crate::document::Position::new(
                vec![3],
                1,
            )))
            .unwrap();
        push(&mut session, "a\n---");
        let out = session.handle_input(InputEvent::Text("/h".into()));
        assert_eq!(out, vec![changed("a/\n---"), changed("a/h\n---")]);
        assert!(session.menu().is_open());
    }

    #[test]
    fn test_cursor_move_off_trigger_closes_menu() {
        let mut session = started();
        push(&mut session, "");
        session.handle_input(InputEvent::Text("/h".into()));
        assert!(session.menu().is_open());
        assert!(session.handle_input(InputEvent::Key(KeyCode::Home)).is_empty());
        assert!(!session.menu().is_open());
        session.handle_input(InputEvent::Key(KeyCode::End));
        assert_eq!(session.view().menu.len(), 6);
    }

    #[test]
    fn test_local_edits_update_stored_state() {
        let mut session = started();
        push(&mut session, "x");
        session.handle_input(InputEvent::Key(KeyCode::End));
        session.handle_input(InputEvent::Text("y".into()));
        assert_eq!(session.store().load().unwrap().text, "xy");
    }

    #[test]
    fn test_scroll_and_plain_paste() {
        let mut session = started();
        session.handle_host_message(HostMessage::ScrollChanged { scroll_top: 7 });
        assert_eq!(session.scroll_top(), 7);
        assert_eq!(session.handle_input(InputEvent::PlainPaste), vec![SurfaceMessage::PlainPaste]);
    }

    #[test]
    fn test_bad_table_size_fails_to_start() {
        let options = SurfaceOptions {
            table_rows: 0,
            table_columns: 2,
        };
        assert!(SurfaceSession::start(options, MemoryStateStore::default()).is_err());
    }
}
