//! Host side of the sync session: owns the external document.

use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::SyncError;
use super::eol::{LineEnding, normalize, to_line_ending};
use super::protocol::{HostMessage, SurfaceMessage};
use crate::catalog::Catalog;
use crate::editor::TextBuffer;
use crate::watcher::FileWatcher;

/// Debounce for on-disk change events.
pub const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Services of the windowing shell around the host.
pub trait HostShell {
    /// Show an error to the user.
    fn show_error(&mut self, message: &str);
    /// Clipboard content for a plain-text paste, if any.
    fn clipboard_text(&mut self) -> Option<String>;
    fn set_clipboard(&mut self, text: String);
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// The plain-text document of record, in its own line-ending convention.
#[derive(Debug)]
pub struct ExternalDocument {
    path: Option<PathBuf>,
    buffer: TextBuffer,
    eol: LineEnding,
    /// Hash of the bytes this process last wrote or read.
    disk_hash: Option<u64>,
}

impl ExternalDocument {
    /// Open `path`. A missing file is an empty new document.
    ///
    /// `eol` overrides the convention detected from the file.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: &Path, eol: Option<LineEnding>) -> Result<Self, SyncError> {
        let (text, disk_hash) = match fs::read(path) {
            Ok(bytes) => {
                let hash = hash_bytes(&bytes);
                (String::from_utf8_lossy(&bytes).into_owned(), Some(hash))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (String::new(), None),
            Err(source) => {
                return Err(SyncError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        let eol = eol.unwrap_or_else(|| LineEnding::detect(&text));
        let text = to_line_ending(&text, eol);
        tracing::debug!(path = %path.display(), ?eol, "opened document");
        Ok(Self {
            path: Some(path.to_path_buf()),
            buffer: TextBuffer::from_text(&text),
            eol,
            disk_hash,
        })
    }

    /// A document with no backing file.
    pub fn in_memory(text: &str) -> Self {
        Self {
            path: None,
            eol: LineEnding::detect(text),
            buffer: TextBuffer::from_text(text),
            disk_hash: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub const fn eol(&self) -> LineEnding {
        self.eol
    }

    pub const fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }

    /// Replace the whole content in one edit.
    pub fn replace_all(&mut self, text: &str) {
        self.buffer.replace_all(text);
        tracing::trace!(lines = self.buffer.line_count(), "replaced document content");
    }

    /// Paste `text` at the end of the document.
    pub fn append(&mut self, text: &str) {
        self.buffer.move_to_end();
        self.buffer.insert_str(&to_line_ending(text, self.eol));
    }

    /// Write the document to its file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&mut self) -> Result<(), SyncError> {
        if let Some(path) = &self.path {
            let text = self.buffer.text();
            fs::write(path, &text).map_err(|source| SyncError::Io {
                path: path.display().to_string(),
                source,
            })?;
            self.disk_hash = Some(hash_bytes(text.as_bytes()));
            tracing::debug!(path = %path.display(), "saved document");
        }
        self.buffer.mark_clean();
        Ok(())
    }

    /// Re-read the file after an on-disk change.
    ///
    /// Returns `false` when the file holds what this process last wrote or
    /// read, so its own saves are not taken for outside edits.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn reload(&mut self) -> Result<bool, SyncError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        let bytes = fs::read(path).map_err(|source| SyncError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let hash = hash_bytes(&bytes);
        if self.disk_hash == Some(hash) {
            return Ok(false);
        }
        self.disk_hash = Some(hash);
        let text = to_line_ending(&String::from_utf8_lossy(&bytes), self.eol);
        self.buffer.set_text(&text);
        self.buffer.mark_clean();
        tracing::debug!(path = %path.display(), "document changed on disk");
        Ok(true)
    }
}

/// The host end of the protocol.
pub struct HostSide<S> {
    document: ExternalDocument,
    catalog: Catalog,
    shell: S,
    watcher: Option<FileWatcher>,
    scroll_top: usize,
}

impl<S: HostShell> HostSide<S> {
    pub const fn new(document: ExternalDocument, catalog: Catalog, shell: S) -> Self {
        Self {
            document,
            catalog,
            shell,
            watcher: None,
            scroll_top: 0,
        }
    }

    /// Watch the document's file for changes made by other processes. An
    /// in-memory document is never watched.
    ///
    /// # Errors
    /// Returns an error if the file cannot be watched.
    pub fn watch(&mut self) -> Result<(), SyncError> {
        let Some(path) = self.document.path() else {
            return Ok(());
        };
        self.watcher = Some(FileWatcher::new(path, WATCH_DEBOUNCE)?);
        Ok(())
    }

    pub const fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub const fn document(&self) -> &ExternalDocument {
        &self.document
    }

    pub const fn shell(&self) -> &S {
        &self.shell
    }

    pub const fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    /// Messages sent as soon as the surface exists.
    pub fn opening_messages(&self) -> Vec<HostMessage> {
        vec![HostMessage::ScrollChanged {
            scroll_top: self.scroll_top,
        }]
    }

    /// React to a message from the surface.
    pub fn handle(&mut self, message: SurfaceMessage) -> Vec<HostMessage> {
        tracing::debug!(?message, "host received");
        match message {
            SurfaceMessage::Initialized => vec![
                self.document_changed(),
                HostMessage::SetSlashCommands {
                    commands: self.catalog.clone(),
                },
            ],
            SurfaceMessage::WebviewChanged { text } => {
                self.update_text_document(&text);
                Vec::new()
            }
            SurfaceMessage::PlainPaste => match self.shell.clipboard_text() {
                Some(text) => {
                    self.document.append(&text);
                    vec![self.document_changed()]
                }
                None => Vec::new(),
            },
            SurfaceMessage::EditorInitializationError { error } => {
                tracing::error!(%error, "editor initialization failed");
                self.shell
                    .show_error(&format!("Error initializing narkdown editor: {error}"));
                Vec::new()
            }
        }
    }

    /// The document content, normalized to `\n`.
    pub fn document_changed(&self) -> HostMessage {
        HostMessage::DocumentChanged {
            text: normalize(&self.document.text()),
        }
    }

    /// Save, then push the saved content.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&mut self) -> Result<Vec<HostMessage>, SyncError> {
        self.document.save()?;
        Ok(vec![self.document_changed()])
    }

    /// Record the host view's top line and forward it.
    pub fn scroll(&mut self, line: usize) -> Vec<HostMessage> {
        self.scroll_top = line;
        vec![HostMessage::ScrollChanged { scroll_top: line }]
    }

    /// Pick up a debounced on-disk change, if one is ready.
    ///
    /// # Errors
    /// Returns an error if the changed file cannot be read.
    pub fn poll_watcher(&mut self) -> Result<Vec<HostMessage>, SyncError> {
        let ready = self
            .watcher
            .as_mut()
            .is_some_and(FileWatcher::take_change_ready);
        if ready {
            self.external_change()
        } else {
            Ok(Vec::new())
        }
    }

    /// The file changed outside this process.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn external_change(&mut self) -> Result<Vec<HostMessage>, SyncError> {
        if self.document.reload()? {
            Ok(vec![self.document_changed()])
        } else {
            Ok(Vec::new())
        }
    }

    /// Write surface content into the document if it differs.
    ///
    /// Returns whether the document changed.
    pub fn update_text_document(&mut self, text: &str) -> bool {
        let text = to_line_ending(text, self.document.eol());
        if text == self.document.text() {
            return false;
        }
        self.document.replace_all(&text);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingShell {
        errors: Vec<String>,
        clipboard: Option<String>,
    }

    impl HostShell for RecordingShell {
        fn show_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }

        fn clipboard_text(&mut self) -> Option<String> {
            self.clipboard.take()
        }

        fn set_clipboard(&mut self, text: String) {
            self.clipboard = Some(text);
        }
    }

    fn host(text: &str) -> HostSide<RecordingShell> {
        HostSide::new(
            ExternalDocument::in_memory(text),
            Catalog::builtin(),
            RecordingShell::default(),
        )
    }

    #[test]
    fn test_initialized_gets_document_then_catalog() {
        let mut host = host("a\r\nb");
        let replies = host.handle(SurfaceMessage::Initialized);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], HostMessage::DocumentChanged { text: "a\nb".into() });
        assert!(matches!(replies[1], HostMessage::SetSlashCommands { .. }));
    }

    #[test]
    fn test_webview_change_converts_to_document_eol() {
        let mut host = host("a\r\nb");
        host.handle(SurfaceMessage::WebviewChanged { text: "a\nb\nc".into() });
        assert_eq!(host.document().text(), "a\r\nb\r\nc");
        assert!(host.document().is_dirty());
    }

    #[test]
    fn test_identical_content_is_not_written() {
        let mut host = host("a\r\nb");
        assert!(!host.update_text_document("a\nb"));
        assert!(!host.document().is_dirty());
    }

    #[test]
    fn test_initialization_error_is_shown() {
        let mut host = host("");
        let replies = host.handle(SurfaceMessage::EditorInitializationError { error: "boom".into() });
        assert!(replies.is_empty());
        assert_eq!(host.shell().errors, vec!["Error initializing narkdown editor: boom"]);
    }

    #[test]
    fn test_plain_paste_appends_clipboard_and_pushes() {
        let mut host = host("top\n");
        host.shell_mut().set_clipboard("pasted".into());
        let replies = host.handle(SurfaceMessage::PlainPaste);
        assert_eq!(replies, vec![HostMessage::DocumentChanged { text: "top\npasted".into() }]);
        assert!(host.handle(SurfaceMessage::PlainPaste).is_empty());
    }

    #[test]
    fn test_save_writes_file_and_pushes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        let mut host = HostSide::new(
            ExternalDocument::open(&path, None).unwrap(),
            Catalog::builtin(),
            RecordingShell::default(),
        );
        host.update_text_document("# saved");
        let replies = host.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# saved");
        assert_eq!(replies, vec![HostMessage::DocumentChanged { text: "# saved".into() }]);
        assert!(!host.document().is_dirty());
    }

    #[test]
    fn test_own_save_is_not_an_external_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        fs::write(&path, "old").unwrap();
        let mut host = HostSide::new(
            ExternalDocument::open(&path, None).unwrap(),
            Catalog::builtin(),
            RecordingShell::default(),
        );
        host.update_text_document("mine");
        host.save().unwrap();
        assert!(host.external_change().unwrap().is_empty());

        fs::write(&path, "theirs\r\nline").unwrap();
        let replies = host.external_change().unwrap();
        assert_eq!(replies, vec![HostMessage::DocumentChanged { text: "theirs\nline".into() }]);
    }

    #[test]
    fn test_open_crlf_file_keeps_convention() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("win.md");
        fs::write(&path, "a\r\nb").unwrap();
        let doc = ExternalDocument::open(&path, None).unwrap();
        assert_eq!(doc.eol(), LineEnding::CrLf);
        let forced = ExternalDocument::open(&path, Some(LineEnding::Lf)).unwrap();
        assert_eq!(forced.text(), "a\nb");
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let doc = ExternalDocument::open(&dir.path().join("new.md"), None).unwrap();
        assert_eq!(doc.text(), "");
        assert!(!doc.is_dirty());
    }
}
