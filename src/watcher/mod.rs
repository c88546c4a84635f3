//! Watches the external document's file for edits made by other processes.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Collapses a burst of change events into one ready signal.
#[derive(Debug, Clone)]
pub struct Debounce {
    quiet: Duration,
    pending_since: Option<Instant>,
}

impl Debounce {
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending_since: None,
        }
    }

    /// Record a change seen at `now`. Later changes restart the quiet period.
    pub const fn touch(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    pub const fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// True once, when the quiet period after the last change has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.pending_since {
            Some(since) if now.saturating_duration_since(since) >= self.quiet => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}

/// Watches one document file. Events arrive on notify's thread and are
/// drained by polling.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    dir: PathBuf,
    document: PathBuf,
    file_name: Option<OsString>,
    debounce: Debounce,
}

impl FileWatcher {
    /// Watch `path`, signalling once changes have been quiet for `quiet`.
    ///
    /// # Errors
    /// Returns an error if the watcher cannot be created or the directory
    /// cannot be watched.
    pub fn new(path: impl AsRef<Path>, quiet: Duration) -> notify::Result<Self> {
        // Event paths are canonical; match them against a canonical target.
        let document = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let file_name = document.file_name().map(std::ffi::OsStr::to_os_string);
        let dir = parent_dir(&document);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        // The directory, not the file: editors save by rename.
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(document = %document.display(), "watching document");

        Ok(Self {
            _watcher: watcher,
            rx,
            dir,
            document,
            file_name,
            debounce: Debounce::new(quiet),
        })
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    /// Drain pending events. True once a debounced change is ready.
    pub fn take_change_ready(&mut self) -> bool {
        let now = Instant::now();
        let mut seen = 0usize;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(ev) if self.concerns_document(&ev) => {
                    seen += 1;
                    self.debounce.touch(now);
                }
                Ok(ev) => tracing::trace!(kind = ?ev.kind, paths = ?ev.paths, "ignored fs event"),
                Err(err) => tracing::warn!(%err, "file watcher error"),
            }
        }
        if seen > 0 {
            tracing::trace!(events = seen, document = %self.document.display(), "document touched");
        }
        self.debounce.fire(now)
    }

    fn concerns_document(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.dir
                || path == &self.document
                || self
                    .file_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use tempfile::tempdir;

    fn event(paths: Vec<PathBuf>) -> Event {
        Event {
            kind: EventKind::Any,
            paths,
            attrs: notify::event::EventAttributes::new(),
        }
    }

    #[test]
    fn test_debounce_waits_for_quiet_period() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(200));
        assert!(!debounce.fire(start));
        debounce.touch(start);
        assert!(!debounce.fire(start + Duration::from_millis(100)));
        debounce.touch(start + Duration::from_millis(150));
        assert!(!debounce.fire(start + Duration::from_millis(250)));
        assert!(debounce.fire(start + Duration::from_millis(350)));
        assert!(!debounce.is_pending());
        assert!(!debounce.fire(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_directory_event_concerns_document() {
        let dir = tempdir().expect("tempdir");
        let canonical = dir.path().canonicalize().expect("canonicalize");
        let path = canonical.join("note.md");
        std::fs::write(&path, "hi").expect("write");
        let watcher = FileWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        assert!(watcher.concerns_document(&event(vec![canonical.clone()])));
        assert!(watcher.concerns_document(&event(vec![canonical.join("note.md")])));
        assert!(!watcher.concerns_document(&event(vec![canonical.join("other.md")])));
    }

    #[test]
    fn test_relative_path_has_dot_parent() {
        assert_eq!(parent_dir(Path::new("note.md")), PathBuf::from("."));
    }

    #[test]
    fn test_outside_write_is_reported() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().canonicalize().expect("canonicalize").join("note.md");
        std::fs::write(&path, "# before").expect("write");
        let mut watcher = FileWatcher::new(&path, Duration::from_millis(200)).expect("watcher");

        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&path, "# after").expect("write");

        // Same cadence as the host's polling loop.
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut detected = false;
        while Instant::now() < deadline {
            if watcher.take_change_ready() {
                detected = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(250));
        }
        assert!(detected, "write by another process should be reported");
    }
}
