//! Keeping the external plain-text document and the structured surface in
//! step.
//!
//! The host side owns the document of record and the surface side owns a
//! working copy. They talk only through [`HostMessage`] and
//! [`SurfaceMessage`]; content pushed by the host is marked with the echo
//! token so the surface's reaction to it is never sent back.

mod channel;
mod echo;
mod eol;
mod host;
mod protocol;
mod view;

pub use channel::{
    Control, HostCommand, HostEnds, HostView, SessionHandle, SurfaceEnds, WATCH_POLL, channels,
    run_host, run_surface,
};
pub use echo::{EchoGuard, EchoSuppressor};
pub use eol::{LineEnding, normalize, to_line_ending};
pub use host::{ExternalDocument, HostShell, HostSide, WATCH_DEBOUNCE};
pub use protocol::{HostMessage, PersistedState, SurfaceMessage};
pub use view::{InputEvent, MemoryStateStore, StateStore, SurfaceSession, SurfaceView};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0} side of the session has stopped")]
    ChannelClosed(&'static str),
    #[error("failed to access {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to watch document")]
    Watch(#[from] notify::Error),
}
