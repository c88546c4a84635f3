//! Messages crossing the boundary between host and surface.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// Host to surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    /// Authoritative content, line endings already normalized to `\n`.
    DocumentChanged { text: String },
    /// Top visible line of the host's view.
    ScrollChanged {
        #[serde(rename = "scrollTop")]
        scroll_top: usize,
    },
    SetSlashCommands { commands: Catalog },
}

/// Surface to host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceMessage {
    /// Ready for content; the host answers with the document and catalog.
    Initialized,
    WebviewChanged { text: String },
    PlainPaste,
    EditorInitializationError { error: String },
}

/// State kept across surface teardown and recreation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub text: String,
}
