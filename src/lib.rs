// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. catalog::CatalogError)
    clippy::module_name_repetitions
)]

//! # Narkdown
//!
//! Slash commands for markdown editing, with a plain-text document kept in
//! step with a structured editing surface.
//!
//! Typing `/` followed by a word offers matching commands from a catalog.
//! Picking one replaces the trigger with a heading, list, table, emphasis
//! or other markup. Two editing modes are supported:
//!
//! - **Plain**: the document is edited as text; a trigger expands when a
//!   space is typed after it.
//! - **Structured**: a block/run document model with a command menu, kept
//!   in sync with the external document over a two-way message channel.
//!
//! ## Modules
//!
//! - [`catalog`]: Command catalog and cursor placement rules
//! - [`document`]: Structured document model and markdown mapping
//! - [`surface`]: Structured editing engine and its actions
//! - [`scanner`]: Trigger detection at the cursor
//! - [`menu`]: Command menu state machine
//! - [`apply`]: Applying a command to the structured surface
//! - [`editor`]: Plain-text editing mode
//! - [`sync`]: Host/surface synchronization
//! - [`watcher`]: File watching
//! - [`config`]: Saved defaults

pub mod apply;
pub mod catalog;
pub mod config;
pub mod document;
pub mod editor;
pub mod menu;
pub mod scanner;
pub mod surface;
pub mod sync;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{Catalog, Command};
    pub use crate::editor::PlainEditor;
    pub use crate::menu::CommandMenu;
    pub use crate::surface::{Surface, SurfaceOptions};
    pub use crate::sync::{HostMessage, HostSide, SurfaceMessage, SurfaceSession};
}
