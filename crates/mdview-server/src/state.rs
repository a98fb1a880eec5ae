//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;

use crate::live_reload::ReloadHub;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Markdown file being served.
    pub(crate) file_path: PathBuf,
    /// Base name of the served file, used as the page title.
    pub(crate) file_name: String,
    /// Port the server bound, embedded in the reload script.
    pub(crate) port: u16,
    /// Viewer session registry.
    pub(crate) hub: ReloadHub,
}
