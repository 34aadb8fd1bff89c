//! Concrete presenters for the editor's panels.
//!
//! Each presenter resolves its injected models once at construction, owns a
//! typed view struct, and replaces that view wholesale on refresh.

mod content;
mod facts;
mod preview;

pub use content::{ContentPresenter, ContentView};
pub use facts::{FactsPresenter, FactsView};
pub use preview::{PreviewPresenter, PreviewView};

/// Well-known model names registered by the application shell.
pub const SCRIPT_MODEL: &str = "script-model";
pub const CONFIG_MODEL: &str = "config-model";
pub const THEME_MODEL: &str = "theme-model";
