//! Ruby Slide Editor WASM Module
//!
//! Core of a slide editor whose content is plain text interleaved with ruby
//! annotations. The document model, undo history and the synchronization
//! between an editable surface and the model are headless and natively
//! testable; `api` wraps them for a browser host.

pub mod config;
pub mod models;
pub mod undo;
pub mod surface;
pub mod editor;
pub mod document;
pub mod persistence;
pub mod api;

// Re-export commonly used types
pub use config::{ConfigError, EditorConfig};
pub use document::{DocumentContext, DocumentError, DocumentEvent, SubscriptionId};
pub use models::{merge_adjacent_text, Manuscript, Segment, SegmentKind, Slide};
pub use persistence::PersistError;
pub use surface::{EditableSurface, HeadlessSurface, MarkupError};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    // Fails only when a logger is already installed
    #[cfg(feature = "console_log")]
    let _ = console_log::init_with_level(log::Level::Debug);

    log::info!("Ruby slide editor WASM module initialized");
}
