//! Ruby slide editor WASM API
//!
//! The JavaScript-facing surface of the crate.
//!
//! # Module Structure
//!
//! - `helpers`: Shared utilities for serialization, validation, error handling, and logging
//! - `editor`: The `SlideEditor` handle (document, input controller, timers)

pub mod helpers;
pub mod editor;

pub use editor::SlideEditor;
