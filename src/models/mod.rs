//! Models module for the ruby slide editor
//!
//! This module contains the document data model: segments, slides and the
//! manuscript that owns them, plus the merge invariant that keeps a slide's
//! segment sequence normalized.

pub mod manuscript;
pub mod segments;

// Re-export commonly used types
pub use manuscript::*;
pub use segments::*;
