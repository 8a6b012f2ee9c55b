//! Editor configuration
//!
//! Tunables for the history depth and the timers that drive debounced undo
//! snapshots and auto-save. Every field has a default so a partial JSON
//! object (or an empty one) is a valid configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Capacity of each of the undo and redo stacks
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,

    /// Inactivity window after which continuous typing is snapshotted
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub auto_save: bool,

    #[serde(default = "default_auto_save_interval_ms")]
    pub auto_save_interval_ms: u64,
}

fn default_undo_limit() -> usize {
    50
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_auto_save_interval_ms() -> u64 {
    30_000
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_limit: default_undo_limit(),
            debounce_ms: default_debounce_ms(),
            auto_save: false,
            auto_save_interval_ms: default_auto_save_interval_ms(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
