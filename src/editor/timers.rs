//! Millisecond timers driven by the host's clock
//!
//! The core never reads a clock or sleeps. The host passes `now_ms` with
//! every event and calls `poll` from its own timer callback, so scheduling
//! stays single-threaded and deterministic under test.

use crate::config::EditorConfig;
use crate::document::DocumentContext;

/// Fires once, `delay_ms` after the most recent `schedule`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceTimer {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl DebounceTimer {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms, deadline: None }
    }

    /// Start or extend the timer
    pub fn schedule(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.delay_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// True exactly once when the deadline has passed
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Periodic auto-save trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveTimer {
    enabled: bool,
    interval_ms: u64,
    next_due: Option<u64>,
}

impl AutoSaveTimer {
    pub fn new(enabled: bool, interval_ms: u64) -> Self {
        Self {
            enabled,
            interval_ms: interval_ms.max(1),
            next_due: None,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.auto_save, config.auto_save_interval_ms)
    }

    pub fn start(&mut self, now_ms: u64) {
        self.next_due = Some(now_ms.saturating_add(self.interval_ms));
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// True when an interval has elapsed; re-arms for the next one
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.next_due {
            Some(due) if now_ms >= due => {
                self.next_due = Some(now_ms.saturating_add(self.interval_ms));
                true
            }
            _ => false,
        }
    }

    /// Auto-save only writes a dirty document that already has a file
    pub fn should_save(&self, ctx: &DocumentContext) -> bool {
        self.enabled && ctx.is_dirty() && ctx.file_path().is_some()
    }

    /// Poll and check in one step: true when the host should save now
    pub fn due(&mut self, now_ms: u64, ctx: &DocumentContext) -> bool {
        self.poll(now_ms) && self.should_save(ctx)
    }
}
