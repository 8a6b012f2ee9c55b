//! Editing session: surface events in, document mutations out

pub mod controller;
pub mod timers;

pub use controller::{
    CompositionState, EventOutcome, InputController, InputEvent, SegmentSelection, SyncOutcome,
};
pub use timers::{AutoSaveTimer, DebounceTimer};
