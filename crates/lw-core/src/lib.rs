//! Core timing logic for lapwatch.
//!
//! This crate contains:
//! - Model: laps, runs, sessions and the history that holds them
//! - Clock engine: start/stop/reset elapsed-time counter behind a time source
//!   and a periodic tick capability
//! - Session controller: the state machine applying user actions
//! - Persistence gateway: JSON history over a key/value store

pub mod clock;
pub mod controller;
pub mod format;
pub mod model;
pub mod persist;
pub mod timer;
mod types;

pub use clock::{
    ClockEngine, ClockState, DEFAULT_SAMPLE_PERIOD_MS, SystemTimeSource, TimeSource, VirtualClock,
};
pub use controller::{
    ClockSnapshot, ControllerState, LiveState, Outcome, SessionController, Snapshot,
};
pub use format::{format_clock, format_seconds};
pub use model::{
    END_OF_RUN_LABEL, History, Lap, Run, RunKind, RunRemoval, Session, StagingBuffer,
};
pub use persist::{
    DEFAULT_HISTORY_KEY, DEFAULT_LIVE_KEY, KeyValueStore, MemoryStore, PersistenceGateway,
    StoreError,
};
pub use timer::{ManualTicker, TickToken, Ticker};
pub use types::{
    IdGenerator, LapId, RunId, SequentialIds, SessionId, UuidIds, ValidationError,
};
