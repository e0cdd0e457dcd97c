//! # Mini25 Core Library
//!
//! Business logic for the Mini25 focus timer: a Pomodoro countdown, an
//! ambient music player, and a local history log with a progress dashboard.
//! The `mini25` CLI is a thin shell over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a pure countdown state machine; the caller drives it
//!   with one `tick()` per second, usually from a [`Ticker`]
//! - **Storage**: JSON values in a SQLite key-value table with in-memory
//!   fallback, and TOML configuration
//! - **History**: completed focus sessions, with export/import
//! - **Dashboard**: today/week counts and a 7-day histogram
//! - **Player**: track/volume/playing intent reconciled onto an audio backend
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Shell`]: Wires timer completions into history and side effects
//! - [`HistoryStore`]: Persisted session log
//! - [`Storage`]: Key-value storage adapter
//! - [`Config`]: Application configuration management

pub mod dashboard;
pub mod error;
pub mod events;
pub mod history;
pub mod player;
pub mod shell;
pub mod storage;
pub mod timer;

pub use dashboard::{summarize, summarize_local, BarChart, DayBucket, HistogramRenderer, Summary};
pub use error::{ConfigError, CoreError, PlaybackError, StorageError};
pub use events::{Event, EventBus};
pub use history::{Confirm, HistoryEntry, HistoryStore, ImportOutcome};
pub use player::{AudioBackend, LofiTrack, Player, TrackId, CATALOG};
pub use shell::{Effects, NoEffects, Shell, Tab, TimerCommand};
pub use storage::{Config, Storage};
pub use timer::{format_clock, Durations, Ticker, TimerEngine, TimerMode};
