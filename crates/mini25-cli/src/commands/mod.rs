pub mod config;
pub mod dashboard;
pub mod focus;
pub mod history;
pub mod tracks;

use mini25_core::{Config, HistoryStore, Storage};

/// History backed by the on-disk store, labelled per config.
pub(crate) fn open_history(config: &Config) -> HistoryStore {
    HistoryStore::load(Storage::open_default()).with_default_task_name(&config.history.default_task_name)
}
