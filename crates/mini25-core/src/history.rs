//! Completed focus sessions.
//!
//! The history is an insertion-ordered list persisted in full under
//! [`HISTORY_KEY`] on every mutation. Destructive operations go through a
//! [`Confirm`] collaborator before touching anything.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::storage::Storage;

pub const HISTORY_KEY: &str = "pomodoroHistory";
pub const DEFAULT_TASK_NAME: &str = "A little focus session";
/// Shown for entries that carry no task name (e.g. imported ones).
pub const UNNAMED_DISPLAY_NAME: &str = "Focus Session";
pub const EXPORT_FILE_NAME: &str = "mini25_history.json";

pub const CLEAR_PROMPT: &str =
    "Are you sure you want to clear your focus history? This can't be undone.";
pub const IMPORT_PROMPT: &str = "This will overwrite your current history. Are you sure?";

/// A yes/no question put to the user before a destructive action.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    id: String,
    #[serde(rename = "taskName", default)]
    task_name: String,
    /// Epoch milliseconds.
    #[serde(rename = "timestamp")]
    completed_at: i64,
}

impl HistoryEntry {
    pub fn new(id: impl Into<String>, task_name: impl Into<String>, completed_at: i64) -> Self {
        Self {
            id: id.into(),
            task_name: task_name.into(),
            completed_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Task name for display, falling back for unnamed entries.
    pub fn display_name(&self) -> &str {
        if self.task_name.trim().is_empty() {
            UNNAMED_DISPLAY_NAME
        } else {
            &self.task_name
        }
    }

    pub fn completed_at_ms(&self) -> i64 {
        self.completed_at
    }

    /// Completion time in `tz`. Out-of-range timestamps yield `None`.
    pub fn completed_at_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        tz.timestamp_millis_opt(self.completed_at).single()
    }
}

/// What an import did after validation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Replaced { count: usize },
    Cancelled,
}

/// Persisted history of completed focus sessions.
#[derive(Debug)]
pub struct HistoryStore {
    storage: Storage,
    entries: Vec<HistoryEntry>,
    default_task_name: String,
}

impl HistoryStore {
    /// Load the collection from `storage`; a missing key is an empty history.
    pub fn load(storage: Storage) -> Self {
        let entries = storage.get(HISTORY_KEY, Vec::new());
        Self {
            storage,
            entries,
            default_task_name: DEFAULT_TASK_NAME.to_string(),
        }
    }

    /// Label recorded when a session is completed without a task name.
    pub fn with_default_task_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.default_task_name = name;
        }
        self
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Newest first.
    pub fn recent(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a completed focus session now.
    pub fn append(&mut self, task_name: &str) -> &HistoryEntry {
        self.append_at(task_name, Utc::now())
    }

    /// Re-read the collection from storage, picking up changes made by other
    /// processes sharing the same store. An unreadable value keeps what is
    /// already loaded.
    pub fn refresh(&mut self) {
        let current = std::mem::take(&mut self.entries);
        self.entries = self.storage.get(HISTORY_KEY, current);
    }

    pub fn append_at(&mut self, task_name: &str, completed_at: DateTime<Utc>) -> &HistoryEntry {
        self.refresh();
        let trimmed = task_name.trim();
        let task_name = if trimmed.is_empty() {
            self.default_task_name.clone()
        } else {
            trimmed.to_string()
        };
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            task_name,
            completed_at: completed_at.timestamp_millis(),
        };
        tracing::debug!(id = %entry.id, task = %entry.task_name, "history entry appended");
        self.entries.push(entry);
        self.persist();
        &self.entries[self.entries.len() - 1]
    }

    /// Empty the history after confirmation. Returns whether it was cleared.
    pub fn clear(&mut self, confirm: &mut impl Confirm) -> bool {
        if !confirm.confirm(CLEAR_PROMPT) {
            return false;
        }
        self.entries.clear();
        self.persist();
        tracing::info!("history cleared");
        true
    }

    /// Pretty-printed JSON of the whole collection.
    ///
    /// # Errors
    /// [`CoreError::EmptyExport`] when there is nothing to export.
    pub fn export_all(&self) -> Result<String> {
        if self.entries.is_empty() {
            return Err(CoreError::EmptyExport);
        }
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Write the export to `dir/mini25_history.json` and return its path.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let text = self.export_all()?;
        let path = dir.join(EXPORT_FILE_NAME);
        std::fs::write(&path, text)?;
        tracing::info!(path = %path.display(), entries = self.entries.len(), "history exported");
        Ok(path)
    }

    /// Replace the whole collection with the entries in `text`.
    ///
    /// Validation happens before the user is asked anything; a malformed file
    /// leaves the history untouched.
    ///
    /// # Errors
    /// [`CoreError::MalformedImport`] when `text` is not a JSON array of
    /// entries that each carry an `id` and a `timestamp`.
    pub fn import_all(&mut self, text: &str, confirm: &mut impl Confirm) -> Result<ImportOutcome> {
        let entries = parse_import(text)?;
        if !confirm.confirm(IMPORT_PROMPT) {
            return Ok(ImportOutcome::Cancelled);
        }
        let count = entries.len();
        self.entries = entries;
        self.persist();
        tracing::info!(entries = count, "history imported");
        Ok(ImportOutcome::Replaced { count })
    }

    fn persist(&mut self) {
        self.storage.set(HISTORY_KEY, &self.entries);
    }
}

/// Parse and validate an exported history file.
pub fn parse_import(text: &str) -> Result<Vec<HistoryEntry>> {
    let malformed = |reason: String| CoreError::MalformedImport { reason };

    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        tracing::warn!(error = %e, "import is not valid JSON");
        malformed(e.to_string())
    })?;
    let items = value
        .as_array()
        .ok_or_else(|| malformed("expected a JSON array of sessions".into()))?;
    for (index, item) in items.iter().enumerate() {
        let has_fields = item
            .as_object()
            .is_some_and(|obj| obj.contains_key("id") && obj.contains_key("timestamp"));
        if !has_fields {
            return Err(malformed(format!(
                "entry {index} is missing an `id` or `timestamp`"
            )));
        }
    }
    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, SqliteStore};

    fn yes() -> impl FnMut(&str) -> bool {
        |_: &str| true
    }

    fn no() -> impl FnMut(&str) -> bool {
        |_: &str| false
    }

    fn store() -> HistoryStore {
        HistoryStore::load(Storage::with_backend(MemoryStore::new()))
    }

    #[test]
    fn empty_name_gets_default_label() {
        let mut history = store();
        assert_eq!(history.append("").task_name(), DEFAULT_TASK_NAME);
        assert_eq!(history.append("   ").task_name(), DEFAULT_TASK_NAME);
        assert_eq!(history.append("  Write report ").task_name(), "Write report");
    }

    #[test]
    fn custom_default_label() {
        let mut history = store().with_default_task_name("Pomodoro");
        assert_eq!(history.append("").task_name(), "Pomodoro");
    }

    #[test]
    fn append_keeps_insertion_order_and_unique_ids() {
        let mut history = store();
        history.append("a");
        history.append("b");
        history.append("c");
        let names: Vec<_> = history.entries().iter().map(|e| e.task_name()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        let recent: Vec<_> = history.recent().map(|e| e.task_name()).collect();
        assert_eq!(recent, ["c", "b", "a"]);

        let mut ids: Vec<_> = history.entries().iter().map(|e| e.id().to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn every_mutation_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        {
            let mut history = HistoryStore::load(Storage::with_backend(SqliteStore::open(&path).unwrap()));
            assert!(history.is_empty());
            history.append("persisted");
        }
        let history = HistoryStore::load(Storage::with_backend(SqliteStore::open(&path).unwrap()));
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].task_name(), "persisted");
    }

    #[test]
    fn clear_requires_confirmation() {
        let mut history = store();
        history.append("keep me");

        let mut asked = Vec::new();
        let cleared = history.clear(&mut |prompt: &str| {
            asked.push(prompt.to_string());
            false
        });
        assert!(!cleared);
        assert_eq!(asked, [CLEAR_PROMPT]);
        assert_eq!(history.len(), 1);

        assert!(history.clear(&mut yes()));
        assert!(history.is_empty());
    }

    #[test]
    fn export_empty_is_an_error() {
        let history = store();
        assert!(matches!(history.export_all(), Err(CoreError::EmptyExport)));

        let dir = tempfile::tempdir().unwrap();
        assert!(history.export_to(dir.path()).is_err());
        assert!(!dir.path().join(EXPORT_FILE_NAME).exists());
    }

    #[test]
    fn export_then_import_roundtrips() {
        let mut history = store();
        history.append("one");
        history.append("");
        let original = history.entries().to_vec();
        let text = history.export_all().unwrap();
        assert!(text.contains("\"taskName\""));
        assert!(text.contains("\"timestamp\""));

        let mut other = store();
        other.append("will be replaced");
        let outcome = other.import_all(&text, &mut yes()).unwrap();
        assert_eq!(outcome, ImportOutcome::Replaced { count: 2 });
        assert_eq!(other.entries(), original.as_slice());
    }

    #[test]
    fn export_to_writes_named_file() {
        let mut history = store();
        history.append("file me");
        let dir = tempfile::tempdir().unwrap();
        let path = history.export_to(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), EXPORT_FILE_NAME);
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(parse_import(&written).unwrap(), history.entries());
    }

    #[test]
    fn import_not_json_leaves_history_untouched() {
        let mut history = store();
        history.append("precious");
        let before = history.entries().to_vec();

        let mut asked = false;
        let result = history.import_all("not json", &mut |_: &str| {
            asked = true;
            true
        });
        assert!(matches!(result, Err(CoreError::MalformedImport { .. })));
        assert!(!asked, "user must not be prompted for a malformed file");
        assert_eq!(history.entries(), before.as_slice());
    }

    #[test]
    fn import_schema_mismatch_is_rejected() {
        let mut history = store();
        for text in [
            r#"{"id": "x", "timestamp": 1}"#,
            r#"[{"id": "x"}]"#,
            r#"[{"timestamp": 1}]"#,
            r#"[1, 2]"#,
            r#"[{"id": 5, "timestamp": 1}]"#,
        ] {
            let result = history.import_all(text, &mut yes());
            assert!(
                matches!(result, Err(CoreError::MalformedImport { .. })),
                "accepted {text}"
            );
        }
        assert!(history.is_empty());
    }

    #[test]
    fn import_without_task_name_displays_fallback() {
        let mut history = store();
        history
            .import_all(r#"[{"id": "a", "timestamp": 1700000000000}]"#, &mut yes())
            .unwrap();
        let entry = &history.entries()[0];
        assert_eq!(entry.task_name(), "");
        assert_eq!(entry.display_name(), UNNAMED_DISPLAY_NAME);
        assert_eq!(entry.completed_at_ms(), 1_700_000_000_000);
    }

    #[test]
    fn declined_import_keeps_history() {
        let mut history = store();
        history.append("mine");
        let outcome = history
            .import_all(r#"[{"id": "a", "taskName": "theirs", "timestamp": 1}]"#, &mut no())
            .unwrap();
        assert_eq!(outcome, ImportOutcome::Cancelled);
        assert_eq!(history.entries()[0].task_name(), "mine");
    }

    #[test]
    fn empty_array_import_clears() {
        let mut history = store();
        history.append("gone soon");
        let outcome = history.import_all("[]", &mut yes()).unwrap();
        assert_eq!(outcome, ImportOutcome::Replaced { count: 0 });
        assert!(history.is_empty());
    }
}
