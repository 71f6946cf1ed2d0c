//! Durable per-video progress ledger.
//!
//! The whole table is written through to a [`ProgressStorage`] backend on
//! every mutation and read back once at startup. Storage failures never abort
//! the mutation that triggered them: the in-memory table stays authoritative
//! and the next mutation writes everything again.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::ItemId;
use crate::constants::constants;
use crate::error::{ProgressError, StorageError};

/// Watch state of a single video.
///
/// `completed` is only ever true while `watched_at` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
  /// Epoch milliseconds of the last visit.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub watched_at: Option<i64>,
  #[serde(default)]
  pub completed: bool,
  /// Playback position in seconds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_position: Option<f64>,
}

pub type ProgressTable = BTreeMap<ItemId, ProgressRecord>;

/// Aggregate progress over one group's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupProgress {
  pub total: usize,
  pub watched: usize,
  pub completed: usize,
  /// Completed share, rounded to a whole percent.
  pub percentage: u8,
}

impl GroupProgress {
  /// Watched but not yet completed.
  pub fn in_progress(&self) -> usize {
    self.watched.saturating_sub(self.completed)
  }
}

// --- Storage backends ---

/// Durable key-value slot holding the serialized table.
pub trait ProgressStorage {
  /// Read the table. A missing record is an empty table, not an error.
  fn load(&self) -> Result<ProgressTable, StorageError>;
  fn save(&mut self, table: &ProgressTable) -> Result<(), StorageError>;
}

/// One JSON file per namespace, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
  path: PathBuf,
}

impl JsonFileStorage {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// `<data_dir>/<namespace>.json` in the platform data directory.
  pub fn in_data_dir() -> Result<Self, StorageError> {
    let dirs = ProjectDirs::from("", "", &constants().app_name).ok_or(StorageError::NoDataDir)?;
    Ok(Self::new(dirs.data_dir().join(format!("{}.json", constants().progress_namespace))))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl ProgressStorage for JsonFileStorage {
  fn load(&self) -> Result<ProgressTable, StorageError> {
    match std::fs::read_to_string(&self.path) {
      Ok(content) => Ok(serde_json::from_str(&content)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProgressTable::new()),
      Err(e) => Err(e.into()),
    }
  }

  fn save(&mut self, table: &ProgressTable) -> Result<(), StorageError> {
    if let Some(dir) = self.path.parent() {
      std::fs::create_dir_all(dir)?;
    }
    let content = serde_json::to_string(table)?;
    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

/// Keeps the serialized table in memory. Backs `--ephemeral` sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
  contents: Option<String>,
}

impl MemoryStorage {
  #[cfg(test)]
  pub fn with_contents(json: impl Into<String>) -> Self {
    Self { contents: Some(json.into()) }
  }

  #[cfg(test)]
  pub fn contents(&self) -> Option<&str> {
    self.contents.as_deref()
  }
}

impl ProgressStorage for MemoryStorage {
  fn load(&self) -> Result<ProgressTable, StorageError> {
    match &self.contents {
      Some(json) => Ok(serde_json::from_str(json)?),
      None => Ok(ProgressTable::new()),
    }
  }

  fn save(&mut self, table: &ProgressTable) -> Result<(), StorageError> {
    self.contents = Some(serde_json::to_string(table)?);
    Ok(())
  }
}

impl<T: ProgressStorage + ?Sized> ProgressStorage for Box<T> {
  fn load(&self) -> Result<ProgressTable, StorageError> {
    (**self).load()
  }

  fn save(&mut self, table: &ProgressTable) -> Result<(), StorageError> {
    (**self).save(table)
  }
}

// --- Clock ---

pub trait Clock {
  fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_ms(&self) -> i64 {
    chrono::Utc::now().timestamp_millis()
  }
}

// --- Store ---

pub struct ProgressStore<S, C = SystemClock> {
  table: ProgressTable,
  storage: S,
  clock: C,
  /// Message of the last failed write, cleared by the next successful one.
  pending_error: Option<String>,
}

impl<S: ProgressStorage> ProgressStore<S, SystemClock> {
  pub fn open(storage: S) -> Self {
    Self::with_clock(storage, SystemClock)
  }
}

impl<S: ProgressStorage, C: Clock> ProgressStore<S, C> {
  /// Load the table from `storage`. Unreadable data yields an empty table.
  pub fn with_clock(storage: S, clock: C) -> Self {
    let mut table = match storage.load() {
      Ok(table) => table,
      Err(e) => {
        warn!(err = %e, "progress: stored ledger unreadable, starting empty");
        ProgressTable::new()
      }
    };
    for (id, record) in table.iter_mut() {
      if record.completed && record.watched_at.is_none() {
        debug!(id = %id, "progress: clearing completed flag without a visit timestamp");
        record.completed = false;
      }
    }
    info!(records = table.len(), "progress: ledger loaded");
    Self { table, storage, clock, pending_error: None }
  }

  /// Fresh visit: stamps `watched_at` and always clears `completed`.
  pub fn record_visit(&mut self, id: &str) {
    let now = self.clock.now_ms();
    let record = self.table.entry(id.to_string()).or_default();
    record.watched_at = Some(now);
    record.completed = false;
    self.persist();
  }

  pub fn mark_completed(&mut self, id: &str, completed: bool) {
    let now = self.clock.now_ms();
    let record = self.table.entry(id.to_string()).or_default();
    record.completed = completed;
    record.watched_at.get_or_insert(now);
    self.persist();
  }

  /// Store the playback position in seconds. Touching a position counts as watching.
  pub fn update_position(&mut self, id: &str, position: f64) -> Result<(), ProgressError> {
    if !position.is_finite() || position < 0.0 {
      return Err(ProgressError::InvalidPosition(position, id.to_string()));
    }
    let now = self.clock.now_ms();
    let record = self.table.entry(id.to_string()).or_default();
    record.last_position = Some(position);
    record.watched_at.get_or_insert(now);
    self.persist();
    Ok(())
  }

  pub fn is_watched(&self, id: &str) -> bool {
    self.table.get(id).is_some_and(|r| r.watched_at.is_some())
  }

  pub fn is_completed(&self, id: &str) -> bool {
    self.table.get(id).is_some_and(|r| r.completed)
  }

  pub fn record(&self, id: &str) -> Option<&ProgressRecord> {
    self.table.get(id)
  }

  pub fn last_position(&self, id: &str) -> Option<f64> {
    self.table.get(id).and_then(|r| r.last_position)
  }

  pub fn group_progress<'a>(&self, items: impl IntoIterator<Item = &'a ItemId>) -> GroupProgress {
    let mut progress = GroupProgress::default();
    for id in items {
      progress.total += 1;
      progress.watched += usize::from(self.is_watched(id));
      progress.completed += usize::from(self.is_completed(id));
    }
    if progress.total > 0 {
      progress.percentage = ((progress.completed as f64 / progress.total as f64) * 100.0).round() as u8;
    }
    progress
  }

  pub fn pending_error(&self) -> Option<&str> {
    self.pending_error.as_deref()
  }

  #[cfg(test)]
  pub fn storage(&self) -> &S {
    &self.storage
  }

  fn persist(&mut self) {
    match self.storage.save(&self.table) {
      Ok(()) => {
        if self.pending_error.take().is_some() {
          info!("progress: write recovered");
        }
        debug!(records = self.table.len(), "progress: ledger written");
      }
      Err(e) => {
        warn!(err = %e, "progress: write failed, will retry on next change");
        self.pending_error = Some(e.to_string());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;
  use std::cell::Cell;
  use std::rc::Rc;

  #[derive(Clone, Default)]
  struct TestClock(Rc<Cell<i64>>);

  impl TestClock {
    fn at(ms: i64) -> Self {
      Self(Rc::new(Cell::new(ms)))
    }

    fn set(&self, ms: i64) {
      self.0.set(ms);
    }
  }

  impl Clock for TestClock {
    fn now_ms(&self) -> i64 {
      self.0.get()
    }
  }

  /// Memory backend whose writes can be made to fail.
  #[derive(Default)]
  struct FlakyStorage {
    inner: MemoryStorage,
    failing: Rc<Cell<bool>>,
    attempts: usize,
  }

  impl ProgressStorage for FlakyStorage {
    fn load(&self) -> Result<ProgressTable, StorageError> {
      self.inner.load()
    }

    fn save(&mut self, table: &ProgressTable) -> Result<(), StorageError> {
      self.attempts += 1;
      if self.failing.get() {
        return Err(std::io::Error::other("disk full").into());
      }
      self.inner.save(table)
    }
  }

  fn store() -> (ProgressStore<MemoryStorage, TestClock>, TestClock) {
    let clock = TestClock::at(1_000);
    (ProgressStore::with_clock(MemoryStorage::default(), clock.clone()), clock)
  }

  #[test]
  fn unknown_item_is_neither_watched_nor_completed() {
    let (store, _) = store();
    assert!(!store.is_watched("A"));
    assert!(!store.is_completed("A"));
    assert_eq!(store.record("A"), None);
  }

  #[test]
  fn record_visit_stamps_and_clears_completion() {
    let (mut store, clock) = store();
    store.mark_completed("A", true);
    assert!(store.is_completed("A"));

    clock.set(2_000);
    store.record_visit("A");
    assert!(store.is_watched("A"));
    assert!(!store.is_completed("A"));
    assert_eq!(store.record("A").unwrap().watched_at, Some(2_000));
  }

  #[test]
  fn record_visit_keeps_last_position() {
    let (mut store, _) = store();
    store.update_position("A", 42.5).unwrap();
    store.record_visit("A");
    assert_eq!(store.last_position("A"), Some(42.5));
  }

  #[test]
  fn mark_completed_keeps_existing_timestamp() {
    let (mut store, clock) = store();
    store.record_visit("A");
    clock.set(5_000);
    store.mark_completed("A", true);
    assert_eq!(store.record("A").unwrap().watched_at, Some(1_000));
    assert!(store.is_completed("A"));
  }

  #[test]
  fn mark_completed_on_fresh_item_stamps_now() {
    let (mut store, _) = store();
    store.mark_completed("B", true);
    assert_eq!(store.record("B").unwrap().watched_at, Some(1_000));
    store.mark_completed("C", false);
    assert!(store.is_watched("C"));
    assert!(!store.is_completed("C"));
  }

  #[test]
  fn update_position_establishes_watched() {
    let (mut store, clock) = store();
    store.update_position("A", 10.0).unwrap();
    assert!(store.is_watched("A"));
    clock.set(9_000);
    store.update_position("A", 20.0).unwrap();
    let record = store.record("A").unwrap();
    assert_eq!(record.watched_at, Some(1_000));
    assert_eq!(record.last_position, Some(20.0));
  }

  #[test]
  fn update_position_rejects_invalid_values() {
    let (mut store, _) = store();
    assert_eq!(store.update_position("A", -1.0), Err(ProgressError::InvalidPosition(-1.0, "A".into())));
    assert!(store.update_position("A", f64::NAN).is_err());
    assert!(store.update_position("A", f64::INFINITY).is_err());
    assert_eq!(store.record("A"), None);
    assert_eq!(store.storage().contents(), None);
  }

  #[test]
  fn every_mutation_is_written_through() {
    let (mut store, _) = store();
    store.record_visit("A");
    let json = store.storage().contents().unwrap();
    assert_eq!(json, r#"{"A":{"watchedAt":1000,"completed":false}}"#);

    store.update_position("A", 3.5).unwrap();
    let json = store.storage().contents().unwrap();
    assert_eq!(json, r#"{"A":{"watchedAt":1000,"completed":false,"lastPosition":3.5}}"#);
  }

  #[test]
  fn reload_restores_table() {
    let (mut store, _) = store();
    store.record_visit("A");
    store.mark_completed("B", true);
    let saved = store.storage().clone();

    let reloaded = ProgressStore::with_clock(saved, TestClock::at(0));
    assert!(reloaded.is_watched("A"));
    assert!(reloaded.is_completed("B"));
  }

  #[test]
  fn corrupt_data_loads_as_empty_table() {
    let store = ProgressStore::with_clock(MemoryStorage::with_contents("{\"A\": nope"), TestClock::at(0));
    assert_eq!(store.record("A"), None);
    assert_eq!(store.pending_error(), None);
  }

  #[test]
  fn load_accepts_sparse_records_and_repairs_invariant() {
    let json = r#"{"A":{"completed":true},"B":{"watchedAt":7,"completed":true},"C":{"lastPosition":4}}"#;
    let store = ProgressStore::with_clock(MemoryStorage::with_contents(json), TestClock::at(0));
    assert!(!store.is_completed("A"));
    assert!(!store.is_watched("A"));
    assert!(store.is_completed("B"));
    assert_eq!(store.last_position("C"), Some(4.0));
    assert!(!store.is_watched("C"));
  }

  #[test]
  fn failed_write_keeps_memory_and_retries() {
    let failing = Rc::new(Cell::new(true));
    let storage = FlakyStorage { failing: Rc::clone(&failing), ..Default::default() };
    let mut store = ProgressStore::with_clock(storage, TestClock::at(1));

    store.record_visit("A");
    assert!(store.is_watched("A"));
    assert!(store.pending_error().unwrap().contains("disk full"));
    assert_eq!(store.storage().inner.contents(), None);

    failing.set(false);
    store.record_visit("B");
    assert_eq!(store.pending_error(), None);
    assert_eq!(store.storage().attempts, 2);
    let saved = store.storage().inner.load().unwrap();
    assert!(saved.contains_key("A") && saved.contains_key("B"));
  }

  #[test]
  fn group_progress_counts_and_rounds() {
    let (mut store, _) = store();
    let items: Vec<ItemId> = ["A", "B", "C"].map(String::from).to_vec();
    store.record_visit("A");
    store.mark_completed("B", true);
    let progress = store.group_progress(&items);
    assert_eq!(progress, GroupProgress { total: 3, watched: 2, completed: 1, percentage: 33 });
    assert_eq!(progress.in_progress(), 1);

    store.mark_completed("C", true);
    assert_eq!(store.group_progress(&items).percentage, 67);
    assert_eq!(store.group_progress(&[]).percentage, 0);
  }

  #[test]
  fn json_file_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("video-progress-storage.json");
    let mut storage = JsonFileStorage::new(&path);
    assert!(storage.load().unwrap().is_empty());

    let mut table = ProgressTable::new();
    table.insert("A".into(), ProgressRecord { watched_at: Some(5), completed: true, last_position: Some(1.5) });
    storage.save(&table).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());
    assert_eq!(JsonFileStorage::new(&path).load().unwrap(), table);
  }

  #[test]
  fn json_file_storage_reports_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");
    std::fs::write(&path, "[1, 2").unwrap();
    assert!(matches!(JsonFileStorage::new(&path).load(), Err(StorageError::Serialize(_))));
    let store = ProgressStore::with_clock(JsonFileStorage::new(&path), TestClock::at(0));
    assert!(!store.is_watched("A"));
  }

  #[derive(Debug, Clone)]
  enum Op {
    Visit(u8),
    Complete(u8, bool),
    Position(u8, f64),
  }

  fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
      (0u8..4).prop_map(Op::Visit),
      (0u8..4, any::<bool>()).prop_map(|(i, c)| Op::Complete(i, c)),
      (0u8..4, 0.0f64..600.0).prop_map(|(i, p)| Op::Position(i, p)),
    ]
  }

  proptest! {
    #[test]
    fn completed_implies_watched(ops in prop::collection::vec(arb_op(), 0..40)) {
      let (mut store, _) = store();
      for op in ops {
        let id = match &op {
          Op::Visit(i) | Op::Complete(i, _) | Op::Position(i, _) => format!("v{i}"),
        };
        match op {
          Op::Visit(_) => {
            store.record_visit(&id);
            prop_assert!(store.is_watched(&id));
            prop_assert!(!store.is_completed(&id));
          }
          Op::Complete(_, c) => store.mark_completed(&id, c),
          Op::Position(_, p) => store.update_position(&id, p).unwrap(),
        }
        for i in 0..4 {
          let id = format!("v{i}");
          prop_assert!(!store.is_completed(&id) || store.is_watched(&id));
        }
      }
    }
  }
}
