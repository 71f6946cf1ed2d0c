//! Expand/collapse state of the sidebar groups.

use std::collections::BTreeSet;

use crate::catalog::{Catalog, GroupKey};
use crate::filter::FilterQuery;

/// How many groups may be open at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisclosureMode {
  /// Opening a group closes every other one.
  Single,
  #[default]
  Multiple,
}

impl DisclosureMode {
  pub fn label(self) -> &'static str {
    match self {
      DisclosureMode::Single => "single",
      DisclosureMode::Multiple => "multiple",
    }
  }

  pub fn from_config(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "single" => DisclosureMode::Single,
      _ => DisclosureMode::Multiple,
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      DisclosureMode::Single => DisclosureMode::Multiple,
      DisclosureMode::Multiple => DisclosureMode::Single,
    }
  }
}

/// Set of open group keys. In single mode at most one key is ever open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureState {
  mode: DisclosureMode,
  open: BTreeSet<GroupKey>,
}

impl DisclosureState {
  pub fn new(mode: DisclosureMode) -> Self {
    Self { mode, open: BTreeSet::new() }
  }

  /// State shown right after `query` produced `result`.
  ///
  /// A search expands every matching group (only the first in single mode);
  /// with no search only the first group is expanded.
  pub fn default_open(result: &Catalog, query: &FilterQuery, mode: DisclosureMode) -> Self {
    let mut state = Self::new(mode);
    match (query.is_empty(), mode) {
      (false, DisclosureMode::Multiple) => state.open.extend(0..result.groups.len()),
      _ if result.is_empty() => {}
      _ => {
        state.open.insert(0);
      }
    }
    state
  }

  /// Recompute from `default_open`, dropping manual toggles. Called on every query change.
  pub fn reset(&mut self, result: &Catalog, query: &FilterQuery) {
    *self = Self::default_open(result, query, self.mode);
  }

  pub fn mode(&self) -> DisclosureMode {
    self.mode
  }

  /// Switch modes. Entering single mode keeps only the lowest open key.
  pub fn set_mode(&mut self, mode: DisclosureMode) {
    self.mode = mode;
    if mode == DisclosureMode::Single
      && let Some(&first) = self.open.first()
    {
      self.open = BTreeSet::from([first]);
    }
  }

  pub fn toggle(&mut self, key: GroupKey) {
    if self.open.remove(&key) {
      return;
    }
    if self.mode == DisclosureMode::Single {
      self.open.clear();
    }
    self.open.insert(key);
  }

  /// Open `key` without closing it when it already is.
  pub fn reveal(&mut self, key: GroupKey) {
    if !self.is_open(key) {
      self.toggle(key);
    }
  }

  pub fn is_open(&self, key: GroupKey) -> bool {
    self.open.contains(&key)
  }

  pub fn open_keys(&self) -> impl Iterator<Item = GroupKey> + '_ {
    self.open.iter().copied()
  }
}
