//! Selection and linear navigation across the whole catalog.

use tracing::{debug, info};

use crate::catalog::{Catalog, ItemId};
use crate::error::NavError;
use crate::linear::LinearIndex;
use crate::progress::{Clock, ProgressStorage, ProgressStore, SystemClock};

/// Active item and whether the viewer should start playing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
  pub current_item_id: ItemId,
  /// False until the user explicitly selects or navigates.
  pub autoplay: bool,
}

impl SelectionState {
  pub fn new(current_item_id: impl Into<ItemId>) -> Self {
    Self { current_item_id: current_item_id.into(), autoplay: false }
  }
}

/// Owns the traversal order, the selection and the progress ledger.
///
/// Every successful selection records a visit. Boundaries and unknown
/// current items make navigation a no-op that returns `false`.
pub struct NavigationController<S, C = SystemClock> {
  index: LinearIndex,
  selection: SelectionState,
  progress: ProgressStore<S, C>,
}

impl<S: ProgressStorage, C: Clock> NavigationController<S, C> {
  pub fn new(catalog: &Catalog, initial: impl Into<ItemId>, progress: ProgressStore<S, C>) -> Self {
    Self { index: LinearIndex::new(catalog), selection: SelectionState::new(initial), progress }
  }

  pub fn select(&mut self, id: &str) -> Result<(), NavError> {
    if self.index.locate(id).is_none() {
      debug!(id = %id, "nav: rejected selection of unknown item");
      return Err(NavError::InvalidItem(id.to_string()));
    }
    info!(id = %id, "nav: selected");
    self.selection.current_item_id = id.to_string();
    self.selection.autoplay = true;
    self.progress.record_visit(id);
    Ok(())
  }

  pub fn next(&mut self) -> bool {
    match self.current_index() {
      Some(i) if i + 1 < self.index.len() => self.select_index(i + 1),
      _ => false,
    }
  }

  pub fn previous(&mut self) -> bool {
    match self.current_index() {
      Some(i) if i > 0 => self.select_index(i - 1),
      _ => false,
    }
  }

  pub fn first(&mut self) -> bool {
    self.select_index(0)
  }

  pub fn last(&mut self) -> bool {
    if self.index.is_empty() {
      return false;
    }
    self.select_index(self.index.len() - 1)
  }

  fn select_index(&mut self, index: usize) -> bool {
    let Some(id) = self.index.item_at(index).cloned() else { return false };
    self.select(&id).is_ok()
  }

  pub fn selection(&self) -> &SelectionState {
    &self.selection
  }

  pub fn current(&self) -> &str {
    &self.selection.current_item_id
  }

  pub fn current_index(&self) -> Option<usize> {
    self.index.locate(&self.selection.current_item_id)
  }

  /// "3 / 42", or "– / 42" when the current item is not in the catalog.
  pub fn position_label(&self) -> String {
    match self.current_index() {
      Some(i) => format!("{} / {}", i + 1, self.index.len()),
      None => format!("– / {}", self.index.len()),
    }
  }

  pub fn index(&self) -> &LinearIndex {
    &self.index
  }

  pub fn progress(&self) -> &ProgressStore<S, C> {
    &self.progress
  }

  pub fn progress_mut(&mut self) -> &mut ProgressStore<S, C> {
    &mut self.progress
  }
}
