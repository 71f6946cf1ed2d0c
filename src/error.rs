//! Error types for the catalog, progress ledger and navigation.
//!
//! Everything here is recoverable except `CatalogError`, which only occurs at
//! startup before a session exists.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::ItemId;

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("failed to read catalog {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },

  #[error("malformed catalog: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("catalog group {index} ({topic:?}) has no videos")]
  EmptyGroup { index: usize, topic: String },
}

/// Failure of the durable key-value backend behind the progress ledger.
#[derive(Error, Debug)]
pub enum StorageError {
  #[error("storage I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("progress serialization error: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("no data directory available on this platform")]
  NoDataDir,
}

#[derive(Error, Debug, PartialEq)]
pub enum ProgressError {
  #[error("invalid playback position {0} for {1}")]
  InvalidPosition(f64, ItemId),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NavError {
  #[error("invalid item: {0} is not in the catalog")]
  InvalidItem(ItemId),
}
