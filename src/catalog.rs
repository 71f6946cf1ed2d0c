use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CatalogError;

/// Opaque identifier of one video.
pub type ItemId = String;

/// Ordinal position of a group within a displayed catalog or filter result.
pub type GroupKey = usize;

/// One topic and its ordered parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogGroup {
  pub topic_name: String,
  #[serde(rename = "videos")]
  pub items: Vec<ItemId>,
}

impl CatalogGroup {
  pub fn new(topic_name: impl Into<String>, items: impl IntoIterator<Item = impl Into<ItemId>>) -> Self {
    Self { topic_name: topic_name.into(), items: items.into_iter().map(Into::into).collect() }
  }

  pub fn contains(&self, id: &str) -> bool {
    self.items.iter().any(|i| i == id)
  }
}

/// Ordered groups, loaded once and never mutated afterwards.
///
/// Filter results share this shape, so it is also the value the sidebar renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
  pub groups: Vec<CatalogGroup>,
}

const DEFAULT_CATALOG: &str = include_str!("../catalog.json");

impl Catalog {
  pub fn new(groups: Vec<CatalogGroup>) -> Self {
    Self { groups }
  }

  /// Parse a catalog from its JSON form: `[{ "topicName": .., "videos": [..] }, ..]`.
  pub fn from_json(json: &str) -> Result<Self, CatalogError> {
    let catalog: Catalog = serde_json::from_str(json)?;
    catalog.validate()?;
    Ok(catalog)
  }

  pub fn load(path: &Path) -> Result<Self, CatalogError> {
    let json =
      std::fs::read_to_string(path).map_err(|source| CatalogError::Read { path: path.to_path_buf(), source })?;
    let catalog = Self::from_json(&json)?;
    info!(path = %path.display(), groups = catalog.groups.len(), items = catalog.total_items(), "catalog loaded");
    Ok(catalog)
  }

  /// The catalog compiled into the binary.
  pub fn embedded() -> Result<Self, CatalogError> {
    Self::from_json(DEFAULT_CATALOG)
  }

  fn validate(&self) -> Result<(), CatalogError> {
    match self.groups.iter().position(|g| g.items.is_empty()) {
      Some(index) => Err(CatalogError::EmptyGroup { index, topic: self.groups[index].topic_name.clone() }),
      None => Ok(()),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }

  pub fn total_items(&self) -> usize {
    self.groups.iter().map(|g| g.items.len()).sum()
  }

  pub fn first_item(&self) -> Option<&ItemId> {
    self.groups.first().and_then(|g| g.items.first())
  }

  /// Key of the first group containing `id`.
  pub fn group_of(&self, id: &str) -> Option<GroupKey> {
    self.groups.iter().position(|g| g.contains(id))
  }
}
