//! Search over the catalog that keeps group structure intact.

use crate::catalog::{Catalog, CatalogGroup};

/// A search query, trimmed and case-folded once at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery(String);

impl FilterQuery {
  pub fn new(raw: &str) -> Self {
    Self(raw.trim().to_lowercase())
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// Label shown for the `index`-th (0-based) item of a group.
pub fn part_label(index: usize) -> String {
  format!("Part {}", index + 1)
}

/// Narrow `catalog` to the items matching `query`.
///
/// A group whose topic matches keeps all of its items; otherwise only the
/// items whose "Part N" label matches survive. Groups left empty are dropped
/// and relative order is preserved. An empty query returns the catalog as is.
pub fn filter(catalog: &Catalog, query: &FilterQuery) -> Catalog {
  if query.is_empty() {
    return catalog.clone();
  }
  let needle = query.as_str();

  let groups = catalog
    .groups
    .iter()
    .filter_map(|group| {
      let topic_matches = group.topic_name.to_lowercase().contains(needle);
      let items: Vec<_> = group
        .items
        .iter()
        .enumerate()
        .filter(|(i, _)| topic_matches || part_label(*i).to_lowercase().contains(needle))
        .map(|(_, id)| id.clone())
        .collect();
      (!items.is_empty()).then(|| CatalogGroup::new(group.topic_name.as_str(), items))
    })
    .collect();

  Catalog::new(groups)
}
