//! Flattened traversal order over the catalog, independent of grouping.

use std::collections::HashMap;

use crate::catalog::{Catalog, ItemId};

/// Concatenate every group's items in catalog order.
pub fn flatten(catalog: &Catalog) -> Vec<ItemId> {
  catalog.groups.iter().flat_map(|g| g.items.iter().cloned()).collect()
}

/// Id ↔ position lookup over `flatten(catalog)`.
///
/// Built once per catalog load. When an id appears more than once, lookups
/// resolve to its first position.
#[derive(Debug, Clone, Default)]
pub struct LinearIndex {
  order: Vec<ItemId>,
  /// 1-based part number of each position within its source group.
  parts: Vec<usize>,
  first_position: HashMap<ItemId, usize>,
}

impl LinearIndex {
  pub fn new(catalog: &Catalog) -> Self {
    let order = flatten(catalog);
    let parts = catalog.groups.iter().flat_map(|g| 1..=g.items.len()).collect();
    let mut first_position = HashMap::with_capacity(order.len());
    for (i, id) in order.iter().enumerate() {
      first_position.entry(id.clone()).or_insert(i);
    }
    Self { order, parts, first_position }
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  pub fn locate(&self, id: &str) -> Option<usize> {
    self.first_position.get(id).copied()
  }

  pub fn item_at(&self, index: usize) -> Option<&ItemId> {
    self.order.get(index)
  }

  /// "Part N" number of `id` within the group it was first listed in.
  pub fn part_number(&self, id: &str) -> Option<usize> {
    self.locate(id).and_then(|i| self.parts.get(i).copied())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::CatalogGroup;
  use proptest::prelude::*;

  fn sample() -> Catalog {
    Catalog::new(vec![CatalogGroup::new("Intro", ["A", "B"]), CatalogGroup::new("Cache", ["C", "D", "E"])])
  }

  #[test]
  fn flatten_concatenates_in_order() {
    assert_eq!(flatten(&sample()), vec!["A", "B", "C", "D", "E"]);
  }

  #[test]
  fn locate_and_item_at() {
    let index = LinearIndex::new(&sample());
    assert_eq!(index.len(), 5);
    assert_eq!(index.locate("C"), Some(2));
    assert_eq!(index.locate("nope"), None);
    assert_eq!(index.item_at(4).map(String::as_str), Some("E"));
    assert_eq!(index.item_at(5), None);
  }

  #[test]
  fn duplicate_ids_resolve_to_first_position() {
    let catalog = Catalog::new(vec![CatalogGroup::new("One", ["A", "B"]), CatalogGroup::new("Two", ["B", "C"])]);
    let index = LinearIndex::new(&catalog);
    assert_eq!(index.len(), 4);
    assert_eq!(index.locate("B"), Some(1));
  }

  #[test]
  fn part_numbers_restart_per_group() {
    let index = LinearIndex::new(&sample());
    assert_eq!(index.part_number("A"), Some(1));
    assert_eq!(index.part_number("B"), Some(2));
    assert_eq!(index.part_number("C"), Some(1));
    assert_eq!(index.part_number("E"), Some(3));
    assert_eq!(index.part_number("Z"), None);
  }

  #[test]
  fn empty_catalog() {
    let index = LinearIndex::new(&Catalog::default());
    assert!(index.is_empty());
    assert_eq!(index.item_at(0), None);
  }

  fn arb_catalog() -> impl Strategy<Value = Catalog> {
    prop::collection::vec(("[a-z]{1,8}", prop::collection::vec("[A-Za-z0-9_-]{11}", 1..6)), 0..8).prop_map(|groups| {
      Catalog::new(groups.into_iter().map(|(topic, items)| CatalogGroup::new(topic, items)).collect())
    })
  }

  proptest! {
    #[test]
    fn flatten_length_is_sum_of_group_lengths(catalog in arb_catalog()) {
      let expected: usize = catalog.groups.iter().map(|g| g.items.len()).sum();
      prop_assert_eq!(flatten(&catalog).len(), expected);
    }

    #[test]
    fn locate_inverts_item_at_for_unique_ids(count in 0usize..40, split in 1usize..6) {
      let ids: Vec<String> = (0..count).map(|i| format!("vid{i:08}")).collect();
      let groups = ids.chunks(split).enumerate().map(|(g, chunk)| CatalogGroup::new(format!("t{g}"), chunk.to_vec()));
      let index = LinearIndex::new(&Catalog::new(groups.collect()));
      for i in 0..index.len() {
        let id = index.item_at(i).unwrap().clone();
        prop_assert_eq!(index.locate(&id), Some(i));
      }
    }
  }
}
