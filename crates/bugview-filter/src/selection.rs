//! Ordered selection set shared by every facet.

use serde::{Deserialize, Serialize};

/// Cached metadata for a selected value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    /// Result count last observed for this value.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub count: Option<u64>,
    /// Server-side ids the value resolves to (runs and run tags). A value
    /// with `*` wildcards may resolve to several.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ids: Vec<i64>,
}

impl ItemMeta {
    #[must_use]
    pub const fn with_count(count: u64) -> Self {
        Self {
            count: Some(count),
            ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id(id: i64) -> Self {
        Self {
            count: None,
            ids: vec![id],
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count.is_none() && self.ids.is_empty()
    }

    /// Overwrite the fields `other` sets; keep the rest.
    fn merge(&mut self, other: Self) {
        if other.count.is_some() {
            self.count = other.count;
        }
        if !other.ids.is_empty() {
            self.ids = other.ids;
        }
    }
}

/// One selected value with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedItem {
    pub value: String,
    #[serde(flatten)]
    pub meta: ItemMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    Multi,
    /// Selecting a value replaces the previous one.
    Single,
}

/// What a facet shows as its current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionView<'a> {
    /// The "no filter selected" placeholder.
    NoFilter,
    Items(&'a [SelectedItem]),
}

/// Selected values in selection order, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    mode: SelectMode,
    items: Vec<SelectedItem>,
}

impl Selection {
    #[must_use]
    pub const fn new(mode: SelectMode) -> Self {
        Self {
            mode,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> SelectMode {
        self.mode
    }

    /// Select `value`. Reselecting keeps the position and merges new metadata.
    /// Returns `true` if the set of selected values changed.
    pub fn select(&mut self, value: &str, meta: ItemMeta) -> bool {
        if let Some(existing) = self.items.iter_mut().find(|i| i.value == value) {
            existing.meta.merge(meta);
            return false;
        }
        if self.mode == SelectMode::Single {
            self.items.clear();
        }
        self.items.push(SelectedItem {
            value: value.to_string(),
            meta,
        });
        true
    }

    /// Remove `value`; absent values are ignored. Returns `true` if removed.
    pub fn deselect(&mut self, value: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.value != value);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.items.iter().any(|i| i.value == value)
    }

    #[must_use]
    pub fn get(&self, value: &str) -> Option<&SelectedItem> {
        self.items.iter().find(|i| i.value == value)
    }

    pub fn get_mut(&mut self, value: &str) -> Option<&mut SelectedItem> {
        self.items.iter_mut().find(|i| i.value == value)
    }

    #[must_use]
    pub fn items(&self) -> &[SelectedItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut SelectedItem> {
        self.items.iter_mut()
    }

    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.items.iter().map(|i| i.value.clone()).collect()
    }

    /// Resolved ids of the selected items in selection order, without
    /// duplicates. Items with no known id are skipped.
    #[must_use]
    pub fn resolved_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for id in self.items.iter().flat_map(|i| &i.meta.ids) {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn view(&self) -> SelectionView<'_> {
        if self.items.is_empty() {
            SelectionView::NoFilter
        } else {
            SelectionView::Items(&self.items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_idempotent_and_ordered() {
        let mut sel = Selection::new(SelectMode::Multi);
        assert!(sel.select("High", ItemMeta::default()));
        assert!(sel.select("Medium", ItemMeta::with_count(4)));
        assert!(!sel.select("High", ItemMeta::default()));
        assert_eq!(sel.values(), vec!["High", "Medium"]);
        assert_eq!(sel.get("Medium").unwrap().meta.count, Some(4));
    }

    #[test]
    fn reselect_merges_metadata() {
        let mut sel = Selection::new(SelectMode::Multi);
        sel.select("nightly", ItemMeta::with_count(3));
        sel.select("nightly", ItemMeta::with_id(12));
        let meta = &sel.get("nightly").unwrap().meta;
        assert_eq!(meta.count, Some(3));
        assert_eq!(meta.ids, vec![12]);
    }

    #[test]
    fn single_mode_replaces() {
        let mut sel = Selection::new(SelectMode::Single);
        sel.select("on", ItemMeta::default());
        sel.select("off", ItemMeta::default());
        assert_eq!(sel.values(), vec!["off"]);
    }

    #[test]
    fn placeholder_tracks_emptiness() {
        let mut sel = Selection::new(SelectMode::Multi);
        assert_eq!(sel.view(), SelectionView::NoFilter);
        sel.select("Low", ItemMeta::default());
        assert!(matches!(sel.view(), SelectionView::Items(items) if items.len() == 1));
        assert!(sel.deselect("Low"));
        assert_eq!(sel.view(), SelectionView::NoFilter);
        assert!(!sel.deselect("Low"));
    }

    #[test]
    fn resolved_ids_skip_unknown() {
        let mut sel = Selection::new(SelectMode::Multi);
        sel.select("a", ItemMeta::with_id(1));
        sel.select("b", ItemMeta::default());
        sel.select("c", ItemMeta::with_id(3));
        sel.select(
            "*",
            ItemMeta {
                count: None,
                ids: vec![3, 4],
            },
        );
        assert_eq!(sel.resolved_ids(), vec![1, 3, 4]);
    }
}
