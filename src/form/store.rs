//! Per-panel parameter values and the set of modes chosen for the next submission.

use super::field::toggle_in;
use crate::model::{FileRef, ParamValue, ParameterSet};
use std::collections::BTreeSet;

/// `mode_id -> field_name -> value` for one gadget panel.
///
/// Reads of unset fields return the empty value of the requested type, never an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    values: ParameterSet,
}

impl ParameterStore {
    pub fn set(&mut self, mode_id: &str, field: &str, value: ParamValue) {
        self.values
            .entry(mode_id.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn get(&self, mode_id: &str, field: &str) -> Option<&ParamValue> {
        self.values.get(mode_id)?.get(field)
    }

    pub fn text(&self, mode_id: &str, field: &str) -> &str {
        match self.get(mode_id, field) {
            Some(ParamValue::Text(s)) => s,
            _ => "",
        }
    }

    pub fn multi(&self, mode_id: &str, field: &str) -> BTreeSet<String> {
        match self.get(mode_id, field) {
            Some(ParamValue::Multi(set)) => set.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn file(&self, mode_id: &str, field: &str) -> Option<&FileRef> {
        match self.get(mode_id, field) {
            Some(ParamValue::File(r)) => Some(r),
            _ => None,
        }
    }

    /// Flip one option of a multiselect field, starting from `current` when the field
    /// has no stored value yet (so a declared default is what gets toggled).
    pub fn toggle_option(
        &mut self,
        mode_id: &str,
        field: &str,
        value: &str,
        current: &BTreeSet<String>,
    ) {
        let base = match self.get(mode_id, field) {
            Some(ParamValue::Multi(_)) => self.multi(mode_id, field),
            _ => current.clone(),
        };
        self.set(mode_id, field, ParamValue::Multi(toggle_in(&base, value)));
    }

    /// Drop every value stored under the given modes.
    pub fn clear<'a>(&mut self, mode_ids: impl IntoIterator<Item = &'a str>) {
        for id in mode_ids {
            self.values.remove(id);
        }
    }

    pub fn subset<'a>(&self, mode_ids: impl IntoIterator<Item = &'a str>) -> ParameterSet {
        mode_ids
            .into_iter()
            .filter_map(|id| self.values.get(id).map(|v| (id.to_string(), v.clone())))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(|m| m.is_empty())
    }
}

/// Mode ids chosen for the next submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet(BTreeSet<String>);

impl SelectionSet {
    /// Add if absent, remove if present.
    pub fn toggle(&mut self, mode_id: &str) {
        if !self.0.remove(mode_id) {
            self.0.insert(mode_id.to_string());
        }
    }

    pub fn contains(&self, mode_id: &str) -> bool {
        self.0.contains(mode_id)
    }

    pub fn clear<'a>(&mut self, mode_ids: impl IntoIterator<Item = &'a str>) {
        for id in mode_ids {
            self.0.remove(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_reads_are_typed_empties() {
        let store = ParameterStore::default();
        assert_eq!(store.text("quick", "target"), "");
        assert!(store.multi("quick", "cats").is_empty());
        assert_eq!(store.file("quick", "input"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn set_then_read_and_overwrite() {
        let mut store = ParameterStore::default();
        store.set("quick", "target", ParamValue::Text("10.0.0.1".into()));
        store.set("quick", "target", ParamValue::Text("10.0.0.2".into()));
        assert_eq!(store.text("quick", "target"), "10.0.0.2");
        // Wrong-typed read is empty, not a panic.
        assert!(store.multi("quick", "target").is_empty());
    }

    #[test]
    fn clear_only_touches_named_modes() {
        let mut store = ParameterStore::default();
        store.set("quick", "target", ParamValue::Text("a".into()));
        store.set("full", "target", ParamValue::Text("b".into()));
        store.clear(["quick"]);
        assert_eq!(store.text("quick", "target"), "");
        assert_eq!(store.text("full", "target"), "b");
    }

    #[test]
    fn toggle_option_starts_from_default_and_round_trips() {
        let mut store = ParameterStore::default();
        let default: BTreeSet<String> = ["web".to_string()].into();
        store.toggle_option("full", "cats", "sql", &default);
        assert_eq!(
            store.multi("full", "cats"),
            ["web".to_string(), "sql".to_string()].into()
        );
        store.toggle_option("full", "cats", "sql", &default);
        assert_eq!(store.multi("full", "cats"), default);
    }

    #[test]
    fn subset_skips_modes_without_values() {
        let mut store = ParameterStore::default();
        store.set("quick", "target", ParamValue::Text("a".into()));
        store.set("full", "target", ParamValue::Text("b".into()));
        let sub = store.subset(["quick", "stealth"]);
        assert_eq!(sub.len(), 1);
        assert!(sub.contains_key("quick"));
    }

    #[test]
    fn selection_toggle_is_idempotent_in_pairs() {
        let mut sel = SelectionSet::default();
        sel.toggle("quick");
        assert!(sel.contains("quick"));
        sel.toggle("quick");
        assert!(!sel.contains("quick"));
        assert!(sel.is_empty());

        sel.toggle("quick");
        sel.toggle("full");
        sel.clear(["quick"]);
        assert_eq!(sel.len(), 1);
        assert!(sel.contains("full"));
    }
}
