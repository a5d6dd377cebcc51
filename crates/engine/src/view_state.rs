//! Per-widget view preferences backed by a durable key-value store.
//!
//! Every table widget owns one [`ViewStateStore`]. Preferences are persisted
//! under `<dashboard>_<table>-<field>` so that reloading the same dashboard
//! restores page size, page, search text and sort settings. Values read back
//! from storage are coerced into their allowed domain; a value outside of it
//! silently falls back to the field's default.

use std::sync::Arc;

use agtable_types::{
    DEFAULT_CURRENT_PAGE, DEFAULT_ITEMS_PER_PAGE, DEFAULT_SORT_KEY, ITEMS_PER_PAGE_OPTIONS, SortDirection, ViewStateField,
};
use agtable_util::KeyValueStore;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TableError;

/// Identity under which one widget's preferences are persisted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(dashboard_id: &str, table_id: &str) -> Self {
        Self(format!("{dashboard_id}_{table_id}"))
    }

    /// Full key of one persisted field.
    pub fn field(&self, field: ViewStateField) -> String {
        format!("{}-{}", self.0, field.storage_name())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// In-memory view of a widget's UI preferences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewState {
    pub items_per_page: usize,
    pub current_page: usize,
    pub search_text: String,
    pub sort_key: String,
    pub reverse: SortDirection,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            current_page: DEFAULT_CURRENT_PAGE,
            search_text: String::new(),
            sort_key: DEFAULT_SORT_KEY.to_string(),
            reverse: SortDirection::Ascending,
        }
    }
}

/// Single source of truth for one table's preferences.
pub struct ViewStateStore {
    store: Arc<dyn KeyValueStore>,
    storage_key: StorageKey,
    state: ViewState,
}

impl ViewStateStore {
    /// Load the preferences of `dashboard_id`/`table_id`, defaulting every
    /// field the store has never seen.
    pub fn open(store: Arc<dyn KeyValueStore>, dashboard_id: &str, table_id: &str) -> Self {
        let mut view_state = Self {
            store,
            storage_key: StorageKey::new(dashboard_id, table_id),
            state: ViewState::default(),
        };
        view_state.state = view_state.load();
        debug!(storage_key = %view_state.storage_key.as_str(), state = ?view_state.state, "view state loaded");
        view_state
    }

    pub fn storage_key(&self) -> &StorageKey {
        &self.storage_key
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn items_per_page(&self) -> usize {
        self.state.items_per_page
    }

    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    pub fn search_text(&self) -> &str {
        &self.state.search_text
    }

    pub fn sort_key(&self) -> &str {
        &self.state.sort_key
    }

    pub fn reverse(&self) -> SortDirection {
        self.state.reverse
    }

    /// Raw stored value of `field`, or `default` when absent or unreadable.
    pub fn get(&self, field: ViewStateField, default: Value) -> Value {
        let key = self.storage_key.field(field);
        match self.store.get(&key) {
            Ok(Some(value)) if !value.is_null() => value,
            Ok(_) => default,
            Err(error) => {
                warn!(%key, %error, "failed to read view preference; using default");
                default
            }
        }
    }

    /// Persist `value` for `field`; a value equal to `default` clears the entry.
    ///
    /// Persistence failures are logged and otherwise ignored: the in-memory
    /// state stays authoritative for the session.
    pub fn set(&self, field: ViewStateField, default: &Value, value: Value) {
        let key = self.storage_key.field(field);
        let result = if &value == default {
            self.store.remove(&key)
        } else {
            self.store.set(&key, value)
        };
        if let Err(error) = result {
            warn!(%key, %error, "failed to persist view preference");
        }
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) -> Result<(), TableError> {
        if !ITEMS_PER_PAGE_OPTIONS.contains(&items_per_page) {
            return Err(TableError::InvalidItemsPerPage(items_per_page));
        }
        self.state.items_per_page = items_per_page;
        self.set(
            ViewStateField::ItemsPerPage,
            &Value::from(DEFAULT_ITEMS_PER_PAGE),
            Value::from(items_per_page),
        );
        Ok(())
    }

    pub fn set_current_page(&mut self, current_page: usize) -> Result<(), TableError> {
        if current_page == 0 {
            return Err(TableError::InvalidPage(current_page));
        }
        self.state.current_page = current_page;
        self.set(
            ViewStateField::CurrentPage,
            &Value::from(DEFAULT_CURRENT_PAGE),
            Value::from(current_page),
        );
        Ok(())
    }

    pub fn set_search_text(&mut self, search_text: impl Into<String>) {
        self.state.search_text = search_text.into();
        self.set(
            ViewStateField::SearchText,
            &Value::String(String::new()),
            Value::String(self.state.search_text.clone()),
        );
    }

    pub fn set_sort_key(&mut self, sort_key: impl Into<String>) {
        self.state.sort_key = sort_key.into();
        self.set(
            ViewStateField::SortKey,
            &Value::from(DEFAULT_SORT_KEY),
            Value::String(self.state.sort_key.clone()),
        );
    }

    pub fn set_reverse(&mut self, reverse: SortDirection) {
        self.state.reverse = reverse;
        self.set(
            ViewStateField::SortReverse,
            &Value::from(SortDirection::Ascending.factor()),
            Value::from(reverse.factor()),
        );
    }

    /// Drop the in-memory state back to defaults; persisted values are kept.
    pub fn reset(&mut self) {
        self.state = ViewState::default();
    }

    fn load(&self) -> ViewState {
        let items_per_page = self.read_number(ViewStateField::ItemsPerPage).and_then(|value| {
            usize::try_from(value)
                .ok()
                .filter(|candidate| ITEMS_PER_PAGE_OPTIONS.contains(candidate))
        });
        let current_page = self
            .read_number(ViewStateField::CurrentPage)
            .and_then(|value| usize::try_from(value).ok())
            .filter(|page| *page >= 1);
        let search_text = self.read_text(ViewStateField::SearchText);
        let sort_key = self
            .read_text(ViewStateField::SortKey)
            .filter(|key| !key.is_empty());
        let reverse = self.read_number(ViewStateField::SortReverse).map(SortDirection::from_factor);

        ViewState {
            items_per_page: self.or_default(ViewStateField::ItemsPerPage, items_per_page, DEFAULT_ITEMS_PER_PAGE),
            current_page: self.or_default(ViewStateField::CurrentPage, current_page, DEFAULT_CURRENT_PAGE),
            search_text: self.or_default(ViewStateField::SearchText, search_text, String::new()),
            sort_key: self.or_default(ViewStateField::SortKey, sort_key, DEFAULT_SORT_KEY.to_string()),
            reverse: self.or_default(ViewStateField::SortReverse, reverse, SortDirection::Ascending),
        }
    }

    fn read_number(&self, field: ViewStateField) -> Option<i64> {
        value_as_integer(&self.get(field, Value::Null))
    }

    fn read_text(&self, field: ViewStateField) -> Option<String> {
        match self.get(field, Value::Null) {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Use `value` when it passed validation, otherwise fall back to `default`,
    /// noting stored values that had to be discarded.
    fn or_default<T>(&self, field: ViewStateField, value: Option<T>, default: T) -> T {
        value.unwrap_or_else(|| {
            let stored = self.get(field, Value::Null);
            if !stored.is_null() {
                debug!(key = %self.storage_key.field(field), %stored, "coercing invalid stored preference to default");
            }
            default
        })
    }
}

/// Interpret a stored JSON value as an integer.
///
/// Accepts integers, integral floats and numeric strings; anything else,
/// including fractional numbers, yields `None`.
fn value_as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|float| float.fract() == 0.0 && float.abs() < 9.0e15).map(|float| float as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agtable_util::{InMemoryKeyValueStore, JsonKeyValueStore};
    use serde_json::json;
    use tempfile::tempdir;

    fn memory_store() -> Arc<InMemoryKeyValueStore> {
        Arc::new(InMemoryKeyValueStore::new())
    }

    #[test]
    fn cold_start_uses_defaults() {
        let view_state = ViewStateStore::open(memory_store(), "42", "element_table1");
        assert_eq!(view_state.state(), &ViewState::default());
        assert_eq!(view_state.items_per_page(), 10);
        assert_eq!(view_state.current_page(), 1);
        assert_eq!(view_state.sort_key(), "timestamp");
        assert_eq!(view_state.reverse(), SortDirection::Ascending);
        assert_eq!(view_state.search_text(), "");
    }

    #[test]
    fn storage_keys_follow_dashboard_and_table() {
        let key = StorageKey::new("42", "element_table3");
        assert_eq!(key.as_str(), "42_element_table3");
        assert_eq!(key.field(ViewStateField::SortReverse), "42_element_table3-sortReverse");
        assert_eq!(key.field(ViewStateField::ItemsPerPage), "42_element_table3-itemsPerPage");
    }

    #[test]
    fn reverse_magnitudes_other_than_one_are_coerced() {
        for stored in [json!(2), json!(-3), json!(0), json!(0.5), json!("-7"), json!(true)] {
            let store = memory_store();
            store.set("d_t-sortReverse", stored.clone()).unwrap();
            let view_state = ViewStateStore::open(store, "d", "t");
            assert_eq!(view_state.reverse(), SortDirection::Ascending, "stored {stored}");
        }

        let store = memory_store();
        store.set("d_t-sortReverse", json!(-1)).unwrap();
        assert_eq!(ViewStateStore::open(store, "d", "t").reverse(), SortDirection::Descending);

        let store = memory_store();
        store.set("d_t-sortReverse", json!(-1.0)).unwrap();
        assert_eq!(ViewStateStore::open(store, "d", "t").reverse(), SortDirection::Descending);
    }

    #[test]
    fn invalid_stored_values_fall_back_to_defaults() {
        let store = memory_store();
        store.set("d_t-itemsPerPage", json!(7)).unwrap();
        store.set("d_t-currentPage", json!(0)).unwrap();
        store.set("d_t-searchText", json!(12)).unwrap();
        store.set("d_t-sortKey", json!("")).unwrap();

        let view_state = ViewStateStore::open(store, "d", "t");
        assert_eq!(view_state.state(), &ViewState::default());
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let store = memory_store();
        store.set("d_t-itemsPerPage", json!("25")).unwrap();
        store.set("d_t-currentPage", json!("3")).unwrap();

        let view_state = ViewStateStore::open(store, "d", "t");
        assert_eq!(view_state.items_per_page(), 25);
        assert_eq!(view_state.current_page(), 3);
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = memory_store();
        let view_state = ViewStateStore::open(store.clone(), "d", "t");

        view_state.set(ViewStateField::SearchText, &json!(""), json!("cpu"));
        assert_eq!(view_state.get(ViewStateField::SearchText, json!("")), json!("cpu"));

        view_state.set(ViewStateField::SearchText, &json!(""), json!(""));
        assert_eq!(view_state.get(ViewStateField::SearchText, json!("")), json!(""));
        assert!(store.is_empty(), "default values clear the entry");

        assert_eq!(view_state.get(ViewStateField::SortKey, json!("timestamp")), json!("timestamp"));
    }

    #[test]
    fn mutators_persist_and_reload() {
        let store = memory_store();
        let mut view_state = ViewStateStore::open(store.clone(), "d", "t");
        view_state.set_items_per_page(50).unwrap();
        view_state.set_current_page(4).unwrap();
        view_state.set_search_text("host=a");
        view_state.set_sort_key("value1");
        view_state.set_reverse(SortDirection::Descending);

        let reloaded = ViewStateStore::open(store, "d", "t");
        assert_eq!(
            reloaded.state(),
            &ViewState {
                items_per_page: 50,
                current_page: 4,
                search_text: "host=a".into(),
                sort_key: "value1".into(),
                reverse: SortDirection::Descending,
            }
        );
    }

    #[test]
    fn invalid_mutations_are_rejected() {
        let mut view_state = ViewStateStore::open(memory_store(), "d", "t");
        assert_eq!(view_state.set_items_per_page(12), Err(TableError::InvalidItemsPerPage(12)));
        assert_eq!(view_state.set_current_page(0), Err(TableError::InvalidPage(0)));
        assert_eq!(view_state.state(), &ViewState::default());
    }

    #[test]
    fn reset_keeps_persisted_values() {
        let store = memory_store();
        let mut view_state = ViewStateStore::open(store.clone(), "d", "t");
        view_state.set_items_per_page(100).unwrap();
        view_state.reset();
        assert_eq!(view_state.items_per_page(), 10);
        assert_eq!(ViewStateStore::open(store, "d", "t").items_per_page(), 100);
    }

    #[test]
    fn preferences_survive_reload_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        {
            let store = Arc::new(JsonKeyValueStore::new(Some(path.clone())).unwrap());
            let mut view_state = ViewStateStore::open(store, "ops", "element_table1");
            view_state.set_items_per_page(200).unwrap();
            view_state.set_reverse(SortDirection::Descending);
        }

        let store = Arc::new(JsonKeyValueStore::new(Some(path)).unwrap());
        let view_state = ViewStateStore::open(store, "ops", "element_table1");
        assert_eq!(view_state.items_per_page(), 200);
        assert_eq!(view_state.reverse(), SortDirection::Descending);
    }
}
