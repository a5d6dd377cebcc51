//! Shared type definitions for the agtable workspace.
//!
//! These types describe the data that flows between the metric query, the
//! table view-state engine and the host shell: rows and their column
//! metadata, dashboard controls, metric definitions and the persisted
//! view-state fields.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved column holding the epoch-millisecond timestamp of a row.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Reserved column holding the formatted date of a row.
pub const DATETIME_COLUMN: &str = "datetime";

/// Header label used for the `timestamp` column.
pub const TIMESTAMP_LABEL: &str = "Timestamp";

/// Header label used for the `datetime` column unless the table overrides it.
pub const DEFAULT_DATETIME_LABEL: &str = "Date";

/// Control type of dashboard date-range inputs.
pub const DATE_CONTROL_TYPE: &str = "agDate";

/// Control names that bound the dashboard date range.
pub const DATE_RANGE_CONTROL_NAMES: &[&str] = &["start", "end"];

/// Page sizes a table may be configured with.
pub const ITEMS_PER_PAGE_OPTIONS: [usize; 7] = [5, 10, 15, 25, 50, 100, 200];

pub const DEFAULT_ITEMS_PER_PAGE: usize = ITEMS_PER_PAGE_OPTIONS[1];
pub const DEFAULT_CURRENT_PAGE: usize = 1;
pub const DEFAULT_SORT_KEY: &str = TIMESTAMP_COLUMN;

/// A single table row: column key to cell value, in column order.
pub type Row = IndexMap<String, Value>;

/// Render a cell value as display text.
///
/// Strings are returned verbatim, `null` renders as an empty string and all
/// other values use their JSON representation.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// How values of a column compare against each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Epoch-millisecond anchor column.
    Timestamp,
    /// Formatted date column.
    DateTime,
    /// Numeric series values.
    Numeric,
}

impl ColumnKind {
    /// Whether values of this kind order lexically rather than numerically.
    pub fn is_lexical(self) -> bool {
        matches!(self, Self::DateTime)
    }
}

/// Metadata for one column of a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Key used in every [`Row`] of the table.
    pub key: String,
    /// Header text shown for the column.
    pub label: String,
    /// Comparison semantics, decided when the rows are materialized.
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
        }
    }
}

/// Ordered column set of a table, derived once from a non-empty query result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    columns: Vec<ColumnSpec>,
}

impl ColumnNames {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter()
    }

    pub fn get(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.key == key)
    }

    pub fn kind(&self, key: &str) -> Option<ColumnKind> {
        self.get(key).map(|column| column.kind)
    }

    /// Header label of the `datetime` column, which doubles as the date-mode marker.
    pub fn datetime_label(&self) -> Option<&str> {
        self.get(DATETIME_COLUMN).map(|column| column.label.as_str())
    }

    /// Build a row holding each column's label under its key.
    pub fn header_row(&self) -> Row {
        self.columns
            .iter()
            .map(|column| (column.key.clone(), Value::String(column.label.clone())))
            .collect()
    }
}

/// Rows and columns produced from one query result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableData {
    pub rows: Vec<Row>,
    pub columns: ColumnNames,
}

/// A user-adjustable dashboard input such as a date bound.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Control type (e.g. `agDate`, `agText`).
    #[serde(rename = "type")]
    pub r#type: String,
    /// Control name; referenced from expressions as `$name$`.
    pub name: String,
    /// Current value as entered by the user.
    #[serde(default)]
    pub value: String,
}

impl Control {
    pub fn new(r#type: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether this control is one of the dashboard's date-range bounds.
    pub fn is_date_bound(&self) -> bool {
        self.r#type == DATE_CONTROL_TYPE && DATE_RANGE_CONTROL_NAMES.contains(&self.name.as_str())
    }
}

/// A configured metric of a table widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Expression template, possibly containing `$control$` placeholders.
    pub expression: String,
}

/// One time series as returned by the metric web service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub tags: IndexMap<String, String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    /// Epoch-millisecond timestamp (as a string key) to value.
    #[serde(default)]
    pub datapoints: IndexMap<String, Value>,
}

impl Metric {
    /// Label identifying the series in a table header.
    pub fn label(&self) -> String {
        if let Some(display_name) = self.display_name.as_deref().filter(|name| !name.trim().is_empty()) {
            return display_name.to_string();
        }
        let mut label = format!("{}:{}", self.scope, self.metric);
        if !self.tags.is_empty() {
            let tags: Vec<String> = self.tags.iter().map(|(key, value)| format!("{key}={value}")).collect();
            label.push('{');
            label.push_str(&tags.join(","));
            label.push('}');
        }
        label
    }
}

/// Direction applied to every sort comparison, stored as `1` or `-1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Map a stored factor onto a direction; any magnitude other than 1 reads as ascending.
    pub fn from_factor(factor: i64) -> Self {
        if factor == -1 { Self::Descending } else { Self::Ascending }
    }

    pub fn factor(self) -> i64 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Persisted view-state preferences of a table widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewStateField {
    ItemsPerPage,
    CurrentPage,
    SearchText,
    SortKey,
    SortReverse,
}

impl ViewStateField {
    /// Suffix appended to the widget's storage key.
    pub fn storage_name(self) -> &'static str {
        match self {
            Self::ItemsPerPage => "itemsPerPage",
            Self::CurrentPage => "currentPage",
            Self::SearchText => "searchText",
            Self::SortKey => "sortKey",
            Self::SortReverse => "sortReverse",
        }
    }
}

impl fmt::Display for ViewStateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}
