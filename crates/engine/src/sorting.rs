//! Row and column ordering.
//!
//! Two orderings are derived from the view state:
//!
//! - the per-row ordering of data columns shown when a row is clicked
//!   ([`sort_source_columns`]), compared lexically for the date row and
//!   numerically otherwise;
//! - the ordering of the rows themselves by the current sort key
//!   ([`order_rows`]), compared according to the sort column's kind.
//!
//! Both use a stable sort with no secondary key: ties keep their input order.

use std::cmp::Ordering;

use agtable_types::{ColumnKind, ColumnNames, DATETIME_COLUMN, Row, SortDirection, TIMESTAMP_COLUMN, cell_text};
use serde_json::Value;

/// Comparison semantics applied to two cell values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareMode {
    /// Ordering of the rendered cell text, ignoring case first and falling
    /// back to byte order for ties.
    Lexical,
    /// Numeric ordering; values that are not finite numbers order after all
    /// numbers in either direction.
    Numeric,
}

impl CompareMode {
    /// Date mode applies when the row's `datetime` cell equals the table's datetime label.
    pub fn for_row(row: &Row, datetime_label: &str) -> Self {
        match row.get(DATETIME_COLUMN).and_then(Value::as_str) {
            Some(label) if label == datetime_label => Self::Lexical,
            _ => Self::Numeric,
        }
    }

    pub fn for_kind(kind: ColumnKind) -> Self {
        if kind.is_lexical() { Self::Lexical } else { Self::Numeric }
    }

    /// Compare two cells in `direction`.
    pub fn compare(self, left: &Value, right: &Value, direction: SortDirection) -> Ordering {
        match self {
            Self::Lexical => direction.apply(compare_text(&cell_text(left), &cell_text(right))),
            Self::Numeric => match (numeric_value(left), numeric_value(right)) {
                (Some(left), Some(right)) => direction.apply(left.total_cmp(&right)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

/// Order the data columns of `row` by their values.
///
/// `timestamp` and `datetime` are excluded. Only the column keys are
/// returned; values are looked up again at render time.
pub fn sort_source_columns(row: &Row, datetime_label: &str, direction: SortDirection) -> Vec<String> {
    let mode = CompareMode::for_row(row, datetime_label);
    let mut pairs: Vec<(&String, &Value)> = row
        .iter()
        .filter(|(key, _)| key.as_str() != TIMESTAMP_COLUMN && key.as_str() != DATETIME_COLUMN)
        .collect();
    pairs.sort_by(|left, right| mode.compare(left.1, right.1, direction));
    pairs.into_iter().map(|(key, _)| key.clone()).collect()
}

/// Order rows by the `sort_key` column.
///
/// Rows keep their input order when `sort_key` is not a column of the table.
pub fn order_rows<'a>(rows: Vec<&'a Row>, columns: &ColumnNames, sort_key: &str, direction: SortDirection) -> Vec<&'a Row> {
    let Some(kind) = columns.kind(sort_key) else {
        return rows;
    };
    let mode = CompareMode::for_kind(kind);
    let mut rows = rows;
    rows.sort_by(|left, right| {
        let left = left.get(sort_key).unwrap_or(&Value::Null);
        let right = right.get(sort_key).unwrap_or(&Value::Null);
        mode.compare(left, right, direction)
    });
    rows
}

/// Keep rows with a cell whose text contains `search_text`, ignoring case.
pub fn filter_rows<'a>(rows: impl IntoIterator<Item = &'a Row>, search_text: &str) -> Vec<&'a Row> {
    let needle = search_text.trim().to_lowercase();
    if needle.is_empty() {
        return rows.into_iter().collect();
    }
    rows.into_iter()
        .filter(|row| row.values().any(|value| cell_text(value).to_lowercase().contains(&needle)))
        .collect()
}
