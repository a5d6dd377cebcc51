//! Conversion of query results into table rows.

use std::collections::BTreeMap;

use agtable_types::{
    ColumnKind, ColumnNames, ColumnSpec, DATETIME_COLUMN, DEFAULT_DATETIME_LABEL, Row, TIMESTAMP_COLUMN, TIMESTAMP_LABEL,
    TableData,
};
use agtable_util::format_timestamp_millis;
use serde_json::{Number, Value};
use tracing::debug;

use super::query::QueryResult;

/// Turns a query result into rows and column metadata.
pub trait RowMaterializer: Send + Sync {
    /// `gmt` selects GMT rather than local time for formatted dates.
    fn materialize(&self, result: &QueryResult, gmt: bool) -> TableData;
}

/// One row per distinct timestamp, one column per series.
///
/// Columns are `timestamp`, `datetime`, then `value0`, `value1`, ... in the
/// order the series were returned. Rows are ordered by ascending timestamp
/// and a series without a point at a timestamp holds `null` there.
#[derive(Debug, Clone)]
pub struct MetricRowMaterializer {
    datetime_label: String,
}

impl MetricRowMaterializer {
    pub fn new(datetime_label: impl Into<String>) -> Self {
        Self {
            datetime_label: datetime_label.into(),
        }
    }
}

impl Default for MetricRowMaterializer {
    fn default() -> Self {
        Self::new(DEFAULT_DATETIME_LABEL)
    }
}

impl RowMaterializer for MetricRowMaterializer {
    fn materialize(&self, result: &QueryResult, gmt: bool) -> TableData {
        let mut columns = vec![
            ColumnSpec::new(TIMESTAMP_COLUMN, TIMESTAMP_LABEL, ColumnKind::Timestamp),
            ColumnSpec::new(DATETIME_COLUMN, self.datetime_label.clone(), ColumnKind::DateTime),
        ];
        columns.extend(
            result
                .iter()
                .enumerate()
                .map(|(index, metric)| ColumnSpec::new(series_key(index), metric.label(), ColumnKind::Numeric)),
        );

        let mut rows: BTreeMap<i64, Row> = BTreeMap::new();
        for (index, metric) in result.iter().enumerate() {
            let key = series_key(index);
            for (timestamp, value) in &metric.datapoints {
                let Ok(millis) = timestamp.trim().parse::<i64>() else {
                    debug!(series = %metric.label(), %timestamp, "skipping datapoint with non-numeric timestamp");
                    continue;
                };
                let row = rows.entry(millis).or_insert_with(|| empty_row(millis, gmt, &columns));
                row.insert(key.clone(), normalize_value(value));
            }
        }

        TableData {
            rows: rows.into_values().collect(),
            columns: ColumnNames::new(columns),
        }
    }
}

fn series_key(index: usize) -> String {
    format!("value{index}")
}

fn empty_row(millis: i64, gmt: bool, columns: &[ColumnSpec]) -> Row {
    let datetime = format_timestamp_millis(millis, gmt).unwrap_or_else(|| millis.to_string());
    columns
        .iter()
        .map(|column| {
            let value = match column.kind {
                ColumnKind::Timestamp => Value::from(millis),
                ColumnKind::DateTime => Value::String(datetime.clone()),
                ColumnKind::Numeric => Value::Null,
            };
            (column.key.clone(), value)
        })
        .collect()
}

/// Numeric strings become numbers; everything else is kept as returned.
fn normalize_value(value: &Value) -> Value {
    if let Value::String(text) = value
        && let Some(number) = text.trim().parse::<f64>().ok().and_then(Number::from_f64)
    {
        return Value::Number(number);
    }
    value.clone()
}
