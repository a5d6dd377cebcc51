//! Bridge between the metric query and the table's row structures.
//!
//! [`TableDataAdapter`] builds the expression list from a widget's metrics
//! and the dashboard controls, runs the query, and classifies the answer as
//! loaded, empty or failed. Failures are forwarded to the notification sink
//! and never escape as errors.

pub mod augment;
pub mod materialize;
pub mod notify;
pub mod query;

use std::sync::Arc;

use agtable_types::{Control, MetricDefinition, TableData};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

pub use augment::{ControlSubstitution, ExpressionAugmenter};
pub use materialize::{MetricRowMaterializer, RowMaterializer};
pub use notify::{NotificationSink, TracingNotifier};
pub use query::{HttpQueryExecutor, QueryError, QueryExecutor, QueryResult, decode_metrics};

/// Result of one load attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// The query returned series; rows and columns are ready to display.
    Loaded(TableData),
    /// The query succeeded but returned nothing for these expressions.
    Empty { expressions: Vec<String> },
    /// The query failed; `message` was forwarded to the notification sink.
    Failed { message: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Runs table queries and materializes their results.
#[derive(Clone)]
pub struct TableDataAdapter {
    executor: Arc<dyn QueryExecutor>,
    materializer: Arc<dyn RowMaterializer>,
    augmenter: Arc<dyn ExpressionAugmenter>,
    notifier: Arc<dyn NotificationSink>,
}

impl TableDataAdapter {
    /// Create an adapter using [`MetricRowMaterializer`] and [`ControlSubstitution`].
    pub fn new(executor: Arc<dyn QueryExecutor>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            executor,
            materializer: Arc::new(MetricRowMaterializer::default()),
            augmenter: Arc::new(ControlSubstitution),
            notifier,
        }
    }

    pub fn with_materializer(mut self, materializer: Arc<dyn RowMaterializer>) -> Self {
        self.materializer = materializer;
        self
    }

    pub fn with_augmenter(mut self, augmenter: Arc<dyn ExpressionAugmenter>) -> Self {
        self.augmenter = augmenter;
        self
    }

    /// One augmented expression per metric, in the metrics' iteration order.
    pub fn build_expressions(&self, metrics: &IndexMap<String, MetricDefinition>, controls: &[Control]) -> Vec<String> {
        metrics
            .values()
            .map(|metric| self.augmenter.augment(&metric.expression, controls))
            .collect()
    }

    /// Query `expressions` and classify the answer.
    pub async fn load(&self, expressions: &[String], gmt: bool) -> LoadOutcome {
        debug!(?expressions, gmt, "querying table data");
        match self.executor.query(expressions).await {
            Ok(result) if !result.is_empty() => {
                let data = self.materializer.materialize(&result, gmt);
                debug!(series = result.len(), rows = data.rows.len(), "table data loaded");
                LoadOutcome::Loaded(data)
            }
            Ok(_) => {
                let listed = serde_json::to_string(expressions).unwrap_or_else(|_| format!("{expressions:?}"));
                info!("No data found for the metric expressions: {listed}");
                LoadOutcome::Empty {
                    expressions: expressions.to_vec(),
                }
            }
            Err(error) => {
                let message = error.to_string();
                warn!(%message, "table query failed");
                self.notifier.notify_error(&message);
                LoadOutcome::Failed { message }
            }
        }
    }
}
