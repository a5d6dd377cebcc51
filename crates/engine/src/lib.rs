//! # Agtable Engine
//!
//! View-state engine of a dashboard table widget. A widget shows the result
//! of one or more metric expressions as a time-indexed table with
//! pagination, search, and sorting, and remembers each user's view choices
//! per dashboard and table.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use agtable_api::ArgusClient;
//! use agtable_engine::{HttpQueryExecutor, TableController, TableDataAdapter, TableIdAllocator, TableSetup, TracingNotifier};
//! use agtable_util::InMemoryKeyValueStore;
//!
//! let client = ArgusClient::new("http://localhost:8080/argusws/")?;
//! let adapter = TableDataAdapter::new(Arc::new(HttpQueryExecutor::new(client)), Arc::new(TracingNotifier));
//! let setup = TableSetup {
//!     dashboard_id: "42".into(),
//!     ..TableSetup::default()
//! };
//!
//! let table = TableController::mount(setup, Arc::new(InMemoryKeyValueStore::new()), adapter, Arc::new(TableIdAllocator::new()));
//! assert_eq!(table.table_id(), "element_table1");
//! assert_eq!(table.view_state().items_per_page(), 10);
//! assert!(!table.is_loaded());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`controller`**: lifecycle, request sequencing and user interactions
//! - **`view_state`**: persisted pagination, search and sort preferences
//! - **`adapter`**: query execution, row materialization and error notification
//! - **`sorting`** / **`pagination`**: derived row order and visible window
//! - **`identity`**: dashboard-scoped table identities
//! - **`controls`**: values derived from the dashboard controls

pub mod adapter;
pub mod controller;
pub mod controls;
pub mod error;
pub mod identity;
pub mod pagination;
pub mod sorting;
pub mod view_state;

pub use adapter::{
    ControlSubstitution, ExpressionAugmenter, HttpQueryExecutor, LoadOutcome, MetricRowMaterializer, NotificationSink, QueryError,
    QueryExecutor, QueryResult, RowMaterializer, TableDataAdapter, TracingNotifier,
};
pub use controller::{DashboardEvent, PendingQuery, TableController, TableSetup, TableStatus};
pub use controls::gmt_flag;
pub use error::TableError;
pub use identity::{TABLE_ID_PREFIX, TableIdAllocator};
pub use pagination::{PageWindow, page_count};
pub use sorting::{CompareMode, filter_rows, order_rows, sort_source_columns};
pub use view_state::{StorageKey, ViewState, ViewStateStore};
