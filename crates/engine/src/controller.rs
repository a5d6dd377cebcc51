//! Composition root of one table widget.
//!
//! A [`TableController`] is created when the widget mounts and reacts to the
//! dashboard's submit and destroy events. Its lifecycle is:
//!
//! ```text
//! mount ──► ReadyEmpty ──(rows loaded)──► Loaded
//!              ▲   │                        │
//!              │   └──(empty / failed)──┐   │ submit: clear data, query again
//!              └────────────────────────┴───┘
//! ReadyEmpty | Loaded ──destroy──► Destroyed
//! ```
//!
//! Visibility follows [`TableStatus::Loaded`] only; an empty result and a
//! pending first load both stay hidden.
//!
//! Each load is tagged with a request id. Only the most recently issued id
//! may apply its outcome, so a slow earlier response can never overwrite a
//! newer one, and responses arriving after teardown are dropped.

use std::sync::Arc;

use agtable_types::{Control, DEFAULT_DATETIME_LABEL, MetricDefinition, Row, TIMESTAMP_COLUMN, TableData, cell_text};
use agtable_util::KeyValueStore;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::adapter::{LoadOutcome, TableDataAdapter};
use crate::controls::gmt_flag;
use crate::error::TableError;
use crate::identity::TableIdAllocator;
use crate::pagination::{PageWindow, page_count};
use crate::sorting::{filter_rows, order_rows, sort_source_columns};
use crate::view_state::ViewStateStore;

/// Lifecycle state of a table widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableStatus {
    /// Mounted, no rows to show; the table is hidden.
    ReadyEmpty,
    /// Rows are loaded and the table is visible.
    Loaded,
    /// Torn down; late responses and interactions are ignored.
    Destroyed,
}

/// Notification delivered by the host dashboard.
#[derive(Clone, Debug, PartialEq)]
pub enum DashboardEvent {
    /// The control panel was submitted with an updated control set.
    Submit { controls: Vec<Control> },
    /// The widget was removed from the view.
    Destroy,
}

/// Configuration of a table widget at mount time.
#[derive(Clone, Debug, Default)]
pub struct TableSetup {
    pub dashboard_id: String,
    /// Identity already present in the live view, if any.
    pub existing_table_id: Option<String>,
    pub metrics: IndexMap<String, MetricDefinition>,
    pub controls: Vec<Control>,
}

/// A load that has been issued but whose outcome has not been applied yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingQuery {
    pub request_id: u64,
    pub expressions: Vec<String>,
    pub gmt: bool,
}

pub struct TableController {
    table_id: String,
    metrics: IndexMap<String, MetricDefinition>,
    controls: Vec<Control>,
    gmt: bool,
    view_state: ViewStateStore,
    adapter: TableDataAdapter,
    allocator: Arc<TableIdAllocator>,
    status: TableStatus,
    data: Option<TableData>,
    window: Option<PageWindow>,
    sorted_columns: Vec<String>,
    latest_request: u64,
}

impl TableController {
    /// Mount a widget: allocate its identity, restore its persisted view
    /// state and derive the GMT flag from the current controls.
    pub fn mount(
        setup: TableSetup,
        store: Arc<dyn KeyValueStore>,
        adapter: TableDataAdapter,
        allocator: Arc<TableIdAllocator>,
    ) -> Self {
        let table_id = allocator.allocate(setup.existing_table_id.as_deref());
        let gmt = gmt_flag(&setup.controls);
        let view_state = ViewStateStore::open(store, &setup.dashboard_id, &table_id);
        info!(%table_id, dashboard_id = %setup.dashboard_id, gmt, "table mounted");

        Self {
            table_id,
            metrics: setup.metrics,
            controls: setup.controls,
            gmt,
            view_state,
            adapter,
            allocator,
            status: TableStatus::ReadyEmpty,
            data: None,
            window: None,
            sorted_columns: Vec::new(),
            latest_request: 0,
        }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.status == TableStatus::Loaded
    }

    pub fn gmt(&self) -> bool {
        self.gmt
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn view_state(&self) -> &ViewStateStore {
        &self.view_state
    }

    pub fn adapter(&self) -> &TableDataAdapter {
        &self.adapter
    }

    pub fn data(&self) -> Option<&TableData> {
        self.data.as_ref()
    }

    /// Visible row window; `None` until rows are loaded.
    pub fn window(&self) -> Option<PageWindow> {
        self.window
    }

    /// Column order produced by the last [`TableController::sort`].
    pub fn sorted_columns(&self) -> &[String] {
        &self.sorted_columns
    }

    pub fn page_count(&self) -> usize {
        page_count(self.filtered_len(), self.view_state.items_per_page())
    }

    /// Issue a new load with the current metrics and controls.
    ///
    /// The table is hidden until the outcome is applied with
    /// [`TableController::apply_outcome`].
    pub fn begin_load(&mut self) -> Result<PendingQuery, TableError> {
        self.ensure_live()?;
        self.latest_request += 1;
        if self.status == TableStatus::Loaded {
            self.status = TableStatus::ReadyEmpty;
        }
        let pending = PendingQuery {
            request_id: self.latest_request,
            expressions: self.adapter.build_expressions(&self.metrics, &self.controls),
            gmt: self.gmt,
        };
        debug!(table_id = %self.table_id, request_id = pending.request_id, "load issued");
        Ok(pending)
    }

    /// Apply the outcome of `request_id`. Returns `false` when the outcome
    /// was dropped because a newer load was issued or the table is destroyed.
    pub fn apply_outcome(&mut self, request_id: u64, outcome: LoadOutcome) -> bool {
        if self.status == TableStatus::Destroyed {
            debug!(table_id = %self.table_id, request_id, "dropping response for destroyed table");
            return false;
        }
        if request_id != self.latest_request {
            debug!(
                table_id = %self.table_id,
                request_id,
                latest_request = self.latest_request,
                "dropping stale response"
            );
            return false;
        }

        match outcome {
            LoadOutcome::Loaded(data) => {
                self.data = Some(data);
                self.status = TableStatus::Loaded;
                self.update_window();
            }
            LoadOutcome::Empty { .. } | LoadOutcome::Failed { .. } => {
                self.status = TableStatus::ReadyEmpty;
            }
        }
        true
    }

    /// Issue a load, wait for it and apply its outcome.
    pub async fn refresh(&mut self) -> Result<TableStatus, TableError> {
        let pending = self.begin_load()?;
        let outcome = self.adapter.load(&pending.expressions, pending.gmt).await;
        self.apply_outcome(pending.request_id, outcome);
        Ok(self.status)
    }

    /// Clear the current rows, adopt `controls` and issue a new load.
    pub fn resubmit(&mut self, controls: Vec<Control>) -> Result<PendingQuery, TableError> {
        self.ensure_live()?;
        self.controls = controls;
        self.data = None;
        self.window = None;
        self.sorted_columns.clear();
        self.status = TableStatus::ReadyEmpty;
        self.begin_load()
    }

    pub async fn handle_event(&mut self, event: DashboardEvent) -> Result<TableStatus, TableError> {
        match event {
            DashboardEvent::Submit { controls } => {
                let pending = self.resubmit(controls)?;
                let outcome = self.adapter.load(&pending.expressions, pending.gmt).await;
                self.apply_outcome(pending.request_id, outcome);
            }
            DashboardEvent::Destroy => self.destroy(),
        }
        Ok(self.status)
    }

    /// Tear the widget down. Persisted preferences are kept; the
    /// dashboard's identity numbering restarts.
    pub fn destroy(&mut self) {
        if self.status == TableStatus::Destroyed {
            return;
        }
        self.status = TableStatus::Destroyed;
        self.view_state.reset();
        self.data = None;
        self.window = None;
        self.sorted_columns.clear();
        self.allocator.reset();
        info!(table_id = %self.table_id, "table destroyed");
    }

    /// Sort by a clicked row: the row's `timestamp` becomes the sort key, or
    /// toggles the direction when it already is. A new key keeps the
    /// current direction. A row without a `timestamp` cell leaves the sort
    /// state untouched.
    pub fn sort(&mut self, item: &Row) -> Result<(), TableError> {
        self.ensure_live()?;
        let Some(key) = item.get(TIMESTAMP_COLUMN).map(cell_text).filter(|key| !key.is_empty()) else {
            debug!(table_id = %self.table_id, "ignoring sort on a row without a timestamp");
            return Ok(());
        };
        if self.view_state.sort_key() == key {
            let toggled = self.view_state.reverse().toggled();
            self.view_state.set_reverse(toggled);
        } else {
            self.view_state.set_sort_key(key);
        }

        let datetime_label = self
            .data
            .as_ref()
            .and_then(|data| data.columns.datetime_label())
            .unwrap_or(DEFAULT_DATETIME_LABEL);
        self.sorted_columns = sort_source_columns(item, datetime_label, self.view_state.reverse());
        Ok(())
    }

    /// Order rows by `sort_key` without going through a clicked row. An
    /// empty key is ignored.
    pub fn set_sort_key(&mut self, sort_key: impl Into<String>) -> Result<(), TableError> {
        self.ensure_live()?;
        let sort_key = sort_key.into();
        if sort_key.is_empty() {
            debug!(table_id = %self.table_id, "ignoring empty sort key");
            return Ok(());
        }
        self.view_state.set_sort_key(sort_key);
        Ok(())
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) -> Result<(), TableError> {
        self.ensure_live()?;
        self.view_state.set_items_per_page(items_per_page)?;
        self.update_window();
        Ok(())
    }

    pub fn set_current_page(&mut self, current_page: usize) -> Result<(), TableError> {
        self.ensure_live()?;
        self.view_state.set_current_page(current_page)?;
        self.update_window();
        Ok(())
    }

    pub fn set_search_text(&mut self, search_text: impl Into<String>) -> Result<(), TableError> {
        self.ensure_live()?;
        self.view_state.set_search_text(search_text);
        self.update_window();
        Ok(())
    }

    /// Rows of the current page: search filter, then sort-key order, then window.
    pub fn visible_rows(&self) -> Vec<&Row> {
        let (Some(data), Some(window)) = (self.data.as_ref(), self.window) else {
            return Vec::new();
        };
        let filtered = filter_rows(&data.rows, self.view_state.search_text());
        let ordered = order_rows(filtered, &data.columns, self.view_state.sort_key(), self.view_state.reverse());
        let range = window.index_range();
        let end = range.end.min(ordered.len());
        let start = range.start.min(end);
        ordered[start..end].to_vec()
    }

    fn filtered_len(&self) -> usize {
        self.data
            .as_ref()
            .map(|data| filter_rows(&data.rows, self.view_state.search_text()).len())
            .unwrap_or(0)
    }

    fn update_window(&mut self) {
        if self.data.is_none() {
            return;
        }
        self.window = Some(PageWindow::compute(
            self.filtered_len(),
            self.view_state.current_page(),
            self.view_state.items_per_page(),
        ));
    }

    fn ensure_live(&self) -> Result<(), TableError> {
        if self.status == TableStatus::Destroyed {
            return Err(TableError::Destroyed {
                table_id: self.table_id.clone(),
            });
        }
        Ok(())
    }
}
