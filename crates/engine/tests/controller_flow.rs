use std::sync::{Arc, Mutex};

use agtable_engine::{
    DashboardEvent, LoadOutcome, NotificationSink, PageWindow, QueryError, QueryExecutor, QueryResult, TableController, TableDataAdapter,
    TableIdAllocator, TableSetup, TableStatus,
};
use agtable_types::{Control, Metric, MetricDefinition, SortDirection};
use agtable_util::{InMemoryKeyValueStore, JsonKeyValueStore, KeyValueStore};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::json;

/// Answers each query from a queue of canned results and records the expressions it saw.
#[derive(Default)]
struct ScriptedExecutor {
    answers: Mutex<Vec<Result<QueryResult, QueryError>>>,
    seen: Mutex<Vec<Vec<String>>>,
}

impl ScriptedExecutor {
    fn answering(answers: Vec<Result<QueryResult, QueryError>>) -> Arc<Self> {
        let mut answers = answers;
        answers.reverse();
        Arc::new(Self {
            answers: Mutex::new(answers),
            seen: Mutex::default(),
        })
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn query(&self, expressions: &[String]) -> Result<QueryResult, QueryError> {
        self.seen.lock().unwrap().push(expressions.to_vec());
        self.answers.lock().unwrap().pop().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct RecordingNotifier(Mutex<Vec<String>>);

impl NotificationSink for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

fn series(name: &str, points: usize) -> Metric {
    Metric {
        scope: "system".into(),
        metric: name.into(),
        datapoints: (0..points)
            .map(|index| ((1_700_000_000_000i64 + index as i64 * 60_000).to_string(), json!(index * 10)))
            .collect(),
        ..Metric::default()
    }
}

fn setup(controls: Vec<Control>) -> TableSetup {
    let mut metrics = IndexMap::new();
    metrics.insert(
        "cpu".to_string(),
        MetricDefinition {
            expression: "$start$:system:cpu:avg".into(),
        },
    );
    TableSetup {
        dashboard_id: "7".into(),
        existing_table_id: None,
        metrics,
        controls,
    }
}

struct Harness {
    table: TableController,
    executor: Arc<ScriptedExecutor>,
    notifier: Arc<RecordingNotifier>,
}

fn mount(store: Arc<dyn KeyValueStore>, controls: Vec<Control>, answers: Vec<Result<QueryResult, QueryError>>) -> Harness {
    let executor = ScriptedExecutor::answering(answers);
    let notifier = Arc::new(RecordingNotifier::default());
    let adapter = TableDataAdapter::new(executor.clone(), notifier.clone());
    let table = TableController::mount(setup(controls), store, adapter, Arc::new(TableIdAllocator::new()));
    Harness { table, executor, notifier }
}

fn json_store(dir: &tempfile::TempDir) -> Arc<dyn KeyValueStore> {
    Arc::new(JsonKeyValueStore::new(dir.path().join("preferences.json")).unwrap())
}

#[tokio::test]
async fn mount_restores_defaults_and_detects_gmt() {
    let dir = tempfile::tempdir().unwrap();
    let controls = vec![Control::new("agDate", "start", "2023-01-01T00:00Z")];
    let mut harness = mount(json_store(&dir), controls, vec![Ok(vec![series("cpu", 2)])]);

    assert!(harness.table.gmt());
    assert_eq!(harness.table.status(), TableStatus::ReadyEmpty);
    assert_eq!(harness.table.view_state().current_page(), 1);
    assert_eq!(harness.table.view_state().search_text(), "");
    assert_eq!(harness.table.view_state().reverse(), SortDirection::Ascending);

    assert_eq!(harness.table.refresh().await.unwrap(), TableStatus::Loaded);
    assert_eq!(harness.executor.seen.lock().unwrap().as_slice(), [vec!["2023-01-01T00:00Z:system:cpu:avg".to_string()]]);
    let first = harness.table.visible_rows()[0];
    assert!(first["datetime"].as_str().unwrap().ends_with(" GMT"));
}

#[tokio::test]
async fn empty_result_keeps_the_table_hidden() {
    let mut harness = mount(Arc::new(InMemoryKeyValueStore::new()), Vec::new(), vec![Ok(Vec::new())]);

    let pending = harness.table.begin_load().unwrap();
    let outcome = harness.table.adapter().load(&pending.expressions, pending.gmt).await;
    assert_eq!(
        outcome,
        LoadOutcome::Empty {
            expressions: vec!["$start$:system:cpu:avg".to_string()]
        }
    );
    assert!(harness.table.apply_outcome(pending.request_id, outcome));
    assert!(!harness.table.is_loaded());
    assert!(harness.notifier.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn last_page_window_is_partial() {
    let mut harness = mount(Arc::new(InMemoryKeyValueStore::new()), Vec::new(), vec![Ok(vec![series("cpu", 23)])]);
    harness.table.refresh().await.unwrap();

    harness.table.set_items_per_page(10).unwrap();
    harness.table.set_current_page(3).unwrap();
    assert_eq!(harness.table.window(), Some(PageWindow { start: 21, end: 23 }));

    let values: Vec<_> = harness.table.visible_rows().iter().map(|row| row["value0"].clone()).collect();
    assert_eq!(values, vec![json!(200), json!(210), json!(220)]);
}

#[tokio::test]
async fn search_narrows_the_window_total() {
    let mut harness = mount(Arc::new(InMemoryKeyValueStore::new()), Vec::new(), vec![Ok(vec![series("cpu", 23)])]);
    harness.table.refresh().await.unwrap();

    harness.table.set_search_text("220").unwrap();
    assert_eq!(harness.table.window(), Some(PageWindow { start: 1, end: 1 }));
    assert_eq!(harness.table.visible_rows()[0]["value0"], json!(220));
    assert_eq!(harness.table.page_count(), 1);
}

#[tokio::test]
async fn stale_response_is_discarded() {
    let mut harness = mount(
        Arc::new(InMemoryKeyValueStore::new()),
        Vec::new(),
        vec![Ok(vec![series("cpu", 5)]), Ok(vec![series("cpu", 2)])],
    );

    let slow = harness.table.begin_load().unwrap();
    let slow_outcome = harness.table.adapter().load(&slow.expressions, slow.gmt).await;
    let fast = harness.table.resubmit(vec![Control::new("agDate", "start", "-2h")]).unwrap();
    let fast_outcome = harness.table.adapter().load(&fast.expressions, fast.gmt).await;

    assert!(harness.table.apply_outcome(fast.request_id, fast_outcome));
    assert!(!harness.table.apply_outcome(slow.request_id, slow_outcome));
    assert_eq!(harness.table.data().unwrap().rows.len(), 2);
}

#[tokio::test]
async fn response_after_destroy_is_ignored() {
    let mut harness = mount(Arc::new(InMemoryKeyValueStore::new()), Vec::new(), vec![Ok(vec![series("cpu", 3)])]);

    let pending = harness.table.begin_load().unwrap();
    let outcome = harness.table.adapter().load(&pending.expressions, pending.gmt).await;
    harness.table.handle_event(DashboardEvent::Destroy).await.unwrap();

    assert!(!harness.table.apply_outcome(pending.request_id, outcome));
    assert_eq!(harness.table.status(), TableStatus::Destroyed);
    assert!(harness.table.data().is_none());
}

#[tokio::test]
async fn submit_clears_rows_and_queries_again() {
    let mut harness = mount(
        Arc::new(InMemoryKeyValueStore::new()),
        vec![Control::new("agDate", "start", "-1h")],
        vec![Ok(vec![series("cpu", 4)]), Ok(Vec::new())],
    );
    harness.table.refresh().await.unwrap();
    assert!(harness.table.is_loaded());

    let status = harness
        .table
        .handle_event(DashboardEvent::Submit {
            controls: vec![Control::new("agDate", "start", "-6h")],
        })
        .await
        .unwrap();

    assert_eq!(status, TableStatus::ReadyEmpty);
    assert!(harness.table.data().is_none());
    let seen = harness.executor.seen.lock().unwrap();
    assert_eq!(seen[1], vec!["-6h:system:cpu:avg".to_string()]);
}

#[tokio::test]
async fn failure_is_reported_once_to_the_user() {
    let mut harness = mount(
        Arc::new(InMemoryKeyValueStore::new()),
        Vec::new(),
        vec![Err(QueryError::Status {
            status: 400,
            message: "Illegal expression".into(),
        })],
    );

    assert_eq!(harness.table.refresh().await.unwrap(), TableStatus::ReadyEmpty);
    assert_eq!(harness.notifier.0.lock().unwrap().as_slice(), ["Illegal expression".to_string()]);
}

#[tokio::test]
async fn view_choices_survive_a_remount() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut harness = mount(json_store(&dir), Vec::new(), Vec::new());
        harness.table.set_items_per_page(25).unwrap();
        harness.table.set_current_page(2).unwrap();
        harness.table.set_search_text("cpu").unwrap();
        let header = [("timestamp".to_string(), json!("timestamp"))].into_iter().collect();
        harness.table.sort(&header).unwrap();
        harness.table.destroy();
    }

    let harness = mount(json_store(&dir), Vec::new(), Vec::new());
    let state = harness.table.view_state();
    assert_eq!(harness.table.table_id(), "element_table1");
    assert_eq!(state.items_per_page(), 25);
    assert_eq!(state.current_page(), 2);
    assert_eq!(state.search_text(), "cpu");
    assert_eq!(state.sort_key(), "timestamp");
    assert_eq!(state.reverse(), SortDirection::Descending);
}

#[tokio::test]
async fn default_choices_are_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = json_store(&dir);
    let mut harness = mount(store.clone(), Vec::new(), Vec::new());

    harness.table.set_items_per_page(50).unwrap();
    harness.table.set_items_per_page(10).unwrap();
    assert_eq!(store.get("7_element_table1-itemsPerPage").unwrap(), None);
}
