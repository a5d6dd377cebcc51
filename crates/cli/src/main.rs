use std::sync::Arc;

use agtable_api::ArgusClient;
use agtable_engine::{
    HttpQueryExecutor, MetricRowMaterializer, TableController, TableDataAdapter, TableIdAllocator, TableSetup, TableStatus, TracingNotifier,
};
use agtable_types::{Control, DEFAULT_DATETIME_LABEL, MetricDefinition, Row, cell_text};
use agtable_util::{InMemoryKeyValueStore, JsonKeyValueStore, KeyValueStore};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use indexmap::IndexMap;
use tracing::warn;

/// Query metric expressions and print one page of the resulting table.
#[derive(Debug, Parser)]
#[command(name = "agtable", version, about)]
struct Args {
    /// Metric web service base URL; defaults to ARGUS_WS_URL.
    #[arg(long)]
    ws_url: Option<String>,

    /// Dashboard the table belongs to; scopes persisted preferences.
    #[arg(long, default_value = "default")]
    dashboard_id: String,

    /// Reuse an existing table identity instead of allocating one.
    #[arg(long)]
    table_id: Option<String>,

    /// Metric as `key=expression`; repeat for several series.
    #[arg(long = "metric", value_name = "KEY=EXPRESSION", required = true, value_parser = parse_metric)]
    metrics: Vec<(String, MetricDefinition)>,

    /// Dashboard control as `type:name:value`, e.g. `agDate:start:-1h`.
    #[arg(long = "control", value_name = "TYPE:NAME:VALUE", value_parser = parse_control)]
    controls: Vec<Control>,

    #[arg(long)]
    page: Option<usize>,

    #[arg(long)]
    items_per_page: Option<usize>,

    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    sort_key: Option<String>,

    /// Header of the formatted date column.
    #[arg(long, default_value = DEFAULT_DATETIME_LABEL)]
    datetime_label: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let client = match &args.ws_url {
        Some(url) => ArgusClient::new(url),
        None => ArgusClient::new_from_env(),
    }
    .context("failed to configure the metric web service client")?;

    let adapter = TableDataAdapter::new(Arc::new(HttpQueryExecutor::new(client)), Arc::new(TracingNotifier))
        .with_materializer(Arc::new(MetricRowMaterializer::new(args.datetime_label.clone())));

    let setup = TableSetup {
        dashboard_id: args.dashboard_id.clone(),
        existing_table_id: args.table_id.clone(),
        metrics: args.metrics.iter().cloned().collect::<IndexMap<_, _>>(),
        controls: args.controls.clone(),
    };
    let mut table = TableController::mount(setup, open_store(), adapter, Arc::new(TableIdAllocator::new()));

    if let Some(items_per_page) = args.items_per_page {
        table.set_items_per_page(items_per_page)?;
    }
    if let Some(page) = args.page {
        table.set_current_page(page)?;
    }
    if let Some(search) = &args.search {
        table.set_search_text(search.as_str())?;
    }
    if let Some(sort_key) = &args.sort_key {
        table.set_sort_key(sort_key.as_str())?;
    }

    if table.refresh().await? != TableStatus::Loaded {
        println!("No data");
        return Ok(());
    }
    print_page(&table);
    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Preferences file from the environment, or a session-only store when it cannot be opened.
fn open_store() -> Arc<dyn KeyValueStore> {
    match JsonKeyValueStore::with_defaults() {
        Ok(store) => Arc::new(store),
        Err(error) => {
            warn!(%error, "preferences unavailable; view choices will not be remembered");
            Arc::new(InMemoryKeyValueStore::new())
        }
    }
}

fn print_page(table: &TableController) {
    let Some(data) = table.data() else {
        return;
    };
    println!("{}", render_row(&data.columns.header_row(), data));
    for row in table.visible_rows() {
        println!("{}", render_row(row, data));
    }
    if let Some(window) = table.window() {
        println!(
            "rows {}-{} (page {} of {})",
            window.start,
            window.end,
            table.view_state().current_page(),
            table.page_count()
        );
    }
}

fn render_row(row: &Row, data: &agtable_types::TableData) -> String {
    data.columns
        .iter()
        .map(|column| row.get(&column.key).map(cell_text).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\t")
}

fn parse_metric(raw: &str) -> Result<(String, MetricDefinition)> {
    let (key, expression) = raw.split_once('=').ok_or_else(|| anyhow!("expected KEY=EXPRESSION, got '{raw}'"))?;
    let (key, expression) = (key.trim(), expression.trim());
    if key.is_empty() || expression.is_empty() {
        anyhow::bail!("metric key and expression must not be empty: '{raw}'");
    }
    Ok((
        key.to_string(),
        MetricDefinition {
            expression: expression.to_string(),
        },
    ))
}

fn parse_control(raw: &str) -> Result<Control> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(name), Some(value)) if !kind.is_empty() && !name.is_empty() => Ok(Control::new(kind, name, value)),
        _ => Err(anyhow!("expected TYPE:NAME:VALUE, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_flag_splits_on_first_equals() {
        let (key, metric) = parse_metric("cpu=-1h:system:cpu{host=a}:avg").unwrap();
        assert_eq!(key, "cpu");
        assert_eq!(metric.expression, "-1h:system:cpu{host=a}:avg");
        assert!(parse_metric("cpu").is_err());
        assert!(parse_metric("=expr").is_err());
    }

    #[test]
    fn control_value_may_contain_colons() {
        let control = parse_control("agDate:start:2023-01-01T00:00:00Z").unwrap();
        assert_eq!(control, Control::new("agDate", "start", "2023-01-01T00:00:00Z"));
        assert!(parse_control("agDate:start").is_err());
    }

    #[test]
    fn args_parse_repeatable_flags() {
        let args = Args::try_parse_from([
            "agtable",
            "--metric",
            "a=$start$:s:m:avg",
            "--metric",
            "b=$start$:s:n:avg",
            "--control",
            "agDate:start:-1h",
            "--items-per-page",
            "25",
        ])
        .unwrap();
        assert_eq!(args.metrics.len(), 2);
        assert_eq!(args.controls.len(), 1);
        assert_eq!(args.items_per_page, Some(25));
        assert_eq!(args.datetime_label, "Date");
        assert_eq!(args.dashboard_id, "default");
    }
}
