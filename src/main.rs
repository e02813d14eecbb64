use analytics::{
    AgingSummary, AnalyticsEngine, DashboardReport, ForecastSummary, FunnelSummary, HealthScore,
    Magnitude,
};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use configuration::{load_config, AnalyticsConfig};
use core_types::{Record, Trend};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the Bizlytics dashboard tool.
fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let engine = build_engine(cli.config.as_deref())?;

    match cli.command {
        Commands::Aging(args) => {
            let records = load_records(&args.records)?;
            let summary = engine.aging(&records, args.reference_date());
            emit(cli.json, &summary, render_aging)?;
        }
        Commands::Funnel(args) => {
            let records = load_records(&args.records)?;
            let summary = engine.funnel(&records, args.as_of);
            emit(cli.json, &summary, |s| render_funnel(s, &engine))?;
        }
        Commands::Forecast(args) => {
            let records = load_records(&args.records)?;
            let summary = engine.forecast(&records)?;
            emit(cli.json, &summary, render_forecast)?;
        }
        Commands::Report(args) => {
            let records = load_records(&args.snapshot.records)?;
            let extra: BTreeMap<String, Decimal> = args.metrics.into_iter().collect();
            let report = engine.dashboard(&records, args.snapshot.reference_date(), &extra)?;
            emit(cli.json, &report, |r| render_report(r, &engine))?;
        }
    }

    Ok(())
}

/// `RUST_LOG` directives, or `info` when none are set.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::new(directives.filter(|d| !d.trim().is_empty()).unwrap_or("info"))
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Aging, funnel, forecast and health summaries from a record snapshot.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with analytics settings. Built-in defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the summary as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bucket outstanding receivables by days overdue.
    Aging(SnapshotArgs),
    /// Stage counts, conversion rates and trends.
    Funnel(SnapshotArgs),
    /// Probability-weighted revenue from the open pipeline.
    Forecast(SnapshotArgs),
    /// Every analyzer plus the composite health score.
    Report(ReportArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// JSON file containing an array of records.
    #[arg(long)]
    records: PathBuf,

    /// Reference date for the analysis (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

impl SnapshotArgs {
    fn reference_date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Args)]
struct ReportArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Extra or overriding health metric, as `name=value`. Repeatable.
    #[arg(long = "metric", value_parser = parse_metric)]
    metrics: Vec<(String, Decimal)>,
}

fn parse_metric(raw: &str) -> Result<(String, Decimal), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let value = Decimal::from_str(value.trim())
        .map_err(|e| format!("invalid value for metric '{name}': {e}"))?;
    Ok((name.trim().to_string(), value))
}

// ==============================================================================
// Loading
// ==============================================================================

fn build_engine(config_path: Option<&Path>) -> Result<AnalyticsEngine> {
    let config = match config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };
    AnalyticsEngine::from_config(&config).context("Invalid analytics configuration")
}

fn load_records(path: &Path) -> Result<Vec<Record>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    let records: Vec<Record> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse records in {}", path.display()))?;
    tracing::info!(count = records.len(), path = %path.display(), "Loaded records");
    Ok(records)
}

fn emit<T: serde::Serialize>(json: bool, value: &T, render: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", render(value));
    }
    Ok(())
}

// ==============================================================================
// Rendering
// ==============================================================================

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header.to_vec());
    table
}

fn right(text: impl ToString) -> Cell {
    Cell::new(text.to_string()).set_alignment(CellAlignment::Right)
}

fn optional(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Amount expressed in `unit`, with a K/M/B suffix.
fn compact(amount: Decimal, unit: Magnitude) -> String {
    let suffix = match unit {
        Magnitude::Units => "",
        Magnitude::Thousands => "K",
        Magnitude::Millions => "M",
        Magnitude::Billions => "B",
    };
    format!("{}{suffix}", unit.scale(amount).round_dp(2))
}

fn trend_marker(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => "up",
        Trend::Down => "down",
        Trend::Stable => "stable",
    }
}

fn render_aging(summary: &AgingSummary) -> String {
    let unit = summary.amount_magnitude;
    let mut table = new_table(&["Bucket", "Records", "Amount"]);
    for bucket in &summary.buckets {
        table.add_row(vec![
            Cell::new(&bucket.label),
            right(bucket.count),
            right(compact(bucket.amount, unit)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total"),
        right(summary.total_records),
        right(compact(summary.total_amount, unit)),
    ]);

    format!(
        "Aging as of {}\n{table}\nOverdue: {} ({}%), weighted days overdue: {}, excluded: {} ({})",
        summary.reference_date,
        compact(summary.overdue_amount, unit),
        optional(summary.overdue_ratio_pct().map(|p| p.round_dp(2))),
        optional(summary.weighted_average_days_overdue),
        summary.count_excluded,
        compact(summary.excluded_amount, Magnitude::of(summary.excluded_amount)),
    )
}

fn render_funnel(summary: &FunnelSummary, engine: &AnalyticsEngine) -> String {
    let largest = summary.stages.iter().map(|s| s.amount).max().unwrap_or_default();
    let unit = Magnitude::of(largest);
    let mut table = new_table(&["Stage", "Records", "Amount", "Conversion %", "Avg dwell", "Trend"]);
    for stage in &summary.stages {
        let conversion = if stage.insufficient_data {
            "n/a".to_string()
        } else {
            optional(stage.conversion_to_next)
        };
        table.add_row(vec![
            Cell::new(stage.stage.as_str()),
            right(stage.count),
            right(compact(stage.amount, unit)),
            right(conversion),
            right(optional(stage.avg_dwell_days)),
            Cell::new(trend_marker(stage.trend)),
        ]);
    }

    let mut out = format!(
        "{table}\nOverall conversion: {}%, excluded: {}",
        optional(summary.overall_conversion_pct()),
        summary.count_excluded
    );
    for pipeline_break in engine.pipeline_breaks(summary) {
        out.push_str(&format!(
            "\nBottleneck: {} -> {} converts at {}%",
            pipeline_break.from, pipeline_break.to, pipeline_break.conversion_pct
        ));
    }
    out
}

fn render_forecast(summary: &ForecastSummary) -> String {
    let unit = summary.amount_magnitude;
    let mut table = new_table(&["Stage", "Records", "Pipeline", "Probability", "Weighted"]);
    for stage in &summary.per_stage {
        table.add_row(vec![
            Cell::new(stage.stage.as_str()),
            right(stage.record_count),
            right(compact(stage.raw_amount, unit)),
            right(stage.win_probability),
            right(compact(stage.weighted_amount, unit)),
        ]);
    }

    format!(
        "{table}\nPredicted: {} of {} open pipeline ({} records, confidence {})",
        compact(summary.predicted_total, unit),
        compact(summary.pipeline_total, unit),
        summary.open_records,
        summary.confidence_level
    )
}

fn render_health(health: &HealthScore) -> String {
    let mut table = new_table(&["Dimension", "Raw", "Score", "Weight"]);
    for dimension in &health.dimensions {
        table.add_row(vec![
            Cell::new(&dimension.name),
            right(dimension.raw_value.round_dp(2)),
            right(dimension.score.round_dp(2)),
            right(dimension.weight),
        ]);
    }
    format!("{table}\nHealth: {} ({})", health.overall_score, health.tier)
}

fn render_report(report: &DashboardReport, engine: &AnalyticsEngine) -> String {
    [
        render_aging(&report.aging),
        render_funnel(&report.funnel, engine),
        render_forecast(&report.forecast),
        render_health(&report.health),
    ]
    .join("\n\n")
}
