//! tabflow CLI Module
//!
//! Command-line interface for the batch pipeline and its individual stages.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::pipeline::{Pipeline, PipelineConfig, PipelineOutcome, Stage};
use crate::preprocessing::{clean_with_report, summarize, CleaningReport, Summary};
use crate::training::{TaskKind, TrainEngine, TrainResult, TrainingConfig};
use crate::utils::{DataLoader, DataSaver};
use crate::visualization::{ChartKind, ChartRenderer, RenderConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(235, 180, 80) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_fail(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

fn step_skip(msg: &str) {
    println!("  {} {}", warn("–"), muted(msg));
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn print_banner() {
    println!();
    println!("  {}  {}", "tabflow".truecolor(120, 170, 255).bold(), dim(&format!("v{}", env!("CARGO_PKG_VERSION"))));
    println!("  {}", dim("load · clean · model · chart"));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tabflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Load, clean, model and chart a CSV table")]
#[command(long_about = None)]
pub struct Cli {
    /// Options for the full pipeline (used when no subcommand is given)
    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Full-pipeline options; each flag overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Input CSV (default: data/sales.csv)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Target column to predict; training is skipped without one
    #[arg(short, long)]
    pub target: Option<String>,

    /// Column holding dates, used by --date-from/--date-to
    #[arg(long)]
    pub date_column: Option<String>,

    /// Keep rows on or after this date (YYYY-MM-DD)
    #[arg(long, requires = "date_column")]
    pub date_from: Option<NaiveDate>,

    /// Keep rows on or before this date (YYYY-MM-DD)
    #[arg(long, requires = "date_column")]
    pub date_to: Option<NaiveDate>,

    /// Keep rows where COLUMN equals VALUE
    #[arg(long = "where", value_name = "COLUMN=VALUE")]
    pub filter: Option<String>,

    /// Directory for chart files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seed for a reproducible split and forest
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON pipeline configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Column to chart (repeatable); default is the first numeric column
    #[arg(long = "plot", value_name = "COLUMN")]
    pub plot: Vec<String>,
}

impl RunArgs {
    /// Merge the optional config file with command-line overrides
    pub fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(data) = self.data {
            config.data_path = data;
        }
        if let Some(target) = self.target {
            config.target_column = Some(target);
        }
        if let Some(date_column) = self.date_column {
            config.date_column = Some(date_column);
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let start = self.date_from.unwrap_or(NaiveDate::MIN);
            let end = self.date_to.unwrap_or(NaiveDate::MAX);
            config.date_range = Some(crate::pipeline::DateRange { start, end });
        }
        if let Some(filter) = self.filter {
            let (column, value) = filter
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("--where expects COLUMN=VALUE, got '{}'", filter))?;
            config.category_filter = Some(crate::pipeline::CategoryFilter {
                column: column.trim().to_string(),
                value: value.to_string(),
            });
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
        if !self.plot.is_empty() {
            config.plot_columns = self.plot;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a dataset summary
    Info {
        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Drop duplicates, impute missing values and write the result
    Clean {
        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Train a model on the cleaned data and chart its predictions
    Train {
        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Seed for a reproducible split and forest
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for the comparison chart
        #[arg(short, long, default_value = "charts")]
        output_dir: PathBuf,
    },

    /// Chart one column
    Plot {
        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Column to chart
        #[arg(short, long)]
        column: String,

        /// Chart kind (auto, line, bar)
        #[arg(short, long, default_value = "auto")]
        kind: ChartKind,

        /// Directory for the chart
        #[arg(short, long, default_value = "charts")]
        output_dir: PathBuf,
    },
}

// ─── Shared printing ───────────────────────────────────────────────────────────

fn load_data(path: &Path) -> anyhow::Result<DataFrame> {
    step_run(&format!("Loading {}", path.display()));
    let start = Instant::now();
    let df = DataLoader::new().load_auto(path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));
    Ok(df)
}

fn print_cleaning(report: &CleaningReport) {
    println!("  {:<20} {}", muted("Duplicates removed"), report.duplicates_removed);
    println!("  {:<20} {}", muted("Cells filled"), report.total_filled());
    for (column, n) in &report.filled {
        println!("    {:<18} {}", dim(column), n);
    }
    for column in &report.unresolved_columns {
        println!("  {} {}", warn("!"), format!("'{}' has no values; left as missing", column).yellow());
    }
}

fn print_summary(summary: &Summary) {
    section("Summary");

    println!("  {:<12} {}", muted("Rows"), summary.row_count);
    println!("  {:<12} {}", muted("Columns"), summary.column_count);
    println!();

    println!(
        "  {:<18} {:<12} {:>6} {:>6} {:>12} {:>12} {:>12}",
        muted("Column"),
        muted("Type"),
        muted("Count"),
        muted("Nulls"),
        muted("Mean/Top"),
        muted("Min/Uniq"),
        muted("Max/Freq")
    );
    println!("  {}", dim(&"─".repeat(84)));

    let fmt = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());
    for col in &summary.columns {
        let (a, b, c) = if col.dtype.is_numeric() {
            (fmt(col.mean), fmt(col.min), fmt(col.max))
        } else {
            (
                col.top.clone().unwrap_or_else(|| "-".to_string()),
                col.unique.map(|u| u.to_string()).unwrap_or_else(|| "-".to_string()),
                col.freq.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string()),
            )
        };
        println!(
            "  {:<18} {:<12} {:>6} {:>6} {:>12} {:>12} {:>12}",
            col.name,
            format!("{:?}", col.dtype).truecolor(140, 140, 140),
            col.count,
            col.null_count,
            a,
            b,
            c
        );
    }
}

fn print_training(result: &TrainResult) {
    println!("  {:<16} {}", muted("Target"), result.target_column.white());
    println!("  {:<16} {}", muted("Task"), result.task.to_string().cyan());
    println!("  {:<16} {}", muted("Model"), result.model.name());
    println!(
        "  {:<16} {}",
        muted(result.task.metric_name()),
        format!("{:.4}", result.score).white().bold()
    );

    let m = &result.metrics;
    match result.task {
        TaskKind::Regression => {
            if let (Some(rmse), Some(mae)) = (m.rmse, m.mae) {
                println!("  {:<16} {:.4}", muted("RMSE"), rmse);
                println!("  {:<16} {:.4}", muted("MAE"), mae);
            }
        }
        TaskKind::Classification => {
            if let (Some(p), Some(r), Some(f1)) = (m.precision, m.recall, m.f1_score) {
                println!("  {:<16} {:.4} / {:.4} / {:.4}", muted("Prec/Rec/F1"), p, r, f1);
            }
        }
    }
    println!(
        "  {:<16} {} train / {} test",
        muted("Split"),
        m.n_train,
        m.n_test
    );
    println!("  {:<16} {:.3}s", muted("Time"), m.training_time_secs);
}

fn print_chart(label: &str, stage: &Stage<PathBuf>) {
    match stage {
        Stage::Completed(path) => step_ok(&format!("{} → {}", label, path.display())),
        Stage::Skipped(reason) => step_skip(&format!("{}: {}", label, reason)),
        Stage::Failed(e) => step_fail(&format!("{}: {}", label, e)),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Full pipeline; a missing input file is reported and is not an error
pub fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    print_banner();
    let config = args.into_config()?;

    section("Data");
    if !config.data_path.exists() {
        println!(
            "  {} {}",
            warn("!"),
            format!(
                "Dataset not found at {}. Add the file or pass --data.",
                config.data_path.display()
            )
            .yellow()
        );
        println!();
        return Ok(());
    }

    let df = load_data(&config.data_path)?;

    step_run("Cleaning and training");
    let start = Instant::now();
    let pipeline = Pipeline::new(config);
    let outcome = pipeline.run_frame(&df)?;
    step_done(&format!("{:?}", start.elapsed()));
    print_cleaning(&outcome.cleaning);

    print_summary(&outcome.summary);
    print_outcome(&outcome);

    println!();
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    section("Model");
    match &outcome.training {
        Stage::Completed(result) => print_training(result),
        Stage::Skipped(reason) => step_skip(&format!("Training skipped: {} (use --target)", reason)),
        Stage::Failed(e) => step_fail(&format!("Training failed: {}", e)),
    }

    section("Charts");
    print_chart("Prediction comparison", &outcome.comparison_chart);
    if outcome.charts.is_empty() {
        step_skip("No numeric column to chart");
    }
    for (column, stage) in &outcome.charts {
        print_chart(column, stage);
    }
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");
    let df = load_data(data_path)?;
    let summary = summarize(&df)?;
    print_summary(&summary);
    println!();
    Ok(())
}

pub fn cmd_clean(data_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    section("Clean");
    let df = load_data(data_path)?;

    step_run("Cleaning");
    let (cleaned, report) = clean_with_report(&df)?;
    step_done(&format!("{} rows remain", cleaned.height()));
    print_cleaning(&report);

    step_run(&format!("Saving → {}", output_path.display()));
    DataSaver::save_csv(&cleaned, output_path)?;
    step_done(&format!("{} rows × {} cols", cleaned.height(), cleaned.width()));

    println!();
    Ok(())
}

pub fn cmd_train(
    data_path: &Path,
    target: &str,
    seed: Option<u64>,
    output_dir: &Path,
) -> anyhow::Result<()> {
    section("Train");
    let df = load_data(data_path)?;
    let (cleaned, _) = clean_with_report(&df)?;

    let mut config = TrainingConfig::new(target);
    config.random_seed = seed;

    step_run(&format!("Training on {}", target.cyan()));
    let result = TrainEngine::new(config).train(&cleaned)?;
    step_done(&format!("{:.3}s", result.metrics.training_time_secs));

    println!();
    print_training(&result);

    let renderer = ChartRenderer::new(RenderConfig::new(output_dir));
    let chart = renderer.plot_comparison(&result.y_test.to_vec(), &result.predictions.to_vec())?;
    println!();
    step_ok(&format!("Comparison chart → {}", chart.display()));
    println!();
    Ok(())
}

pub fn cmd_plot(
    data_path: &Path,
    column: &str,
    kind: ChartKind,
    output_dir: &Path,
) -> anyhow::Result<()> {
    section("Plot");
    let df = load_data(data_path)?;
    let (cleaned, _) = clean_with_report(&df)?;

    let renderer = ChartRenderer::new(RenderConfig::new(output_dir));
    let path = renderer.plot_series_as(&cleaned, column, kind)?;
    step_ok(&format!("{} chart of {} → {}", kind, column.white(), path.display()));
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_pipeline_flags() {
        let cli = Cli::try_parse_from([
            "tabflow",
            "--data",
            "in.csv",
            "--target",
            "units",
            "--seed",
            "3",
            "--plot",
            "units",
            "--plot",
            "region",
        ])
        .unwrap();
        assert!(cli.command.is_none());

        let config = cli.run.into_config().unwrap();
        assert_eq!(config.data_path, PathBuf::from("in.csv"));
        assert_eq!(config.target_column.as_deref(), Some("units"));
        assert_eq!(config.random_seed, Some(3));
        assert_eq!(config.plot_columns, vec!["units", "region"]);
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["tabflow"]).unwrap();
        let config = cli.run.into_config().unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/sales.csv"));
        assert!(config.target_column.is_none());
    }

    #[test]
    fn test_date_and_where_flags() {
        let cli = Cli::try_parse_from([
            "tabflow",
            "--date-column",
            "order_date",
            "--date-from",
            "2024-02-01",
            "--where",
            "region=north",
        ])
        .unwrap();
        let config = cli.run.into_config().unwrap();
        let range = config.date_range.unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(range.end, NaiveDate::MAX);
        let filter = config.category_filter.unwrap();
        assert_eq!((filter.column.as_str(), filter.value.as_str()), ("region", "north"));
    }

    #[test]
    fn test_date_from_requires_column() {
        assert!(Cli::try_parse_from(["tabflow", "--date-from", "2024-01-01"]).is_err());
    }

    #[test]
    fn test_plot_subcommand_kind() {
        let cli = Cli::try_parse_from(["tabflow", "plot", "-d", "x.csv", "-c", "units", "--kind", "bar"])
            .unwrap();
        match cli.command {
            Some(Commands::Plot { kind, column, .. }) => {
                assert_eq!(kind, ChartKind::Bar);
                assert_eq!(column, "units");
            }
            _ => panic!("expected plot subcommand"),
        }
    }

    #[test]
    fn test_missing_input_is_not_an_error() {
        let args = RunArgs {
            data: Some(PathBuf::from("/no/such/dir/sales.csv")),
            ..Default::default()
        };
        assert!(cmd_run(args).is_ok());
    }
}
