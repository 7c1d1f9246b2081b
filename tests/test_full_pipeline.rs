//! Integration test: Full pipeline (load → clean → summarize → train → chart)

use chrono::NaiveDate;
use std::path::Path;
use tabflow::pipeline::{Pipeline, PipelineConfig, Stage};
use tabflow::training::TaskKind;
use tabflow::TabflowError;

const SALES_CSV: &str = "\
order_date,region,units,revenue
2024-01-05,north,3,30.5
2024-01-12,south,5,50.0
2024-01-12,south,5,50.0
2024-02-02,north,NA,21.0
2024-02-15,east,7,70.2
2024-03-01,south,4,40.1
2024-03-09,east,6,60.0
2024-03-20,north,2,20.3
2024-04-04,south,8,80.4
2024-04-18,east,9,90.0
2024-05-02,north,1,10.2
2024-05-21,east,10,99.9
";

fn write_sales(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("sales.csv");
    std::fs::write(&path, SALES_CSV).unwrap();
    path
}

#[test]
fn test_pipeline_with_regression_target() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_sales(dir.path());
    let charts = dir.path().join("charts");

    let config = PipelineConfig::new(&data)
        .with_target("revenue")
        .with_output_dir(&charts)
        .with_random_seed(7);
    let outcome = Pipeline::new(config).run().unwrap();

    assert_eq!(outcome.cleaning.duplicates_removed, 1);
    assert_eq!(outcome.cleaning.filled.get("units"), Some(&1));
    assert_eq!(outcome.summary.row_count, 11);
    assert_eq!(outcome.cleaned.column("units").unwrap().null_count(), 0);

    let result = outcome.training.completed().unwrap();
    assert_eq!(result.task, TaskKind::Regression);
    assert_eq!(result.target_column, "revenue");

    assert!(charts.join("prediction_comparison.png").exists());
    // No plot columns configured: the first numeric column is charted
    assert!(charts.join("units_trend.png").exists());
}

#[test]
fn test_pipeline_with_classification_target() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_sales(dir.path());

    let mut config = PipelineConfig::new(&data)
        .with_target("region")
        .with_output_dir(dir.path().join("charts"))
        .with_random_seed(1)
        .with_plot_column("region");
    config.n_estimators = 15;
    let outcome = Pipeline::new(config).run().unwrap();

    let result = outcome.training.completed().unwrap();
    assert_eq!(result.task, TaskKind::Classification);
    assert!((0.0..=1.0).contains(&result.score));
    assert!(dir.path().join("charts").join("region_bar.png").exists());
}

#[test]
fn test_pipeline_without_target_still_charts() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_sales(dir.path());

    let config = PipelineConfig::new(&data).with_output_dir(dir.path());
    let outcome = Pipeline::new(config).run().unwrap();

    assert!(matches!(outcome.training, Stage::Skipped(_)));
    assert!(matches!(outcome.comparison_chart, Stage::Skipped(_)));
    assert_eq!(outcome.written_charts().len(), 1);
}

#[test]
fn test_pipeline_date_range_filter() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_sales(dir.path());

    let config = PipelineConfig::new(&data)
        .with_output_dir(dir.path())
        .with_date_range(
            "order_date",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        );
    let outcome = Pipeline::new(config).run().unwrap();
    assert_eq!(outcome.summary.row_count, 5);
}

#[test]
fn test_pipeline_filters_removing_everything() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_sales(dir.path());

    let config = PipelineConfig::new(&data)
        .with_output_dir(dir.path())
        .with_category_filter("region", "west");
    assert!(matches!(
        Pipeline::new(config).run(),
        Err(TabflowError::DataError(_))
    ));
}

#[test]
fn test_pipeline_training_failure_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_sales(dir.path());

    let config = PipelineConfig::new(&data)
        .with_target("profit")
        .with_output_dir(dir.path());
    let outcome = Pipeline::new(config).run().unwrap();

    assert!(matches!(
        outcome.training,
        Stage::Failed(TabflowError::TrainingError(_))
    ));
    // Column charts still render
    assert!(!outcome.charts.is_empty());
    assert!(outcome.charts.iter().all(|(_, s)| s.completed().is_some()));
}

#[test]
fn test_pipeline_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new(dir.path().join("absent.csv"));
    assert!(matches!(
        Pipeline::new(config).run(),
        Err(TabflowError::LoadError(_))
    ));
}

#[test]
fn test_pipeline_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_sales(dir.path());
    let config_path = dir.path().join("pipeline.json");
    let json = format!(
        r#"{{"data_path": {:?}, "target_column": "revenue", "output_dir": {:?}, "random_seed": 3}}"#,
        data.to_str().unwrap(),
        dir.path().join("out").to_str().unwrap()
    );
    std::fs::write(&config_path, json).unwrap();

    let config = PipelineConfig::load(&config_path).unwrap();
    let outcome = Pipeline::new(config).run().unwrap();
    assert!(outcome.training.completed().is_some());
    assert!(dir.path().join("out").join("prediction_comparison.png").exists());
}
