use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tabflow::preprocessing::clean;
use tabflow::training::{TrainEngine, TrainingConfig};

fn create_regression_data(n_rows: usize, n_features: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let features: Vec<Vec<f64>> = (0..n_features)
        .map(|_| (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect())
        .collect();

    // Target is the sum of features plus noise
    let target: Vec<f64> = (0..n_rows)
        .map(|i| features.iter().map(|f| f[i]).sum::<f64>() + rng.gen::<f64>() * 0.1)
        .collect();

    let mut columns: Vec<Column> = features
        .into_iter()
        .enumerate()
        .map(|(i, values)| Column::new(format!("feature_{}", i).into(), values))
        .collect();
    columns.push(Column::new("target".into(), target));

    DataFrame::new(columns).unwrap()
}

fn create_classification_data(n_rows: usize, n_features: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let features: Vec<Vec<f64>> = (0..n_features)
        .map(|_| (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect())
        .collect();

    let labels: Vec<&str> = (0..n_rows)
        .map(|i| if features[0][i] + features[1][i] > 10.0 { "high" } else { "low" })
        .collect();

    let mut columns: Vec<Column> = features
        .into_iter()
        .enumerate()
        .map(|(i, values)| Column::new(format!("feature_{}", i).into(), values))
        .collect();
    columns.push(Column::new("label".into(), labels));

    DataFrame::new(columns).unwrap()
}

fn bench_regression(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression");
    group.sample_size(10);

    for n_rows in [1000, 5000, 10000].iter() {
        let df = create_regression_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("train", n_rows), &df, |b, df| {
            b.iter(|| {
                let engine = TrainEngine::new(TrainingConfig::new("target").with_random_seed(0));
                engine.train(black_box(df)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_forest");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let df = create_classification_data(*n_rows, 6);

        group.bench_with_input(BenchmarkId::new("train", n_rows), &df, |b, df| {
            b.iter(|| {
                let config = TrainingConfig::new("label")
                    .with_random_seed(0)
                    .with_n_estimators(50);
                TrainEngine::new(config).train(black_box(df)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train once
    let train_df = create_regression_data(5000, 10);
    let engine = TrainEngine::new(TrainingConfig::new("target").with_random_seed(0));
    let result = engine.train(&train_df).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let test_df = create_regression_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("predict", n_rows), &test_df, |b, df| {
            b.iter(|| result.predict(black_box(df)).unwrap())
        });
    }

    group.finish();
}

fn bench_cleaning(c: &mut Criterion) {
    let mut group = c.benchmark_group("cleaning");

    for n_rows in [1000, 10000].iter() {
        let df = create_classification_data(*n_rows, 6);

        group.bench_with_input(BenchmarkId::new("clean", n_rows), &df, |b, df| {
            b.iter(|| clean(black_box(df)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_regression, bench_forest, bench_prediction, bench_cleaning);
criterion_main!(benches);
