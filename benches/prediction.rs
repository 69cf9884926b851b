use cab_risk::features::{BookingRecord, Feature, FeatureVectorBuilder, RiskProfile};
use cab_risk::inference::{LogisticModel, PredictionService, PredictorConfig};
use cab_risk::preprocessing::DataQualityProcessor;
use cab_risk::utils::generate_sample_data;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn create_service(config: PredictorConfig) -> PredictionService {
    let names: Vec<String> = Feature::ALL.iter().map(|f| f.name().to_string()).collect();
    let coefficients: Vec<f64> = (0..names.len()).map(|i| (i as f64 - 9.0) / 100.0).collect();
    let model = LogisticModel::new(coefficients, -1.5).with_feature_names(names);
    PredictionService::from_parts(Arc::new(model), None, config).unwrap()
}

fn bench_single(c: &mut Criterion) {
    let service = create_service(PredictorConfig::default());
    let builder = FeatureVectorBuilder::default();
    let record = BookingRecord::sample(RiskProfile::HighRisk);

    c.bench_function("build_features", |b| b.iter(|| builder.build(black_box(&record))));
    c.bench_function("predict_one", |b| {
        b.iter(|| service.predict_one(black_box(&record)).unwrap())
    });
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_batch");
    group.sample_size(20);

    for n_rows in [1_000, 10_000, 50_000].iter() {
        let df = generate_sample_data(*n_rows, 42).unwrap();

        let sequential = create_service(PredictorConfig::new().with_n_workers(1));
        group.bench_with_input(BenchmarkId::new("sequential", n_rows), &df, |b, df| {
            b.iter(|| sequential.predict_batch(black_box(df)).unwrap())
        });

        let parallel = create_service(PredictorConfig::new().with_batch_size(2_000));
        group.bench_with_input(BenchmarkId::new("parallel", n_rows), &df, |b, df| {
            b.iter(|| parallel.predict_batch(black_box(df)).unwrap())
        });
    }

    group.finish();
}

fn bench_clean(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean");
    group.sample_size(10);

    let processor = DataQualityProcessor::default();
    let df = generate_sample_data(10_000, 7).unwrap();
    group.bench_function("clean_10k", |b| b.iter(|| processor.clean(black_box(&df)).unwrap()));

    group.finish();
}

criterion_group!(benches, bench_single, bench_batch, bench_clean);
criterion_main!(benches);
