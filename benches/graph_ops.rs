//! Benchmarks for provenance graph writes and checkpoint cycles.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use provio::config::ProvenanceConfig;
use provio::graph::Object;
use provio::provenance::ProvenanceGraph;

fn scoped_graph() -> ProvenanceGraph {
    ProvenanceGraph::new(ProvenanceConfig {
        identifier: Some("bench".into()),
        ..Default::default()
    })
    .unwrap()
}

fn bench_new_record(c: &mut Criterion) {
    c.bench_function("new_record_100", |bench| {
        bench.iter_batched(
            scoped_graph,
            |mut graph| {
                for i in 0..100 {
                    black_box(
                        graph
                            .new_record(&format!("field{i}"), Some("Hyperparameters"), Some(json!(i)))
                            .unwrap(),
                    );
                }
                graph
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_metrics(c: &mut Criterion) {
    c.bench_function("add_metric_to_record_100", |bench| {
        bench.iter_batched(
            || {
                let mut graph = scoped_graph();
                graph.new_record("model", Some("Architecture"), None).unwrap();
                graph
            },
            |mut graph| {
                for i in 0..100 {
                    black_box(
                        graph
                            .add_metric_to_record("model", &format!("epoch{i}_loss"), 1.0 / (i + 1) as f64)
                            .unwrap(),
                    );
                }
                graph
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_checkpoint(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bench.ttl");

    c.bench_function("raw_writes_1000_period_100", |bench| {
        bench.iter_batched(
            || ProvenanceGraph::new(ProvenanceConfig::checkpointed(100, &path)).unwrap(),
            |mut graph| {
                for i in 0..1000 {
                    graph
                        .add_triple(
                            &format!("sample{i}"),
                            "provio:hasValue",
                            Object::Literal(i.to_string()),
                        )
                        .unwrap();
                }
                graph
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_new_record, bench_metrics, bench_checkpoint);
criterion_main!(benches);
