//! Benchmarks for lineage queries over consolidated graphs
//!
//! The graphs are built the way production graphs are: a chain of tables, each with
//! a few columns, where every column feeds the same-position column of the next table.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lineafold_core::{GraphName, Scope, View};
use lineafold_engine::{InstanceEvent, LineageService, MockLineage};

const COLUMNS_PER_TABLE: usize = 4;

fn column_guid(table: usize, column: usize) -> String {
    MockLineage::column_guid(table, column)
}

/// Generate events for a chain of `num_tables` tables
fn generate_chain(num_tables: usize) -> Vec<InstanceEvent> {
    MockLineage::new(num_tables, COLUMNS_PER_TABLE).events()
}

fn chain_service(num_tables: usize) -> LineageService {
    let service = LineageService::in_memory();
    service.ingest_all(&generate_chain(num_tables));
    service
}

/// Benchmark ultimate source lookups from the end of the chain
fn bench_ultimate_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("ultimate_source");

    for size in [10, 100, 500] {
        let service = chain_service(size);
        let last = column_guid(size - 1, 0);

        group.bench_with_input(BenchmarkId::new("column_view", size), &last, |b, guid| {
            b.iter(|| {
                service
                    .query(GraphName::Main, Scope::UltimateSource, View::ColumnView, black_box(guid))
                    .unwrap()
            });
        });

        let last_table = MockLineage::table_guid(size - 1);
        group.bench_with_input(BenchmarkId::new("table_view", size), &last_table, |b, guid| {
            b.iter(|| {
                service
                    .query(GraphName::Main, Scope::UltimateSource, View::TableView, black_box(guid))
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark end-to-end lineage from the middle of the chain
fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");

    for size in [10, 100, 500] {
        let service = chain_service(size);
        let middle = column_guid(size / 2, 0);

        group.bench_with_input(BenchmarkId::from_parameter(size), &middle, |b, guid| {
            b.iter(|| {
                service
                    .query(GraphName::Main, Scope::EndToEnd, View::ColumnView, black_box(guid))
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark consolidation of a whole chain into empty graphs
fn bench_consolidation(c: &mut Criterion) {
    let mut group = c.benchmark_group("consolidation");
    group.sample_size(10);

    for size in [10, 100, 1000] {
        let events = generate_chain(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &events, |b, events| {
            b.iter(|| {
                let service = LineageService::in_memory();
                black_box(service.ingest_all(events))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ultimate_source, bench_end_to_end, bench_consolidation);
criterion_main!(benches);
