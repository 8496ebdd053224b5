//! Snapshot pull and reconstruction benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tessera_bench::Setup;
use tessera_server::packs::{build_document, store_snapshot};
use tessera_server::{BackendConfig, SnapshotInfo};

/// Benchmark rebuilding a document with different replay chunk sizes.
fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild_1000");
    group.throughput(Throughput::Elements(1000));

    for chunk in [10u64, 100, 1000] {
        let config = BackendConfig::new().with_snapshot_replay_chunk(chunk);
        let setup = Setup::new(config, 1000);
        let initial = SnapshotInfo::initial(setup.doc.id);
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, _| {
            b.iter(|| {
                let doc = build_document(&setup.be.ctx, &setup.be, &setup.doc, &initial, 1000);
                black_box(doc.unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark snapshot pulls with and without a covering stored snapshot.
fn bench_pull_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("pull_snapshot");
    let config = BackendConfig::new()
        .with_snapshot_threshold(1)
        .with_snapshot_interval(u64::MAX);

    let mut replay = Setup::new(config.clone(), 500);
    let req = replay.pull_request();
    group.bench_function("with_replay", |b| {
        b.iter(|| {
            let resp = replay.push_pull(&req);
            black_box(resp);
        });
    });

    let mut stored = Setup::new(config.with_snapshot_interval(500), 500);
    store_snapshot(&stored.be.ctx, &stored.be, &stored.doc).unwrap();
    let req = stored.pull_request();
    group.bench_function("stored", |b| {
        b.iter(|| {
            let resp = stored.push_pull(&req);
            black_box(resp);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_pull_snapshot);
criterion_main!(benches);
