use std::sync::Arc;

use account_ledger::domain::merge_deltas;
use account_ledger::prelude::*;
use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Deterministic batch spread over `accounts` ids
fn batch(records: usize, accounts: usize) -> Vec<DeltaRecord> {
    (0..records)
        .map(|i| {
            let id = AccountId::new((i % accounts) as i64).unwrap();
            let delta = if i % 3 == 0 { -(i as i64) } else { i as i64 };
            DeltaRecord::new(id, delta)
        })
        .collect()
}

/// Merge alone, for hot (few ids) and sparse (many ids) batches
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_deltas");

    for (records, accounts) in [(1_000, 10), (1_000, 1_000), (10_000, 100)] {
        let records_batch = batch(records, accounts);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{records}x{accounts}")),
            &records_batch,
            |b, records_batch| b.iter(|| black_box(merge_deltas(records_batch))),
        );
    }

    group.finish();
}

/// Merge, bulk read and commit against the in-memory store
fn bench_apply(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let partition = PartitionId::new(0, 1).unwrap();
    let mut group = c.benchmark_group("batch_apply");

    for (records, accounts) in [(100, 10), (1_000, 100), (8_000, 1_000)] {
        let records_batch = batch(records, accounts);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{records}x{accounts}")),
            &records_batch,
            |b, records_batch| {
                b.to_async(&rt).iter_batched(
                    || BatchApplier::new(Arc::new(MemoryStore::new())),
                    |applier| async move {
                        black_box(
                            applier
                                .apply(records_batch, partition, records_batch.len() as u64)
                                .await
                                .unwrap(),
                        )
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_merge, bench_apply);
criterion_main!(benches);
