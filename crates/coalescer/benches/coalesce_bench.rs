//! Edit throughput benchmarks for the coalescer

use coalescer::{channel_sink, CoalescerConfig, EditCoalescer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use survey_core::{FieldKey, RawValue, RowCache, WasteField, WasteItem};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build runtime")
}

fn bench_edit_bursts(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("edit_burst_single_key", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (sink, _rx) = channel_sink();
                let coalescer = EditCoalescer::new(CoalescerConfig::default(), sink);
                for i in 0..1_000u32 {
                    coalescer.edit(FieldKey::new("row1", "amount"), black_box(i));
                }
                black_box(coalescer.pending_count())
            })
        });
    });

    c.bench_function("edit_burst_many_keys", |b| {
        let rows: Vec<String> = (0..64).map(|i| format!("row{}", i)).collect();
        b.iter(|| {
            rt.block_on(async {
                let (sink, _rx) = channel_sink();
                let coalescer = EditCoalescer::new(CoalescerConfig::default(), sink);
                for i in 0..1_000usize {
                    let key = FieldKey::new(rows[i % rows.len()].as_str(), "amount");
                    coalescer.edit(key, black_box(i));
                }
                black_box(coalescer.pending_count())
            })
        });
    });
}

fn bench_row_merge(c: &mut Criterion) {
    let rows = Arc::new(RowCache::from_rows(
        (0..1_000).map(|i| WasteItem::new(format!("w{}", i))),
    ));

    c.bench_function("row_cache_merge_amount", |b| {
        let key = FieldKey::new("w500", WasteField::Amount);
        let value = RawValue::from("12,5");
        b.iter(|| black_box(rows.merge(&key, &value)))
    });
}

criterion_group!(benches, bench_edit_bursts, bench_row_merge);
criterion_main!(benches);
