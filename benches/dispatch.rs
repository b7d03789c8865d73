use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use evhub::{Callback, EventRegistry, Registration, Trigger};

fn make_registry(entries: u64, tagged_every: u64) -> (EventRegistry<u64>, Arc<AtomicU64>) {
    let events = EventRegistry::<u64>::new();
    let sink = Arc::new(AtomicU64::new(0));

    // Mix of anonymous, grouped and tagged entries so every resolution path is present.
    for i in 0..entries {
        let sink = Arc::clone(&sink);
        let cb = Callback::new(move |v: &u64| {
            sink.fetch_add(*v, Ordering::Relaxed);
        });
        let reg = Registration::new("row.updated", cb);
        let reg = if i % tagged_every == 0 {
            reg.with_id(format!("row-{i}")).with_observe([i])
        } else if i % 3 == 0 {
            reg.with_group("audit")
        } else {
            reg
        };
        events.register(reg);
    }

    (events, sink)
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for entries in [16u64, 256] {
        let (events, _sink) = make_registry(entries, 4);
        group.throughput(Throughput::Elements(entries));
        group.bench_function(format!("all_{entries}"), |b| {
            b.iter(|| events.dispatch("row.updated", black_box(&1)).unwrap());
        });
        group.bench_function(format!("filtered_{entries}"), |b| {
            b.iter(|| {
                events
                    .trigger_filtered(Trigger::new("row.updated", black_box(&1)).with_observe([8u64]))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_register(c: &mut Criterion) {
    c.bench_function("register_replace_by_id", |b| {
        let events = EventRegistry::<u64>::new();
        b.iter(|| {
            events.register(Registration::new("slot", Callback::new(|_: &u64| {})).with_id("widget-1"));
        });
    });
}

criterion_group!(benches, bench_dispatch, bench_register);
criterion_main!(benches);
