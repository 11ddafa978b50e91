//! Benchmarks for render-window planning and expansion frames.
//!
//! Run with: cargo bench -p stockview-widgets

use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use stockview_widgets::{ExpansionState, TitleMetrics, VirtualizedList, WindowConfig, render};

// ============================================================================
// Window planning
// ============================================================================

fn bench_window_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("virtualized/step");

    for len in [1_000usize, 10_000, 100_000] {
        let mut list = VirtualizedList::new(WindowConfig::default());
        list.set_len(len);
        list.set_viewport_height(800.0);

        group.bench_with_input(BenchmarkId::new("scroll", len), &len, |b, _| {
            b.iter(|| {
                if list.scroll_by(640.0) == 0.0 {
                    list.scroll_to(0.0);
                }
                black_box(list.step())
            })
        });
    }

    group.finish();
}

fn bench_set_item_height(c: &mut Criterion) {
    let mut list = VirtualizedList::new(WindowConfig::default());
    list.set_len(100_000);
    let mut i = 0usize;
    c.bench_function("virtualized/set_item_height", |b| {
        b.iter(|| {
            i = (i + 7919) % 100_000;
            black_box(list.set_item_height(i, 100.0 + (i % 50) as f32))
        })
    });
}

// ============================================================================
// Expansion
// ============================================================================

fn bench_expansion_frame(c: &mut Criterion) {
    let title = TitleMetrics::default();
    c.bench_function("expansion/render", |b| {
        let mut p = 0.0f32;
        b.iter(|| {
            p = (p + 0.013) % 1.0;
            black_box(render(black_box(p), 56.0, 1.5, &title))
        })
    });

    c.bench_function("expansion/cycle", |b| {
        b.iter(|| {
            let mut state = ExpansionState::default();
            state.tap();
            for _ in 0..30 {
                state.tick(Duration::from_millis(17));
            }
            black_box(state.view())
        })
    });
}

criterion_group!(
    benches,
    bench_window_step,
    bench_set_item_height,
    bench_expansion_frame
);
criterion_main!(benches);
