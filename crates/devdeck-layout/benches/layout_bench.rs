//! Benchmarks for layout store operations and persistence mapping.
//!
//! Run with: cargo bench -p devdeck-layout

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use devdeck_layout::persistence::{decode, encode};
use devdeck_layout::{
    LayoutStore, Orientation, PanelLayoutState, PanelPatch, PanelType, Placement, ScopeKey,
};
use std::hint::black_box;
use std::sync::Arc;

/// Split the focused panel `splits` times, alternating orientation.
fn deep_layout(store: &mut LayoutStore, scope: &ScopeKey, splits: usize) -> Arc<PanelLayoutState> {
    let mut state = store.apply_template(scope, "grid-2x2");
    for i in 0..splits {
        let Some(focused) = state.focused_panel_id() else {
            break;
        };
        let orientation = if i % 2 == 0 {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        state = store.split_panel(scope, focused, orientation, PanelType::Terminal, Placement::ExistingFirst);
    }
    state
}

fn bench_apply_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/apply_template");
    let scope = ScopeKey::project("bench");

    for template in ["single", "split-h", "grid-2x2", "ide"] {
        group.bench_with_input(BenchmarkId::from_parameter(template), &template, |b, template| {
            let mut store = LayoutStore::new();
            b.iter(|| black_box(store.apply_template(&scope, template)))
        });
    }

    group.finish();
}

fn bench_set_split_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/set_split_ratio");
    let scope = ScopeKey::project("bench");

    for splits in [0, 8, 32] {
        let mut store = LayoutStore::new();
        let state = deep_layout(&mut store, &scope, splits);
        let root = state.layout().id();
        group.bench_with_input(BenchmarkId::new("root", splits), &splits, |b, _| {
            let mut ratio = 0.2;
            b.iter(|| {
                ratio = if ratio > 0.8 { 0.2 } else { ratio + 0.01 };
                black_box(store.set_split_ratio(&scope, root, ratio))
            })
        });
    }

    group.finish();
}

fn bench_focus_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/focus");
    let scope = ScopeKey::project("bench");

    for splits in [4, 16, 64] {
        let mut store = LayoutStore::new();
        let panels = deep_layout(&mut store, &scope, splits).layout().leaf_panel_ids();
        group.bench_with_input(BenchmarkId::new("cycle", panels.len()), &panels, |b, panels| {
            let mut next = 0;
            b.iter(|| {
                next = (next + 1) % panels.len();
                black_box(store.focus(&scope, panels[next]))
            })
        });
    }

    group.finish();
}

fn bench_split_close(c: &mut Criterion) {
    let scope = ScopeKey::project("bench");
    c.bench_function("store/split_then_close", |b| {
        b.iter_batched(
            || {
                let mut store = LayoutStore::new();
                let first = store.apply_template(&scope, "ide").layout().first_panel_id();
                (store, first)
            },
            |(mut store, first)| {
                let state = store.split_panel(&scope, first, Orientation::Vertical, PanelType::Empty, Placement::IncomingFirst);
                let added = state.focused_panel_id().unwrap_or(first);
                black_box(store.close_panel(&scope, added))
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    let scope = ScopeKey::session("bench", "s");

    for splits in [0, 16, 64] {
        let mut store = LayoutStore::new();
        let state = deep_layout(&mut store, &scope, splits);
        let terminal = state.layout().leaf_panel_ids()[2];
        let state = store.update_panel(&scope, terminal, &PanelPatch::new().handle("pty-1").running(true));
        let json = encode(&scope, &state).unwrap_or_default();

        group.bench_with_input(BenchmarkId::new("encode", splits), &state, |b, state| {
            b.iter(|| black_box(encode(&scope, state)))
        });
        group.bench_with_input(BenchmarkId::new("decode", splits), &json, |b, json| {
            b.iter(|| black_box(decode(&scope, json)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_apply_template,
    bench_set_split_ratio,
    bench_focus_cycle,
    bench_split_close,
    bench_persistence,
);

criterion_main!(benches);
