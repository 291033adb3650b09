//! # Layout Benchmark
//!
//! Measures the cost of the invalidation pipeline:
//! 1. Slot allocation for large stacks
//! 2. Full relayout after a window resize
//! 3. A single leaf change in a large tree (only its panel re-arranges)
//!
//! Target: a one-leaf change stays flat as the tree grows.

#![allow(dead_code)]
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_ui::layout::{allocate, SlotRequest};
use trellis_ui::{
    ChannelMessageSource, Direction, ElementId, HeadlessWindow, Length, ManualClock, NativeHandle, PanelLayout,
    PlatformMessage, RecordingRenderer, Scheduler, SchedulerConfig, Size, WindowEvent,
};

const NATIVE: NativeHandle = NativeHandle(1);

/// Window with `rows` horizontal stacks of four cells each.
fn build_grid(rows: usize) -> (Scheduler, Vec<ElementId>) {
    let mut scheduler =
        Scheduler::new(ChannelMessageSource::new(), ManualClock::new(), SchedulerConfig::default()).unwrap();
    let window = scheduler.create_window(HeadlessWindow::new(NATIVE, Size::new(800.0, 600.0)), RecordingRenderer::new());
    let column = scheduler.create_panel(PanelLayout::stack(Direction::Vertical));
    scheduler.add_child(window, column);

    let mut cells = Vec::with_capacity(rows * 4);
    for _ in 0..rows {
        let row = scheduler.create_panel(PanelLayout::stack(Direction::Horizontal));
        scheduler.set_property(row, "height", 20.0_f32).unwrap();
        scheduler.add_child(column, row);
        for _ in 0..4 {
            let cell = scheduler.create_element("Rectangle").unwrap();
            scheduler.set_property(cell, "width", Length::Proportional(1.0)).unwrap();
            scheduler.add_child(row, cell);
            cells.push(cell);
        }
    }
    scheduler.update();
    (scheduler, cells)
}

/// Benchmark splitting a main axis among many children
fn bench_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_allocate");

    for count in [16, 256, 4096] {
        let requests: Vec<SlotRequest> = (0..count)
            .map(|i| {
                if i % 3 == 0 {
                    SlotRequest::Fixed(12.0)
                } else {
                    SlotRequest::Proportional(1.0)
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("mixed", count), &requests, |b, requests| {
            b.iter(|| allocate(black_box(100_000.0), black_box(requests)));
        });
    }

    group.finish();
}

/// Benchmark a full relayout triggered by resizing the window
fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_resize");

    for rows in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            let (mut scheduler, _) = build_grid(rows);
            let mut wide = false;
            b.iter(|| {
                wide = !wide;
                let width = if wide { 1024.0 } else { 800.0 };
                scheduler.dispatch_message(PlatformMessage::Window {
                    handle: NATIVE,
                    event: WindowEvent::Resized(Size::new(width, 600.0)),
                });
                scheduler.update();
            });
        });
    }

    group.finish();
}

/// Benchmark one leaf change in a large tree
fn bench_single_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_single_change");

    for rows in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            let (mut scheduler, cells) = build_grid(rows);
            let target = cells[cells.len() / 2];
            let mut weight = 1.0_f32;
            b.iter(|| {
                weight = if weight > 1.5 { 1.0 } else { 2.0 };
                scheduler
                    .set_property(target, "width", Length::Proportional(weight))
                    .unwrap();
                scheduler.update();
                black_box(scheduler.stats().layout_passes)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_allocate, bench_resize, bench_single_change);
criterion_main!(benches);
