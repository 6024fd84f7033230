use std::{hint::black_box, path::PathBuf};

use amdbundle::{cycles::find_cycles, ordering::order, types::DiscoveredFile};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn script(index: usize) -> PathBuf {
    PathBuf::from(format!("/site/Scripts/app/module_{index}.js"))
}

/// Layered graph where every module depends on up to three modules of the
/// previous layer, listed dependents first so the orderer needs many passes
fn layered_graph(layers: usize, width: usize) -> Vec<DiscoveredFile> {
    let mut files = Vec::with_capacity(layers * width);
    for layer in (0..layers).rev() {
        for slot in 0..width {
            let index = layer * width + slot;
            let dependencies = if layer == 0 {
                Vec::new()
            } else {
                (0..3)
                    .map(|offset| script((layer - 1) * width + (slot + offset) % width))
                    .collect()
            };
            files.push(DiscoveredFile {
                path: script(index),
                content: format!("define('app/module_{index}', [], function () {{}});"),
                dependencies,
            });
        }
    }
    files
}

/// Ring of modules each depending on the next, which forces the fallback
fn ring(size: usize) -> Vec<DiscoveredFile> {
    (0..size)
        .map(|index| DiscoveredFile {
            path: script(index),
            content: String::new(),
            dependencies: vec![script((index + 1) % size)],
        })
        .collect()
}

fn bench_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("order");
    for &(layers, width) in &[(10, 10), (20, 25), (40, 50)] {
        let files = layered_graph(layers, width);
        group.bench_with_input(
            BenchmarkId::new("layered", files.len()),
            &files,
            |b, files| b.iter(|| order(black_box(files.clone()))),
        );
    }
    let files = ring(500);
    group.bench_with_input(BenchmarkId::new("ring", files.len()), &files, |b, files| {
        b.iter(|| order(black_box(files.clone())));
    });
    group.finish();
}

fn bench_find_cycles(c: &mut Criterion) {
    let files = ring(500);
    c.bench_function("find_cycles/ring", |b| {
        b.iter(|| find_cycles(black_box(&files)));
    });
}

criterion_group!(benches, bench_order, bench_find_cycles);
criterion_main!(benches);
