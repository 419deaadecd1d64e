//! Benchmarks for the resolve, extract and emit pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vigil::prelude::*;

/// Conjunction of `width` pairwise spread comparisons over distinct
/// attributes, all under `forall m, n`.
fn spread_conjunction(width: usize) -> BoolNode {
    let comparison = |i: usize| {
        let name = format!("sensor{i}");
        BoolNode::compare(
            CompareOp::Lower,
            MathNode::binary(
                MathOp::Minus,
                MathNode::attribute(name.clone(), "m"),
                MathNode::attribute(name, "n"),
            ),
            MathNode::int(10 + i as i32),
        )
    };
    let mut root = comparison(0);
    for i in 1..width {
        root = BoolNode::and(root, comparison(i));
    }
    root.forall(&["m", "n"]).expect("fresh scope")
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    for width in [4usize, 32, 256] {
        let mut root = spread_conjunction(width);
        resolve(&mut root).expect("resolves");
        group.bench_with_input(BenchmarkId::from_parameter(width), &root, |b, root| {
            b.iter(|| extract(black_box(root)).expect("extracts"));
        });
    }
    group.finish();
}

fn bench_compile_cold(c: &mut Criterion) {
    let compiler = Compiler::new(CompilerConfig::default()).expect("default config");
    c.bench_function("compile_cold_32", |b| {
        b.iter(|| {
            let mut table = ConstraintTable::new();
            table.register(spread_conjunction(32));
            let artifacts = compiler.compile(black_box(&mut table)).expect("compiles");
            black_box(artifacts.to_text())
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_extract, bench_compile_cold
);
criterion_main!(benches);
