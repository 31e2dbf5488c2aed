//! Criterion benchmarks for label fitting.
//!
//! `fit_label` runs for every visible node on every redraw, so the
//! interesting cases are many short labels and a few long ones that have to
//! shrink several times before they fit.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use explorer_core::render::{fit_label, MonospaceMeasure};

const SHORT: &str = "Ada Lovelace";
const LONG: &str = "Analytical Engine notes on the calculation of Bernoulli numbers, \
                    translated and extended with seven appendices";

fn bench_fit_label(c: &mut Criterion) {
    let measure = MonospaceMeasure::default();
    let mut group = c.benchmark_group("fit_label");

    for (name, text) in [("short", SHORT), ("long", LONG)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| fit_label(black_box(text), 60.0, 60.0, 14.0, 1.2, &measure));
        });
    }

    group.bench_function("frame_of_500_labels", |b| {
        let labels: Vec<String> = (0..500).map(|i| format!("Person {i} of the graph")).collect();
        b.iter(|| {
            labels
                .iter()
                .map(|label| fit_label(label, 40.0, 40.0, 12.0, 1.2, &measure).lines.len())
                .sum::<usize>()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fit_label);
criterion_main!(benches);
