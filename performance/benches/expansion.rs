use criterion::{criterion_group, criterion_main, Criterion};

pub fn expansion_bench(c: &mut Criterion) {
    let depth = match std::env::var("EXPANSION_DEPTH") {
        Ok(val) => match val.parse::<usize>() {
            Ok(val) => val,
            Err(_) => panic!["Failed to parse env var EXPANSION_DEPTH={} as an integer", val],
        },
        Err(_) => 14,
    };
    let tex_input = performance::doubling_macros(depth);

    let mut group = c.benchmark_group("expansion");
    group.bench_function("doubling_macros", |b| {
        b.iter(|| performance::run_expander(&tex_input))
    });
}

criterion_group!(benches, expansion_bench);
criterion_main!(benches);
