use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::SeedableRng;

pub fn linebreak_bench(c: &mut Criterion) {
    let mut rng = rand::prelude::StdRng::seed_from_u64(43);
    let text = performance::random_text(&mut rng, 2000);
    let list = performance::horizontal_list(&text);

    let mut group = c.benchmark_group("linebreak");
    group.bench_function("long_paragraph", |b| {
        b.iter_batched(
            || (list.clone(), performance::params()),
            |(list, mut params)| galley::break_paragraph(list, &mut params).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, linebreak_bench);
criterion_main!(benches);
