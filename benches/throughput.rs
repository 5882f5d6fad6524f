use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rivulet::{flows, sinks, sources};

fn benchmark_map_collect(c: &mut Criterion) {
    c.bench_function("map_collect_1000", |b| {
        let input: Vec<u64> = (0..1000).collect();
        b.iter(|| {
            let out = sources::slice(black_box(input.clone()))
                .via(flows::map(|x: u64| x.wrapping_mul(31)))
                .run_with(&sinks::collect::<u64>())
                .execute()
                .expect("pipeline failed");
            black_box(out);
        });
    });
}

fn benchmark_filter_fold(c: &mut Criterion) {
    c.bench_function("filter_fold_1000", |b| {
        b.iter(|| {
            let out = sources::sequence(0u64)
                .take(1000)
                .filter(|x: &u64| x % 2 == 0)
                .fold(0u64, |acc: u64, x: u64| acc + x)
                .run_with(&sinks::collect::<u64>())
                .execute()
                .expect("pipeline failed");
            black_box(out);
        });
    });
}

criterion_group!(benches, benchmark_map_collect, benchmark_filter_fold);
criterion_main!(benches);
