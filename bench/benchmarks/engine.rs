use criterion::{BatchSize, Criterion};

use epi_trace::{Model, Params};

fn bench_params(n_total: usize) -> Params {
    Params {
        n_total,
        n_seed_infection: n_total / 100,
        end_time: 60,
        infectious_rate: 4.0,
        ..Params::default()
    }
}

pub fn engine_benchmarks(c: &mut Criterion) {
    c.bench_function("model_construction_5k", |b| {
        b.iter(|| Model::new(bench_params(5_000)).unwrap());
    });

    c.bench_function("one_time_step_5k", |b| {
        b.iter_batched(
            || Model::new(bench_params(5_000)).unwrap(),
            |mut model| {
                model.one_time_step();
                model
            },
            BatchSize::LargeInput,
        );
    });

    c.bench_function("thirty_days_2k", |b| {
        b.iter_batched(
            || Model::new(bench_params(2_000)).unwrap(),
            |mut model| {
                for _ in 0..30 {
                    model.one_time_step();
                }
                model
            },
            BatchSize::LargeInput,
        );
    });
}
