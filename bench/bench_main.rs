use criterion::{criterion_group, criterion_main};

mod benchmarks;
use benchmarks::engine::engine_benchmarks;

criterion_group!(engine_benches, engine_benchmarks,);

criterion_main!(engine_benches);
