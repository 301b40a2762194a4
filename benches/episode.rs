//! Throughput benchmarks for encoding and full episodes.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use snake_eval::batch::evaluate_seeds;
use snake_eval::network::FeedForward;
use snake_eval::policy::GreedyPolicy;
use snake_eval::{BoardConfig, Dir, FitnessEvaluator, Pos, encode, new_episode};

fn bench_encode(c: &mut Criterion) {
    let mut game = new_episode(BoardConfig::default(), 42).unwrap();
    let body: Vec<Pos> = (0..12).map(|x| Pos::new(14 - x, 8)).collect();
    game.set_layout(&body, Dir::Right).unwrap();

    c.bench_function("encode/len12", |b| b.iter(|| encode(black_box(&game))));
}

fn bench_episode(c: &mut Criterion) {
    let evaluator = FitnessEvaluator::default();
    let greedy = GreedyPolicy::new(17, 17);
    let net = FeedForward::for_snake(16, &mut StdRng::seed_from_u64(7));

    c.bench_function("episode/greedy", |b| {
        b.iter(|| evaluator.run_episode(black_box(11), &greedy).unwrap())
    });
    c.bench_function("episode/network", |b| {
        b.iter(|| evaluator.run_episode(black_box(11), &net).unwrap())
    });
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    let evaluator = FitnessEvaluator::default();
    let greedy = GreedyPolicy::new(17, 17);

    for episodes in [16u64, 128] {
        let seeds: Vec<u64> = (0..episodes).collect();
        group.bench_with_input(BenchmarkId::new("greedy", episodes), &seeds, |b, seeds| {
            b.iter(|| evaluate_seeds(&evaluator, seeds, &greedy).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_episode, bench_batch);
criterion_main!(benches);
