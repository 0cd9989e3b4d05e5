//! Criterion benchmarks for u-groupmix.
//!
//! Uses synthetic rosters with a few rounds of recorded history so the
//! partner and topic terms are populated.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use u_groupmix::anneal::AnnealingChain;
use u_groupmix::model::{History, Instance, ModelConfig, Roster};
use u_groupmix::penalty::evaluate;
use u_groupmix::strategy::SearchStrategy;
use u_groupmix::tempering::{ParallelTempering, TemperingConfig};

// ===========================================================================
// Synthetic population
// ===========================================================================

fn instance_with_history(n: u64, rounds: usize) -> (Roster, History, Instance) {
    let roster = Roster::new(1..=n);
    let config = ModelConfig::default();
    let mut history = History::new();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..rounds {
        let instance = Instance::new(&roster, &history, &config).unwrap();
        let state = instance.random_state(&mut rng);
        let round = instance.to_assignment(&state);
        history.record_round(&round.groups, &round.topics);
    }

    let instance = Instance::new(&roster, &history, &config).unwrap();
    (roster, history, instance)
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_penalty(c: &mut Criterion) {
    let mut group = c.benchmark_group("penalty");

    for &n in &[20u64, 60, 200] {
        let (_, history, instance) = instance_with_history(n, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let state = instance.random_state(&mut rng);
        let assignment = instance.to_assignment(&state);
        let config = ModelConfig::default();

        group.bench_with_input(BenchmarkId::new("dense", n), &state, |b, s| {
            b.iter(|| black_box(instance.energy(black_box(s))))
        });
        group.bench_with_input(BenchmarkId::new("map", n), &assignment, |b, a| {
            b.iter(|| black_box(evaluate(&history, black_box(a), &config)))
        });
    }
    group.finish();
}

fn bench_anneal_leg(c: &mut Criterion) {
    let mut group = c.benchmark_group("anneal_leg");
    group.sample_size(10);

    for &n in &[20u64, 60] {
        let (_, _, instance) = instance_with_history(n, 4);
        let chain = AnnealingChain::fixed(1.0, 1000);
        group.bench_with_input(BenchmarkId::from_parameter(n), &instance, |b, inst| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                let initial = inst.random_state(&mut rng);
                black_box(chain.run(black_box(inst), initial, &mut rng))
            })
        });
    }
    group.finish();
}

fn bench_tempering(c: &mut Criterion) {
    let mut group = c.benchmark_group("tempering");
    group.sample_size(10);

    for &n in &[20u64, 60] {
        let (_, _, instance) = instance_with_history(n, 4);
        let pt = ParallelTempering::new(
            TemperingConfig::default()
                .with_leg_iterations(500)
                .with_rounds(5)
                .with_track_energy(false),
        );
        group.bench_with_input(BenchmarkId::from_parameter(n), &instance, |b, inst| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                let initial = inst.random_state(&mut rng);
                black_box(pt.run(black_box(inst), initial, &mut rng))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_penalty, bench_anneal_leg, bench_tempering);
criterion_main!(benches);
