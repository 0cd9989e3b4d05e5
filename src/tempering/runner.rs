//! Parallel-tempering execution loop.
//!
//! # Algorithm
//!
//! 1. Create one slot per ladder temperature, each with its own state and
//!    its own generator seeded from the caller's generator.
//! 2. Each round:
//!    a. Run one fixed-temperature leg in every slot (optionally on rayon
//!       workers; the round waits for all legs)
//!    b. Stop if any slot reached zero energy
//!    c. Exchange temperature and energy labels between adjacent slots
//! 3. Return the slot with the lowest energy, ties to the first slot

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::config::TemperingConfig;
use super::replica::{exchange_pass, LegReport, Replica};
use crate::anneal::AnnealConfig;
use crate::model::{Energy, GroupingState, Instance};
use crate::strategy::{SearchOutcome, SearchStrategy};

/// Energies recorded at one ladder temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderTrace {
    pub temperature: f64,

    /// Concatenated leg traces run at this temperature. Each leg occupies
    /// `leg_iterations + 1` entries; a leg that stopped early is padded
    /// with `None`.
    pub energies: Vec<Option<Energy>>,
}

/// Diagnostics of a tempering run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemperingTrace {
    /// Rounds whose legs ran.
    pub rounds: usize,

    pub attempted_exchanges: usize,
    pub accepted_exchanges: usize,

    /// One entry per ladder temperature, in ladder order. Empty when
    /// tracking is off.
    pub ladder: Vec<LadderTrace>,

    /// Re-evaluated final energy of every slot.
    pub final_energies: Vec<Energy>,
}

/// The tempering controller.
#[derive(Debug, Clone, Default)]
pub struct ParallelTempering {
    config: TemperingConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl ParallelTempering {
    pub fn new(config: TemperingConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Stops the run, including running legs, once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &TemperingConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn leg_template(&self) -> AnnealConfig {
        AnnealConfig::default()
            .with_iterations(self.config.leg_iterations)
            .with_topic_swap_probability(self.config.topic_swap_probability)
            .with_track_energy(self.config.track_energy)
    }

    /// Runs one leg in every slot. Returns only once all legs are done.
    fn run_legs(&self, instance: &Instance, replicas: &mut [Replica]) -> Vec<LegReport> {
        let template = self.leg_template();
        let cancel = self.cancel.as_ref();

        #[cfg(feature = "parallel")]
        if self.config.parallel {
            return replicas
                .par_iter_mut()
                .map(|r| r.run_leg(instance, &template, cancel))
                .collect();
        }

        replicas
            .iter_mut()
            .map(|r| r.run_leg(instance, &template, cancel))
            .collect()
    }

    fn seed_replicas<R: Rng>(
        &self,
        instance: &Instance,
        initial: &GroupingState,
        rng: &mut R,
    ) -> Vec<Replica> {
        self.config
            .ladder
            .iter()
            .enumerate()
            .map(|(rung, &temperature)| {
                let state = if rung == 0 || !self.config.diverse_starts {
                    initial.clone()
                } else {
                    instance.random_state(&mut *rng)
                };
                let slot_rng = StdRng::seed_from_u64(rng.random());
                Replica::new(temperature, rung, instance, state, slot_rng)
            })
            .collect()
    }
}

impl SearchStrategy for ParallelTempering {
    type Trace = TemperingTrace;

    fn default_budget(&self) -> usize {
        self.config.rounds
    }

    fn search<R: Rng>(
        &self,
        instance: &Instance,
        initial: GroupingState,
        budget: usize,
        rng: &mut R,
    ) -> SearchOutcome<TemperingTrace> {
        let config = &self.config;
        let mut replicas = self.seed_replicas(instance, &initial, rng);

        let mut trace = TemperingTrace::default();
        if config.track_energy {
            trace.ladder = config
                .ladder
                .iter()
                .map(|&temperature| LadderTrace {
                    temperature,
                    energies: Vec::new(),
                })
                .collect();
        }

        let mut iterations = 0usize;
        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;
        let mut cancelled = false;

        for round in 0..budget {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }

            let reports = self.run_legs(instance, &mut replicas);
            trace.rounds += 1;

            for (replica, report) in replicas.iter().zip(reports) {
                iterations += report.iterations;
                accepted_moves += report.accepted_moves;
                improving_moves += report.improving_moves;
                cancelled |= report.cancelled;
                if config.track_energy {
                    let energies = &mut trace.ladder[replica.rung].energies;
                    let padded = energies.len() + config.leg_iterations + 1;
                    energies.extend(report.trace.into_iter().map(Some));
                    energies.resize(padded.max(energies.len()), None);
                }
            }

            let round_best = replicas.iter().map(|r| r.energy).min().unwrap_or(0);
            if round_best == 0 {
                debug!(round = round + 1, "zero-energy replica found");
                break;
            }
            if cancelled {
                break;
            }

            let (attempted, accepted) = exchange_pass(
                &mut replicas,
                config.wrap_exchange,
                config.exchange_policy,
                config.exchange_criterion,
                rng,
            );
            trace.attempted_exchanges += attempted;
            trace.accepted_exchanges += accepted;
            debug!(
                round = round + 1,
                best_energy = round_best,
                accepted,
                "tempering round finished"
            );
        }

        // Exchanges leave energy labels detached from the states they sit
        // next to; rank slots by their own state.
        trace.final_energies = replicas.iter().map(|r| instance.energy(r.state())).collect();
        let mut winner = 0;
        for (i, &e) in trace.final_energies.iter().enumerate() {
            if e < trace.final_energies[winner] {
                winner = i;
            }
        }
        let mut best_slot = 0;
        for (i, r) in replicas.iter().enumerate() {
            if r.best_energy() < replicas[best_slot].best_energy() {
                best_slot = i;
            }
        }

        let energy = trace.final_energies.get(winner).copied().unwrap_or(0);
        let (state, best_state, best_energy) = match replicas.get(winner) {
            Some(w) => (
                w.state().clone(),
                replicas[best_slot].best_state().clone(),
                replicas[best_slot].best_energy(),
            ),
            None => (initial.clone(), initial, energy),
        };

        SearchOutcome {
            state,
            energy,
            best_state,
            best_energy,
            iterations,
            accepted_moves,
            improving_moves,
            cancelled,
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{History, ModelConfig, Roster};
    use crate::tempering::{ExchangePolicy, TemperingConfig};

    fn instance(n: u64, history: &History) -> Instance {
        Instance::new(&Roster::new(1..=n), history, &ModelConfig::default()).unwrap()
    }

    #[test]
    fn test_tempering_solves_open_population() {
        let instance = instance(23, &History::new());
        let mut rng = StdRng::seed_from_u64(42);
        let initial = instance.random_state(&mut rng);
        let pt = ParallelTempering::new(TemperingConfig::default().with_rounds(30));

        let outcome = pt.run(&instance, initial, &mut rng);

        assert_eq!(outcome.energy, 0, "expected a clean split, got {}", outcome.energy);
        assert_eq!(instance.energy(&outcome.state), 0);
        assert!(outcome.trace.rounds <= 30);
        assert_eq!(outcome.trace.final_energies.len(), 5);
    }

    #[test]
    fn test_optimal_start_stops_after_first_round() {
        let instance = instance(4, &History::new());
        let mut rng = StdRng::seed_from_u64(3);
        let initial = instance.random_state(&mut rng);
        assert_eq!(instance.energy(&initial), 0);

        let pt = ParallelTempering::new(
            TemperingConfig::default().with_ladder(vec![1.0e-300, 1.0, 1.0e2, 1.0e4, 1.0e6]),
        );
        let outcome = pt.run(&instance, initial.clone(), &mut rng);

        assert_eq!(outcome.trace.rounds, 1);
        assert_eq!(outcome.trace.attempted_exchanges, 0);
        assert_eq!(outcome.energy, 0);
        assert_eq!(outcome.state, initial);
    }

    #[test]
    fn test_ladder_traces_are_padded_per_leg() {
        let instance = instance(12, &History::new());
        let mut rng = StdRng::seed_from_u64(8);
        let initial = instance.random_state(&mut rng);
        let config = TemperingConfig::default()
            .with_leg_iterations(50)
            .with_rounds(3);
        let outcome = ParallelTempering::new(config).run(&instance, initial, &mut rng);

        let rounds = outcome.trace.rounds;
        assert_eq!(outcome.trace.ladder.len(), 5);
        for rung in &outcome.trace.ladder {
            assert_eq!(rung.energies.len(), rounds * 51);
        }
    }

    #[test]
    fn test_final_energy_matches_state() {
        let mut history = History::new();
        for p in 1..=15u64 {
            for q in 1..=15u64 {
                if p != q && (p + q) % 3 == 0 {
                    history.record_association(p, q);
                }
            }
        }
        let instance = instance(15, &history);
        let mut rng = StdRng::seed_from_u64(21);
        let initial = instance.random_state(&mut rng);
        let config = TemperingConfig::default()
            .with_leg_iterations(200)
            .with_rounds(4)
            .with_exchange_policy(ExchangePolicy::FirstAccepted);
        let outcome = ParallelTempering::new(config).run(&instance, initial, &mut rng);

        assert_eq!(instance.energy(&outcome.state), outcome.energy);
        assert_eq!(instance.energy(&outcome.best_state), outcome.best_energy);
        assert!(outcome.best_energy <= outcome.energy);
        let min = outcome.trace.final_energies.iter().min().copied().unwrap();
        assert_eq!(outcome.energy, min);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let instance = instance(18, &History::new());
        let config = TemperingConfig::default().with_leg_iterations(100).with_rounds(3);
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let initial = instance.random_state(&mut rng);
            ParallelTempering::new(config.clone()).run(&instance, initial, &mut rng)
        };
        let (a, b) = (run(5), run(5));
        assert_eq!(a.state, b.state);
        assert_eq!(a.trace, b.trace);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let instance = instance(18, &History::new());
        let config = TemperingConfig::default().with_leg_iterations(100).with_rounds(3);
        let run = |parallel| {
            let mut rng = StdRng::seed_from_u64(77);
            let initial = instance.random_state(&mut rng);
            ParallelTempering::new(config.clone().with_parallel(parallel))
                .run(&instance, initial, &mut rng)
        };
        let (seq, par) = (run(false), run(true));
        assert_eq!(seq.state, par.state);
        assert_eq!(seq.trace, par.trace);
    }

    #[test]
    fn test_cancelled_before_start() {
        let instance = instance(18, &History::new());
        let mut rng = StdRng::seed_from_u64(5);
        let initial = instance.random_state(&mut rng);
        let outcome = ParallelTempering::new(TemperingConfig::default())
            .with_cancel(Arc::new(AtomicBool::new(true)))
            .run(&instance, initial, &mut rng);
        assert!(outcome.cancelled);
        assert_eq!(outcome.trace.rounds, 0);
        assert_eq!(outcome.iterations, 0);
    }
}
