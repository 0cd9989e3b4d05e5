//! Metropolis execution loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use super::config::{AnnealConfig, Schedule};
use crate::model::{Energy, GroupingState, Instance};
use crate::moves::Move;
use crate::strategy::{SearchOutcome, SearchStrategy};

/// Metropolis acceptance probability `min(1, exp(-(candidate - current) / T))`.
///
/// Non-worsening moves are always accepted. A non-finite result clamps to
/// 1.0 instead of propagating.
///
/// # Examples
///
/// ```
/// use u_groupmix::anneal::acceptance_probability;
///
/// assert_eq!(acceptance_probability(10, 4, 1.0e-9), 1.0);
/// assert!(acceptance_probability(4, 10, 1.0e-9) < 1e-12);
/// ```
pub fn acceptance_probability(current: Energy, candidate: Energy, temperature: f64) -> f64 {
    if candidate <= current {
        return 1.0;
    }
    let delta = (candidate - current) as f64;
    let p = (-delta / temperature).exp();
    if p.is_finite() {
        p.min(1.0)
    } else {
        1.0
    }
}

/// A single annealing chain.
///
/// Stops early when the energy reaches zero, when no move exists, or when
/// the cancellation flag is raised.
#[derive(Debug, Clone, Default)]
pub struct AnnealingChain {
    config: AnnealConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl AnnealingChain {
    pub fn new(config: AnnealConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// A fixed-temperature leg.
    pub fn fixed(temperature: f64, iterations: usize) -> Self {
        Self::new(AnnealConfig::fixed(temperature, iterations))
    }

    /// Stops the chain once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &AnnealConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl SearchStrategy for AnnealingChain {
    /// Energy before the first step, then after every step.
    type Trace = Vec<Energy>;

    fn default_budget(&self) -> usize {
        self.config.iterations
    }

    fn search<R: Rng>(
        &self,
        instance: &Instance,
        initial: GroupingState,
        budget: usize,
        rng: &mut R,
    ) -> SearchOutcome<Vec<Energy>> {
        let mut state = initial;
        let mut energy = instance.energy(&state);
        let mut best_state = state.clone();
        let mut best_energy = energy;

        let mut trace = Vec::new();
        if self.config.track_energy {
            trace.reserve(budget + 1);
            trace.push(energy);
        }

        let mut iterations = 0usize;
        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;
        let mut cancelled = false;

        for step in 0..budget {
            if energy == 0 {
                break;
            }
            if self.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(mv) = Move::propose(
                instance,
                &state,
                self.config.topic_swap_probability,
                rng,
            ) else {
                break;
            };

            mv.apply(&mut state);
            let candidate = instance.energy(&state);
            let temperature = self.config.schedule.temperature(step, budget);

            if rng.random::<f64>() < acceptance_probability(energy, candidate, temperature) {
                if candidate < energy {
                    improving_moves += 1;
                }
                energy = candidate;
                accepted_moves += 1;
                if energy < best_energy {
                    best_energy = energy;
                    best_state.clone_from(&state);
                }
            } else {
                mv.undo(&mut state);
            }

            iterations += 1;
            if self.config.track_energy {
                trace.push(energy);
            }
        }

        if let Schedule::Fixed { temperature } = self.config.schedule {
            debug!(temperature, iterations, energy, "annealing leg finished");
        } else {
            debug!(iterations, energy, best_energy, "annealing run finished");
        }

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
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn open_instance(n: u64) -> Instance {
        Instance::new(&Roster::new(1..=n), &History::new(), &ModelConfig::default()).unwrap()
    }

    #[test]
    fn test_acceptance_limits() {
        for t in [1.0e-300, 1.0e-9, 1.0, 1.0e9] {
            assert_eq!(acceptance_probability(5, 5, t), 1.0);
            assert_eq!(acceptance_probability(5, 0, t), 1.0);
        }
        assert_eq!(acceptance_probability(0, 1, 0.0), 0.0);
        assert!(acceptance_probability(0, 1, 1.0e-6) < 1e-100);
        let p = acceptance_probability(0, 1, 1.0);
        assert!((p - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_acceptance_clamps_non_finite() {
        assert_eq!(acceptance_probability(0, 1, f64::NAN), 1.0);
        assert_eq!(acceptance_probability(0, 1, -1.0e-300), 1.0);
    }

    #[test]
    fn test_linear_chain_solves_open_population() {
        let instance = open_instance(13);
        let mut rng = StdRng::seed_from_u64(42);
        let initial = instance.random_state(&mut rng);
        let chain = AnnealingChain::new(AnnealConfig::default().with_iterations(20_000));

        let outcome = chain.run(&instance, initial, &mut rng);

        assert_eq!(outcome.energy, 0, "expected a clean split, got {}", outcome.energy);
        assert_eq!(outcome.best_energy, 0);
        assert_eq!(outcome.trace.len(), outcome.iterations + 1);
        assert_eq!(*outcome.trace.last().unwrap(), 0);
    }

    #[test]
    fn test_zero_energy_exits_immediately() {
        let instance = open_instance(4);
        let mut rng = StdRng::seed_from_u64(1);
        let initial = instance.random_state(&mut rng);
        // One group: every open participant sits in slot 0.
        assert_eq!(instance.energy(&initial), 0);

        let outcome = AnnealingChain::fixed(1.0, 1000).run(&instance, initial.clone(), &mut rng);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.trace, vec![0]);
        assert_eq!(outcome.state, initial);
    }

    #[test]
    fn test_frozen_chain_never_worsens() {
        let instance = open_instance(12);
        let mut rng = StdRng::seed_from_u64(9);
        let initial = instance.random_state(&mut rng);
        let outcome = AnnealingChain::fixed(0.0, 2000).run(&instance, initial, &mut rng);

        for window in outcome.trace.windows(2) {
            assert!(window[1] <= window[0], "{} > {}", window[1], window[0]);
        }
        assert_eq!(instance.energy(&outcome.state), outcome.energy);
        assert_eq!(instance.energy(&outcome.best_state), outcome.best_energy);
    }

    #[test]
    fn test_budget_respected_without_trace() {
        let instance = open_instance(30);
        let mut rng = StdRng::seed_from_u64(5);
        let initial = instance.random_state(&mut rng);
        let chain = AnnealingChain::new(
            AnnealConfig::fixed(1.0e12, 100).with_track_energy(false),
        );
        let outcome = chain.run(&instance, initial, &mut rng);
        assert!(outcome.iterations <= 100);
        assert!(outcome.trace.is_empty());
        // Near-infinite temperature accepts almost everything.
        assert!(outcome.accepted_moves as f64 >= 0.9 * outcome.iterations as f64);
    }

    #[test]
    fn test_cancellation() {
        let instance = open_instance(30);
        let mut rng = StdRng::seed_from_u64(5);
        let initial = instance.random_state(&mut rng);
        let flag = Arc::new(AtomicBool::new(true));
        let outcome = AnnealingChain::fixed(1.0, 1000)
            .with_cancel(flag)
            .run(&instance, initial, &mut rng);
        assert!(outcome.cancelled);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let instance = open_instance(17);
        let chain = AnnealingChain::new(AnnealConfig::default().with_iterations(3000));
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let initial = instance.random_state(&mut rng);
            chain.run(&instance, initial, &mut rng)
        };
        let (a, b) = (run(11), run(11));
        assert_eq!(a.state, b.state);
        assert_eq!(a.trace, b.trace);
    }
}
