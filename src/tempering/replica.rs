//! Replica slots and the exchange step.
//!
//! A slot owns its search state for the whole run. An exchange moves only
//! the two labels, temperature and last-known energy, between slots; the
//! states never move or get copied.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;

use super::config::{ExchangeCriterion, ExchangePolicy};
use crate::anneal::{AnnealConfig, AnnealingChain, Schedule};
use crate::model::{Energy, GroupingState, Instance};
use crate::strategy::SearchStrategy;

/// One execution slot of the controller.
#[derive(Debug, Clone)]
pub struct Replica {
    /// Current temperature label.
    pub temperature: f64,

    /// Ladder position of `temperature`; travels with it.
    pub rung: usize,

    /// Last-known energy label.
    pub energy: Energy,

    state: GroupingState,
    best_state: GroupingState,
    best_energy: Energy,
    rng: StdRng,
}

/// What one leg did.
#[derive(Debug, Clone, Default)]
pub(crate) struct LegReport {
    pub iterations: usize,
    pub accepted_moves: usize,
    pub improving_moves: usize,
    pub cancelled: bool,
    pub trace: Vec<Energy>,
}

impl Replica {
    pub(crate) fn new(
        temperature: f64,
        rung: usize,
        instance: &Instance,
        state: GroupingState,
        rng: StdRng,
    ) -> Self {
        let energy = instance.energy(&state);
        Self {
            temperature,
            rung,
            energy,
            best_state: state.clone(),
            best_energy: energy,
            state,
            rng,
        }
    }

    pub fn state(&self) -> &GroupingState {
        &self.state
    }

    /// Lowest energy this slot's state has reached.
    pub fn best_energy(&self) -> Energy {
        self.best_energy
    }

    pub(crate) fn best_state(&self) -> &GroupingState {
        &self.best_state
    }

    /// Runs one fixed-temperature leg from the slot's own state.
    pub(crate) fn run_leg(
        &mut self,
        instance: &Instance,
        template: &AnnealConfig,
        cancel: Option<&Arc<AtomicBool>>,
    ) -> LegReport {
        let config = template.clone().with_schedule(Schedule::Fixed {
            temperature: self.temperature,
        });
        let budget = config.iterations;
        let mut chain = AnnealingChain::new(config);
        if let Some(flag) = cancel {
            chain = chain.with_cancel(Arc::clone(flag));
        }

        let initial = std::mem::take(&mut self.state);
        let outcome = chain.search(instance, initial, budget, &mut self.rng);

        self.state = outcome.state;
        self.energy = outcome.energy;
        if outcome.best_energy < self.best_energy {
            self.best_energy = outcome.best_energy;
            self.best_state = outcome.best_state;
        }

        LegReport {
            iterations: outcome.iterations,
            accepted_moves: outcome.accepted_moves,
            improving_moves: outcome.improving_moves,
            cancelled: outcome.cancelled,
            trace: outcome.trace,
        }
    }
}

/// Exchange probability between labels `(t_a, e_a)` and `(t_b, e_b)`.
///
/// A non-finite result, such as from a zero temperature, clamps to 1.0.
///
/// # Examples
///
/// ```
/// use u_groupmix::tempering::{exchange_probability, ExchangeCriterion};
///
/// let p = exchange_probability(0, 100, 1.0, 10.0, ExchangeCriterion::Diversifying);
/// assert_eq!(p, 1.0);
/// let p = exchange_probability(100, 0, 1.0, 10.0, ExchangeCriterion::Diversifying);
/// assert!(p < 1e-30);
/// ```
pub fn exchange_probability(
    e_a: Energy,
    e_b: Energy,
    t_a: f64,
    t_b: f64,
    criterion: ExchangeCriterion,
) -> f64 {
    let delta_beta = 1.0 / t_a - 1.0 / t_b;
    let delta_energy = e_a as f64 - e_b as f64;
    let exponent = match criterion {
        ExchangeCriterion::Diversifying => delta_beta * -delta_energy,
        ExchangeCriterion::Metropolis => delta_beta * delta_energy,
    };
    let p = exponent.exp();
    if p.is_finite() {
        p.min(1.0)
    } else {
        1.0
    }
}

/// Swaps the temperature and energy labels of slots `a` and `b`.
fn swap_labels(replicas: &mut [Replica], a: usize, b: usize) {
    let (lo, hi) = (a.min(b), a.max(b));
    let (left, right) = replicas.split_at_mut(hi);
    let (x, y) = (&mut left[lo], &mut right[0]);
    std::mem::swap(&mut x.temperature, &mut y.temperature);
    std::mem::swap(&mut x.rung, &mut y.rung);
    std::mem::swap(&mut x.energy, &mut y.energy);
}

/// Adjacent slot pairs in temperature order at the start of a pass.
fn adjacent_pairs(replicas: &[Replica], wrap: bool) -> Vec<(usize, usize)> {
    let n = replicas.len();
    if n < 2 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| replicas[i].temperature.total_cmp(&replicas[j].temperature));

    let pairs = if wrap && n > 2 { n } else { n - 1 };
    (0..pairs).map(|k| (order[k], order[(k + 1) % n])).collect()
}

/// One exchange pass. Returns `(attempted, accepted)`.
pub(crate) fn exchange_pass(
    replicas: &mut [Replica],
    wrap: bool,
    policy: ExchangePolicy,
    criterion: ExchangeCriterion,
    rng: &mut impl Rng,
) -> (usize, usize) {
    let pairs = adjacent_pairs(replicas, wrap);
    let probability = |replicas: &[Replica], a: usize, b: usize| {
        exchange_probability(
            replicas[a].energy,
            replicas[b].energy,
            replicas[a].temperature,
            replicas[b].temperature,
            criterion,
        )
    };

    match policy {
        ExchangePolicy::EveryPair => {
            let mut accepted = 0;
            for &(a, b) in &pairs {
                if rng.random::<f64>() < probability(&*replicas, a, b) {
                    swap_labels(replicas, a, b);
                    accepted += 1;
                }
            }
            (pairs.len(), accepted)
        }
        ExchangePolicy::FirstAccepted => {
            let odds: Vec<f64> = pairs
                .iter()
                .map(|&(a, b)| probability(&*replicas, a, b))
                .collect();
            for (k, &(a, b)) in pairs.iter().enumerate() {
                if rng.random::<f64>() < odds[k] {
                    swap_labels(replicas, a, b);
                    return (k + 1, 1);
                }
            }
            (pairs.len(), 0)
        }
    }
}
