//! End-to-end entry point: derive the instance, search, merge.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::anneal::{AnnealConfig, AnnealingChain};
use crate::error::GroupingResult;
use crate::model::{
    Assignment, Energy, GroupId, History, Instance, ModelConfig, ParticipantId, Roster,
};
use crate::penalty::{breakdown, PenaltyBreakdown};
use crate::strategy::{SearchOutcome, SearchStrategy};
use crate::tempering::{ParallelTempering, TemperingConfig, TemperingTrace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which search to run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StrategyConfig {
    /// One linearly cooled chain.
    Annealing(AnnealConfig),
    /// Replica exchange over a temperature ladder.
    Tempering(TemperingConfig),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::Tempering(TemperingConfig::default())
    }
}

/// Complete optimizer configuration.
///
/// # Examples
///
/// ```
/// use u_groupmix::anneal::AnnealConfig;
/// use u_groupmix::optimizer::{OptimizerConfig, StrategyConfig};
///
/// let config = OptimizerConfig::default()
///     .with_strategy(StrategyConfig::Annealing(AnnealConfig::default()))
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizerConfig {
    pub model: ModelConfig,
    pub strategy: StrategyConfig,

    /// Seed of the master generator. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl OptimizerConfig {
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the model and the strategy configuration.
    pub fn validate(&self) -> GroupingResult<()> {
        self.model.validate()?;
        match &self.strategy {
            StrategyConfig::Annealing(c) => c.validate(),
            StrategyConfig::Tempering(c) => c.validate(),
        }
    }
}

/// Energy trace of the strategy that ran.
#[derive(Debug, Clone, PartialEq)]
pub enum SolutionTrace {
    Annealing(Vec<Energy>),
    Tempering(TemperingTrace),
}

/// Result of [`Optimizer::solve`].
#[derive(Debug, Clone)]
pub struct Solution {
    /// Protected entries merged with the best open state found.
    pub assignment: Assignment,

    /// Energy of `assignment`.
    pub energy: Energy,

    /// `energy` split into its terms.
    pub breakdown: PenaltyBreakdown,

    /// Metropolis steps over every chain.
    pub iterations: usize,

    /// Whether the search stopped on the cancellation flag.
    pub cancelled: bool,

    pub trace: SolutionTrace,
}

impl Solution {
    /// Member lists per group.
    pub fn members(&self) -> BTreeMap<GroupId, Vec<ParticipantId>> {
        self.assignment.members()
    }
}

/// Runs the configured search on a roster.
///
/// # Examples
///
/// ```
/// use u_groupmix::model::{History, Roster};
/// use u_groupmix::optimizer::{Optimizer, OptimizerConfig};
///
/// let roster = Roster::new(1..=8);
/// let solution = Optimizer::new(OptimizerConfig::default().with_seed(1))
///     .solve(&roster, &History::new())
///     .unwrap();
/// assert_eq!(solution.energy, 0);
/// assert_eq!(solution.members().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Stops the search once `flag` is set; the best state so far is
    /// still returned.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Derives the instance, searches from a random open state and merges
    /// the best state found with the protected entries.
    ///
    /// # Errors
    ///
    /// Any configuration or population error; the search itself cannot
    /// fail.
    pub fn solve(&self, roster: &Roster, history: &History) -> GroupingResult<Solution> {
        self.config.validate()?;
        let instance = Instance::new(roster, history, &self.config.model)?;

        info!(
            participants = instance.participants().len(),
            protected = instance.protected_participants().len(),
            groups = instance.group_count(),
            "starting search"
        );
        if instance.is_frozen() {
            warn!("instance has no free variables; returning the protected assignment");
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let initial = instance.random_state(&mut rng);

        let (outcome, trace) = match &self.config.strategy {
            StrategyConfig::Annealing(c) => {
                let mut chain = AnnealingChain::new(c.clone());
                if let Some(flag) = &self.cancel {
                    chain = chain.with_cancel(Arc::clone(flag));
                }
                let outcome = chain.run(&instance, initial, &mut rng);
                split(outcome, SolutionTrace::Annealing)
            }
            StrategyConfig::Tempering(c) => {
                let mut pt = ParallelTempering::new(c.clone());
                if let Some(flag) = &self.cancel {
                    pt = pt.with_cancel(Arc::clone(flag));
                }
                let outcome = pt.run(&instance, initial, &mut rng);
                split(outcome, SolutionTrace::Tempering)
            }
        };

        let assignment = instance.to_assignment(&outcome.best_state);
        let breakdown = breakdown(history, &assignment, &self.config.model);

        info!(
            energy = breakdown.total,
            iterations = outcome.iterations,
            cancelled = outcome.cancelled,
            "search finished"
        );

        Ok(Solution {
            assignment,
            energy: breakdown.total,
            breakdown,
            iterations: outcome.iterations,
            cancelled: outcome.cancelled,
            trace,
        })
    }
}

fn split<T>(
    outcome: SearchOutcome<T>,
    wrap: impl FnOnce(T) -> SolutionTrace,
) -> (SearchOutcome<()>, SolutionTrace) {
    let SearchOutcome {
        state,
        energy,
        best_state,
        best_energy,
        iterations,
        accepted_moves,
        improving_moves,
        cancelled,
        trace,
    } = outcome;
    let stripped = SearchOutcome {
        state,
        energy,
        best_state,
        best_energy,
        iterations,
        accepted_moves,
        improving_moves,
        cancelled,
        trace: (),
    };
    (stripped, wrap(trace))
}
