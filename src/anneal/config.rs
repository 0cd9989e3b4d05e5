//! Annealing configuration and temperature schedules.

use crate::error::{GroupingError, GroupingResult};
use crate::moves::DEFAULT_TOPIC_SWAP_PROBABILITY;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Temperature schedule of a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Schedule {
    /// Linear cooling over the whole budget: `T_n = (N - n) / N * T_0`.
    ///
    /// Used for a standalone run.
    Linear {
        /// Temperature at the first step.
        initial_temperature: f64,
    },

    /// Constant temperature, used for one tempering leg.
    Fixed {
        temperature: f64,
    },
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Linear {
            initial_temperature: 1.0e6,
        }
    }
}

impl Schedule {
    /// Temperature at step `iteration` of a run of `budget` steps.
    pub fn temperature(&self, iteration: usize, budget: usize) -> f64 {
        match *self {
            Schedule::Linear {
                initial_temperature,
            } => {
                if budget == 0 {
                    return initial_temperature;
                }
                let left = budget.saturating_sub(iteration) as f64;
                left / budget as f64 * initial_temperature
            }
            Schedule::Fixed { temperature } => temperature,
        }
    }
}

/// Configuration of a single annealing chain.
///
/// # Examples
///
/// ```
/// use u_groupmix::anneal::{AnnealConfig, Schedule};
///
/// let config = AnnealConfig::default()
///     .with_schedule(Schedule::Linear { initial_temperature: 1.0e4 })
///     .with_iterations(20_000)
///     .with_track_energy(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnnealConfig {
    /// Temperature as a function of the step.
    pub schedule: Schedule,

    /// Metropolis steps per run.
    pub iterations: usize,

    /// Chance of proposing a topic swap instead of a reassignment.
    pub topic_swap_probability: f64,

    /// Record the energy after every step.
    pub track_energy: bool,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::default(),
            iterations: 100_000,
            topic_swap_probability: DEFAULT_TOPIC_SWAP_PROBABILITY,
            track_energy: true,
        }
    }
}

impl AnnealConfig {
    /// A fixed-temperature leg of `iterations` steps.
    pub fn fixed(temperature: f64, iterations: usize) -> Self {
        Self {
            schedule: Schedule::Fixed { temperature },
            iterations,
            ..Self::default()
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    pub fn with_topic_swap_probability(mut self, p: f64) -> Self {
        self.topic_swap_probability = p;
        self
    }

    pub fn with_track_energy(mut self, track: bool) -> Self {
        self.track_energy = track;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GroupingResult<()> {
        match self.schedule {
            Schedule::Linear {
                initial_temperature,
            } => {
                if !(initial_temperature > 0.0) || !initial_temperature.is_finite() {
                    return Err(GroupingError::config(
                        "schedule.initial_temperature",
                        format!("must be positive and finite, got {initial_temperature}"),
                    ));
                }
            }
            Schedule::Fixed { temperature } => {
                if !(temperature >= 0.0) {
                    return Err(GroupingError::config(
                        "schedule.temperature",
                        format!("must be non-negative, got {temperature}"),
                    ));
                }
            }
        }
        validate_probability(self.topic_swap_probability)
    }
}

pub(crate) fn validate_probability(p: f64) -> GroupingResult<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(GroupingError::config(
            "topic_swap_probability",
            format!("must be in [0, 1], got {p}"),
        ));
    }
    Ok(())
}
