//! Tempering configuration.

use crate::anneal::validate_probability;
use crate::error::{GroupingError, GroupingResult};
use crate::moves::DEFAULT_TOPIC_SWAP_PROBABILITY;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which adjacent pairs may exchange labels in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExchangePolicy {
    /// Every adjacent pair gets an independent attempt, using the labels
    /// as left by earlier swaps in the same pass.
    #[default]
    EveryPair,

    /// Probabilities are computed for every pair up front; only the first
    /// accepted pair swaps.
    FirstAccepted,
}

/// Sign convention of the exchange probability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExchangeCriterion {
    /// `min(1, exp((1/T_a - 1/T_b) * -(E_a - E_b)))`.
    ///
    /// Favors handing the lower energy to the hotter temperature.
    #[default]
    Diversifying,

    /// `min(1, exp((1/T_a - 1/T_b) * (E_a - E_b)))`, the textbook
    /// detailed-balance form.
    Metropolis,
}

/// Configuration of the parallel-tempering controller.
///
/// The replica count is the ladder length.
///
/// # Examples
///
/// ```
/// use u_groupmix::tempering::TemperingConfig;
///
/// let config = TemperingConfig::default()
///     .with_geometric_ladder(0.01, 1.0e6, 5)
///     .with_leg_iterations(500)
///     .with_rounds(20);
/// assert_eq!(config.replica_count(), 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TemperingConfig {
    /// One temperature per replica, in the order replicas are created.
    pub ladder: Vec<f64>,

    /// Metropolis steps per leg.
    pub leg_iterations: usize,

    /// Maximum number of rounds (legs + exchange pass).
    pub rounds: usize,

    /// Also pair the hottest replica with the coldest.
    pub wrap_exchange: bool,

    /// Which adjacent pairs may swap labels in one pass.
    pub exchange_policy: ExchangePolicy,

    /// Sign convention of the exchange probability.
    pub exchange_criterion: ExchangeCriterion,

    /// Start replicas after the first from fresh random states instead of
    /// copies of the initial state.
    pub diverse_starts: bool,

    /// Run the legs of a round on rayon workers. Needs the `parallel`
    /// feature; ignored otherwise.
    pub parallel: bool,

    /// Chance of proposing a topic swap instead of a reassignment.
    pub topic_swap_probability: f64,

    /// Record per-temperature energy traces.
    pub track_energy: bool,
}

impl Default for TemperingConfig {
    fn default() -> Self {
        Self {
            ladder: vec![1.0e-2, 1.0e0, 1.0e2, 1.0e4, 1.0e6],
            leg_iterations: 1000,
            rounds: 10,
            wrap_exchange: true,
            exchange_policy: ExchangePolicy::default(),
            exchange_criterion: ExchangeCriterion::default(),
            diverse_starts: true,
            parallel: false,
            topic_swap_probability: DEFAULT_TOPIC_SWAP_PROBABILITY,
            track_energy: true,
        }
    }
}

impl TemperingConfig {
    pub fn replica_count(&self) -> usize {
        self.ladder.len()
    }

    pub fn with_ladder(mut self, ladder: Vec<f64>) -> Self {
        self.ladder = ladder;
        self
    }

    /// Geometrically spaced ladder from `t_min` to `t_max`.
    pub fn with_geometric_ladder(mut self, t_min: f64, t_max: f64, replicas: usize) -> Self {
        self.ladder = geometric_ladder(t_min, t_max, replicas);
        self
    }

    pub fn with_leg_iterations(mut self, n: usize) -> Self {
        self.leg_iterations = n;
        self
    }

    pub fn with_rounds(mut self, n: usize) -> Self {
        self.rounds = n;
        self
    }

    pub fn with_wrap_exchange(mut self, wrap: bool) -> Self {
        self.wrap_exchange = wrap;
        self
    }

    pub fn with_exchange_policy(mut self, policy: ExchangePolicy) -> Self {
        self.exchange_policy = policy;
        self
    }

    pub fn with_exchange_criterion(mut self, criterion: ExchangeCriterion) -> Self {
        self.exchange_criterion = criterion;
        self
    }

    pub fn with_diverse_starts(mut self, diverse: bool) -> Self {
        self.diverse_starts = diverse;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
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
        if self.ladder.is_empty() {
            return Err(GroupingError::config("ladder", "needs at least one temperature"));
        }
        if let Some(t) = self.ladder.iter().find(|t| !(**t >= 0.0)) {
            return Err(GroupingError::config(
                "ladder",
                format!("temperatures must be non-negative, got {t}"),
            ));
        }
        validate_probability(self.topic_swap_probability)
    }
}

/// `replicas` temperatures from `t_min` to `t_max` with a constant ratio.
pub fn geometric_ladder(t_min: f64, t_max: f64, replicas: usize) -> Vec<f64> {
    match replicas {
        0 => Vec::new(),
        1 => vec![t_min],
        n => {
            let ratio = (t_max / t_min).powf(1.0 / (n - 1) as f64);
            (0..n).map(|i| t_min * ratio.powi(i as i32)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TemperingConfig::default();
        assert_eq!(config.replica_count(), 5);
        assert_eq!(config.leg_iterations, 1000);
        assert_eq!(config.rounds, 10);
        assert!(config.wrap_exchange);
        assert_eq!(config.exchange_policy, ExchangePolicy::EveryPair);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_geometric_ladder_matches_default() {
        let ladder = geometric_ladder(1.0e-2, 1.0e6, 5);
        for (got, want) in ladder.iter().zip(TemperingConfig::default().ladder) {
            assert!((got / want - 1.0).abs() < 1e-9, "{got} vs {want}");
        }
        assert_eq!(geometric_ladder(3.0, 9.0, 1), vec![3.0]);
        assert!(geometric_ladder(3.0, 9.0, 0).is_empty());
    }

    #[test]
    fn test_validate_empty_ladder() {
        let config = TemperingConfig::default().with_ladder(Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_negative_temperature() {
        let config = TemperingConfig::default().with_ladder(vec![1.0, -2.0]);
        assert!(config.validate().is_err());
        let config = TemperingConfig::default().with_ladder(vec![f64::NAN]);
        assert!(config.validate().is_err());
    }
}
