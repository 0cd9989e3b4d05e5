//! Model configuration: group-size bounds, penalty constants, topic count.

use crate::error::{GroupingError, GroupingResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive bounds on the number of members per group.
///
/// Groups outside the bounds are penalized, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupSizeBounds {
    /// Smallest size that carries no penalty.
    pub min: usize,
    /// Largest size that carries no penalty; also sets the group count.
    pub max: usize,
}

impl Default for GroupSizeBounds {
    fn default() -> Self {
        Self { min: 4, max: 5 }
    }
}

impl GroupSizeBounds {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, size: usize) -> bool {
        size >= self.min && size <= self.max
    }
}

/// Penalty constants.
///
/// A co-located prior partner seen `c` times costs `2^(group_weight * c)`,
/// a topic seen `k` times costs `2^(topic_weight * k)`, and an exclusion
/// hit or a badly sized group costs `2^max_exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PenaltyConfig {
    /// Exponent of the disqualifying penalty.
    pub max_exponent: u32,

    /// Exponent multiplier for repeated partners.
    pub group_weight: u32,

    /// Exponent multiplier for repeated topics.
    pub topic_weight: u32,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            max_exponent: 19,
            group_weight: 2,
            topic_weight: 1,
        }
    }
}

impl PenaltyConfig {
    pub fn with_max_exponent(mut self, e: u32) -> Self {
        self.max_exponent = e;
        self
    }

    pub fn with_group_weight(mut self, w: u32) -> Self {
        self.group_weight = w;
        self
    }

    pub fn with_topic_weight(mut self, w: u32) -> Self {
        self.topic_weight = w;
        self
    }

    /// The disqualifying penalty, `2^max_exponent`.
    pub fn max_penalty(&self) -> u64 {
        pow2(self.max_exponent)
    }
}

/// `2^e`, saturating at `u64::MAX`.
pub(crate) fn pow2(e: u32) -> u64 {
    1u64.checked_shl(e).unwrap_or(u64::MAX)
}

/// Configuration of the assignment model.
///
/// # Examples
///
/// ```
/// use u_groupmix::model::{GroupSizeBounds, ModelConfig};
///
/// let config = ModelConfig::default()
///     .with_bounds(GroupSizeBounds::new(3, 4))
///     .with_topic_count(2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelConfig {
    /// Allowed group sizes.
    pub bounds: GroupSizeBounds,

    /// Weights of the penalty terms.
    pub penalty: PenaltyConfig,

    /// Topics are labelled `1..=topic_count`.
    pub topic_count: u8,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            bounds: GroupSizeBounds::default(),
            penalty: PenaltyConfig::default(),
            topic_count: 3,
        }
    }
}

impl ModelConfig {
    pub fn with_bounds(mut self, bounds: GroupSizeBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_penalty(mut self, penalty: PenaltyConfig) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_topic_count(mut self, n: u8) -> Self {
        self.topic_count = n;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GroupingResult<()> {
        if self.bounds.max == 0 {
            return Err(GroupingError::config("bounds.max", "must be positive"));
        }
        if self.bounds.min > self.bounds.max {
            return Err(GroupingError::config(
                "bounds.min",
                format!(
                    "must not exceed max ({} > {})",
                    self.bounds.min, self.bounds.max
                ),
            ));
        }
        if self.topic_count == 0 {
            return Err(GroupingError::config("topic_count", "must be positive"));
        }
        if self.penalty.max_exponent >= 63 {
            return Err(GroupingError::config(
                "penalty.max_exponent",
                format!("must be below 63, got {}", self.penalty.max_exponent),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.bounds, GroupSizeBounds::new(4, 5));
        assert_eq!(config.penalty.max_penalty(), 524_288);
        assert_eq!(config.topic_count, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_bounds() {
        let config = ModelConfig::default().with_bounds(GroupSizeBounds::new(6, 5));
        assert!(matches!(
            config.validate(),
            Err(GroupingError::InvalidConfig { field: "bounds.min", .. })
        ));
        let config = ModelConfig::default().with_bounds(GroupSizeBounds::new(0, 0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_topics() {
        assert!(ModelConfig::default().with_topic_count(0).validate().is_err());
    }

    #[test]
    fn test_pow2_saturates() {
        assert_eq!(pow2(0), 1);
        assert_eq!(pow2(10), 1024);
        assert_eq!(pow2(64), u64::MAX);
        assert_eq!(pow2(200), u64::MAX);
    }
}
