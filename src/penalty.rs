//! Penalty (energy) evaluation.
//!
//! For every participant `P` in group `G` with topic `T`:
//!
//! - each other member `Q` of `G` that `P` already worked with `c > 0`
//!   times adds `2^(group_weight * c)`,
//! - a topic `P` already worked on `k > 0` times adds `2^(topic_weight * k)`,
//! - a topic `P` is excluded from adds `2^max_exponent`.
//!
//! Every group whose size falls outside the bounds adds `2^max_exponent`.
//!
//! A mutual pair is penalized from both sides: the loop walks each
//! participant's own partner list, so a pair that shares history in both
//! directions counts twice. All additions saturate at `u64::MAX`.
//!
//! Two evaluators exist. [`evaluate`] works on a complete [`Assignment`]
//! and is the reference; the dense evaluator behind [`Instance::energy`]
//! runs inside the search loop. Both yield the same value on every state.

use crate::model::{pow2, Assignment, Energy, GroupingState, History, Instance, ModelConfig};

/// Energy split into its terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PenaltyBreakdown {
    /// Sum of the repeated-partner terms.
    pub partner_penalty: Energy,
    /// Sum of the repeated-topic terms.
    pub topic_penalty: Energy,
    /// Number of participants assigned a topic they are excluded from.
    pub exclusion_violations: usize,
    /// Number of groups outside the size bounds.
    pub size_violations: usize,
    /// Total energy.
    pub total: Energy,
}

/// Energy of a complete assignment. Pure; independent of map order.
///
/// Groups are the union of the topic map keys and the groups occupied in
/// the participant map, so an empty group listed in the topic map still
/// counts as undersized.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use u_groupmix::model::{Assignment, History, ModelConfig};
/// use u_groupmix::penalty::evaluate;
///
/// let assignment = Assignment {
///     groups: (1..=4).map(|p| (p, 1)).collect(),
///     topics: BTreeMap::from([(1, 2)]),
/// };
/// assert_eq!(evaluate(&History::new(), &assignment, &ModelConfig::default()), 0);
/// ```
pub fn evaluate(history: &History, assignment: &Assignment, config: &ModelConfig) -> Energy {
    breakdown(history, assignment, config).total
}

/// Like [`evaluate`], keeping the individual terms.
pub fn breakdown(
    history: &History,
    assignment: &Assignment,
    config: &ModelConfig,
) -> PenaltyBreakdown {
    let penalty = &config.penalty;
    let mut out = PenaltyBreakdown::default();

    for (group, members) in assignment.members() {
        let topic = assignment.topic_of(group);
        for &p in &members {
            // First-timers have no partner list to scan.
            if let Some(partners) = history.associations(p) {
                for &q in &members {
                    if q == p {
                        continue;
                    }
                    let c = partners.count(&q);
                    if c > 0 {
                        let term = pow2(penalty.group_weight.saturating_mul(c));
                        out.partner_penalty = out.partner_penalty.saturating_add(term);
                    }
                }
            }
            if let Some(t) = topic {
                let k = history.topic_count(p, t);
                if k > 0 {
                    let term = pow2(penalty.topic_weight.saturating_mul(k));
                    out.topic_penalty = out.topic_penalty.saturating_add(term);
                }
                if history.exclusion(p).excludes(t) {
                    out.exclusion_violations += 1;
                }
            }
        }
        if !config.bounds.contains(members.len()) {
            out.size_violations += 1;
        }
    }

    let max = penalty.max_penalty();
    let violations = (out.exclusion_violations + out.size_violations) as u64;
    out.total = out
        .partner_penalty
        .saturating_add(out.topic_penalty)
        .saturating_add(max.saturating_mul(violations));
    out
}

/// Dense evaluation of `state` against a derived instance.
pub(crate) fn state_energy(instance: &Instance, state: &GroupingState) -> Energy {
    let config = instance.config();
    let penalty = &config.penalty;
    let max = penalty.max_penalty();

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); instance.group_count()];
    for p in 0..instance.participants().len() {
        members[instance.slot_of(state, p)].push(p);
    }

    let mut energy: Energy = 0;
    for (slot, ids) in members.iter().enumerate() {
        let topic = instance.topic_of(state, slot);
        for &p in ids {
            let partners = &instance.partners[p];
            if !partners.is_empty() {
                for &q in ids {
                    if q == p {
                        continue;
                    }
                    if let Some(&c) = partners.get(&q) {
                        let term = pow2(penalty.group_weight.saturating_mul(c));
                        energy = energy.saturating_add(term);
                    }
                }
            }
            if let Some(t) = topic {
                if let Some(&k) = instance.prior_topics[p].get(&t) {
                    energy = energy.saturating_add(pow2(penalty.topic_weight.saturating_mul(k)));
                }
                if instance.excluded[p].contains(&t) {
                    energy = energy.saturating_add(max);
                }
            }
        }
        if !config.bounds.contains(ids.len()) {
            energy = energy.saturating_add(max);
        }
    }
    energy
}
