//! The derived search instance and the mutable search state.
//!
//! [`Instance`] freezes everything the search must not change: the
//! eligible population, the protected entries, the group ids, the topic
//! pool for open groups, and a dense copy of the history. [`GroupingState`]
//! holds only the open degrees of freedom.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::Rng;

use super::config::ModelConfig;
use super::history::{Exclusion, History};
use super::types::{Assignment, Energy, GroupId, ParticipantId, Roster, Topic};
use crate::error::{GroupingError, GroupingResult};

/// Open degrees of freedom of one chain.
///
/// `groups[i]` is the group slot of the `i`-th open participant and
/// `topics[j]` the topic of the `j`-th open group, both in the order given
/// by [`Instance::open_participants`] and [`Instance::open_group_ids`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingState {
    pub(crate) groups: Vec<usize>,
    pub(crate) topics: Vec<Topic>,
}

impl GroupingState {
    /// Group slot per open participant.
    pub fn group_slots(&self) -> &[usize] {
        &self.groups
    }

    /// Topic per open group.
    pub fn open_topics(&self) -> &[Topic] {
        &self.topics
    }
}

/// A fully derived, immutable search problem.
#[derive(Debug, Clone)]
pub struct Instance {
    config: ModelConfig,

    // Dense participant order: protected first, then open.
    participants: Vec<ParticipantId>,
    protected_slots: Vec<usize>,

    group_ids: Vec<GroupId>,
    slot_topics: Vec<Option<Topic>>,
    open_group_slots: Vec<usize>,
    open_topic_index: Vec<Option<usize>>,
    topic_pool: Vec<Topic>,

    // Dense history, indexed like `participants`.
    pub(crate) partners: Vec<BTreeMap<usize, u32>>,
    pub(crate) prior_topics: Vec<BTreeMap<Topic, u32>>,
    pub(crate) excluded: Vec<BTreeSet<Topic>>,
}

impl Instance {
    /// Derives the search instance.
    ///
    /// # Errors
    ///
    /// [`GroupingError::InvalidPopulation`] when no participant is eligible,
    /// a protected group id is zero, or a protected topic is out of range.
    /// [`GroupingError::InvalidConfig`] when `config` is invalid.
    pub fn new(roster: &Roster, history: &History, config: &ModelConfig) -> GroupingResult<Self> {
        config.validate()?;

        let mut seen = BTreeSet::new();
        let eligible: Vec<ParticipantId> = roster
            .participants
            .iter()
            .copied()
            .filter(|&p| seen.insert(p) && !history.exclusion(p).is_absent())
            .collect();
        if eligible.is_empty() {
            return Err(GroupingError::population("no eligible participants"));
        }

        let (protected, open): (Vec<ParticipantId>, Vec<ParticipantId>) = eligible
            .iter()
            .partition(|p| roster.protected_assignments.contains_key(*p));

        let mut protected_groups = BTreeSet::new();
        for p in &protected {
            let group = roster.protected_assignments[p];
            if group == 0 {
                return Err(GroupingError::population(format!(
                    "participant {p} is committed to group 0"
                )));
            }
            protected_groups.insert(group);
        }

        let n_ideal = eligible.len().div_ceil(config.bounds.max);
        let group_ids: Vec<GroupId> = match &roster.group_ids {
            Some(ids) => {
                if ids.contains(&0) {
                    return Err(GroupingError::population("group id 0 is not allowed"));
                }
                ids.union(&protected_groups).copied().collect()
            }
            None => derive_group_ids(&protected_groups, n_ideal),
        };
        if group_ids.is_empty() {
            return Err(GroupingError::population("no eligible group ids"));
        }
        let slot_of: BTreeMap<GroupId, usize> =
            group_ids.iter().enumerate().map(|(i, &g)| (g, i)).collect();

        let mut slot_topics = vec![None; group_ids.len()];
        for (group, &topic) in &roster.protected_topics {
            let Some(&slot) = slot_of.get(group) else {
                continue;
            };
            if topic == 0 || topic > config.topic_count {
                return Err(GroupingError::population(format!(
                    "group {group} has topic {topic}, expected 1..={}",
                    config.topic_count
                )));
            }
            slot_topics[slot] = Some(topic);
        }

        let open_group_slots: Vec<usize> = (0..group_ids.len())
            .filter(|&s| slot_topics[s].is_none())
            .collect();
        let mut open_topic_index = vec![None; group_ids.len()];
        for (j, &slot) in open_group_slots.iter().enumerate() {
            open_topic_index[slot] = Some(j);
        }

        let protected_topic_counts: Vec<usize> = (1..=config.topic_count)
            .map(|t| slot_topics.iter().filter(|&&s| s == Some(t)).count())
            .collect();
        let topic_pool = open_topic_pool(
            group_ids.len(),
            &protected_topic_counts,
            open_group_slots.len(),
        );

        let protected_slots = protected
            .iter()
            .map(|p| slot_of[&roster.protected_assignments[p]])
            .collect();

        let participants: Vec<ParticipantId> = protected.into_iter().chain(open).collect();
        let dense: BTreeMap<ParticipantId, usize> = participants
            .iter()
            .enumerate()
            .map(|(i, &p)| (p, i))
            .collect();

        let partners: Vec<BTreeMap<usize, u32>> = participants
            .iter()
            .map(|&p| {
                history
                    .associations(p)
                    .map(|set| {
                        set.iter()
                            .filter_map(|(q, c)| dense.get(q).map(|&qi| (qi, c)))
                            .collect::<BTreeMap<_, _>>()
                    })
                    .unwrap_or_default()
            })
            .collect();
        let prior_topics: Vec<BTreeMap<Topic, u32>> = participants
            .iter()
            .map(|&p| {
                history
                    .prior_topics(p)
                    .map(|set| set.iter().map(|(&t, c)| (t, c)).collect::<BTreeMap<_, _>>())
                    .unwrap_or_default()
            })
            .collect();
        let excluded: Vec<BTreeSet<Topic>> = participants
            .iter()
            .map(|&p| match history.exclusion(p) {
                Exclusion::Topics(set) => set.clone(),
                Exclusion::Absent => BTreeSet::new(),
            })
            .collect();

        Ok(Self {
            config: *config,
            participants,
            protected_slots,
            group_ids,
            slot_topics,
            open_group_slots,
            open_topic_index,
            topic_pool,
            partners,
            prior_topics,
            excluded,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// All eligible participants, protected first.
    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn protected_participants(&self) -> &[ParticipantId] {
        &self.participants[..self.protected_slots.len()]
    }

    /// Participants the search may move.
    pub fn open_participants(&self) -> &[ParticipantId] {
        &self.participants[self.protected_slots.len()..]
    }

    /// Every eligible group id, ascending. A group's slot is its index here.
    pub fn group_ids(&self) -> &[GroupId] {
        &self.group_ids
    }

    pub fn group_count(&self) -> usize {
        self.group_ids.len()
    }

    /// Groups whose topic the search may change.
    pub fn open_group_ids(&self) -> Vec<GroupId> {
        self.open_group_slots
            .iter()
            .map(|&s| self.group_ids[s])
            .collect()
    }

    pub fn open_group_count(&self) -> usize {
        self.open_group_slots.len()
    }

    /// Topics handed out to open groups, one per open group.
    pub fn topic_pool(&self) -> &[Topic] {
        &self.topic_pool
    }

    /// Whether the search has nothing to move.
    pub fn is_frozen(&self) -> bool {
        self.open_participants().is_empty() && self.open_group_slots.len() < 2
    }

    /// Group slot of every dense participant under `state`.
    pub(crate) fn slot_of(&self, state: &GroupingState, dense: usize) -> usize {
        let n_protected = self.protected_slots.len();
        if dense < n_protected {
            self.protected_slots[dense]
        } else {
            state.groups[dense - n_protected]
        }
    }

    /// Topic of a group slot under `state`.
    pub(crate) fn topic_of(&self, state: &GroupingState, slot: usize) -> Option<Topic> {
        match self.slot_topics[slot] {
            Some(t) => Some(t),
            None => self.open_topic_index[slot].and_then(|j| state.topics.get(j).copied()),
        }
    }

    /// Random open state: every open participant in a uniformly drawn
    /// group, the topic pool shuffled over the open groups.
    ///
    /// Group sizes are not balanced; the size penalty takes care of that.
    pub fn random_state<R: Rng>(&self, rng: &mut R) -> GroupingState {
        let n_groups = self.group_ids.len();
        let groups = self
            .open_participants()
            .iter()
            .map(|_| rng.random_range(0..n_groups))
            .collect();
        let mut topics = self.topic_pool.clone();
        topics.shuffle(rng);
        GroupingState { groups, topics }
    }

    /// Reads the open entries of a complete assignment back into a state.
    ///
    /// # Errors
    ///
    /// [`GroupingError::InvalidPopulation`] when an open participant or an
    /// open group is missing, or refers to an unknown group.
    pub fn state_from_assignment(&self, assignment: &Assignment) -> GroupingResult<GroupingState> {
        let groups = self
            .open_participants()
            .iter()
            .map(|p| {
                let group = assignment.group_of(*p).ok_or_else(|| {
                    GroupingError::population(format!("participant {p} has no group"))
                })?;
                self.group_ids.binary_search(&group).map_err(|_| {
                    GroupingError::population(format!("group {group} is not eligible"))
                })
            })
            .collect::<GroupingResult<Vec<usize>>>()?;
        let topics = self
            .open_group_ids()
            .into_iter()
            .map(|g| {
                assignment
                    .topic_of(g)
                    .ok_or_else(|| GroupingError::population(format!("group {g} has no topic")))
            })
            .collect::<GroupingResult<Vec<Topic>>>()?;
        Ok(GroupingState { groups, topics })
    }

    /// Merges protected entries with `state` into a complete assignment.
    pub fn to_assignment(&self, state: &GroupingState) -> Assignment {
        let groups = (0..self.participants.len())
            .map(|i| (self.participants[i], self.group_ids[self.slot_of(state, i)]))
            .collect();
        let topics = (0..self.group_ids.len())
            .filter_map(|s| self.topic_of(state, s).map(|t| (self.group_ids[s], t)))
            .collect();
        Assignment { groups, topics }
    }

    /// Penalty of `state`. See [`crate::penalty`].
    pub fn energy(&self, state: &GroupingState) -> Energy {
        crate::penalty::state_energy(self, state)
    }
}

/// Protected group ids, topped up with the smallest unused positive ids
/// until `n_ideal` groups exist.
fn derive_group_ids(protected: &BTreeSet<GroupId>, n_ideal: usize) -> Vec<GroupId> {
    let mut ids = protected.clone();
    let mut candidate: GroupId = 1;
    while ids.len() < n_ideal {
        ids.insert(candidate);
        candidate += 1;
    }
    ids.into_iter().collect()
}

/// Splits `n_groups` across topics as evenly as possible, remainders to
/// the lowest topics.
pub fn topic_quotas(n_groups: usize, topic_count: u8) -> Vec<usize> {
    let k = topic_count as usize;
    if k == 0 {
        return Vec::new();
    }
    (0..k)
        .map(|t| n_groups / k + usize::from(t < n_groups % k))
        .collect()
}

/// Topics still to hand out once protected groups are accounted for.
///
/// Topics already over-allocated by protected groups clamp at zero; the
/// surplus comes out of the topic with the largest remaining quota, the
/// highest topic winning ties. The pool always has `n_open` entries.
fn open_topic_pool(n_groups: usize, protected_counts: &[usize], n_open: usize) -> Vec<Topic> {
    let quotas = topic_quotas(n_groups, protected_counts.len() as u8);
    let mut remaining: Vec<usize> = quotas
        .iter()
        .zip(protected_counts)
        .map(|(&q, &p)| q.saturating_sub(p))
        .collect();

    let mut total: usize = remaining.iter().sum();
    while total > n_open {
        let (index, _) = remaining
            .iter()
            .enumerate()
            .max_by_key(|&(i, &r)| (r, i))
            .unwrap_or((0, &0));
        remaining[index] -= 1;
        total -= 1;
    }
    debug_assert_eq!(total, n_open);

    remaining
        .iter()
        .enumerate()
        .flat_map(|(i, &r)| std::iter::repeat(i as Topic + 1).take(r))
        .collect()
}
