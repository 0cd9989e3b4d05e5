//! Participation history: who worked with whom, on which topics, and
//! which topics a participant is disqualified from.

use std::collections::{BTreeMap, BTreeSet};

use super::types::{GroupId, ParticipantId, Topic};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Topics a participant may not be assigned, or the total-absence sentinel.
///
/// Absent participants are dropped from the population before the search
/// starts. A participant without an entry is treated as `Topics(∅)`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Exclusion {
    /// Disqualified from the listed topics only.
    Topics(BTreeSet<Topic>),
    /// Not present this round.
    Absent,
}

impl Default for Exclusion {
    fn default() -> Self {
        Exclusion::Topics(BTreeSet::new())
    }
}

impl Exclusion {
    /// Builds an exclusion over the given topics.
    pub fn topics(topics: impl IntoIterator<Item = Topic>) -> Self {
        Exclusion::Topics(topics.into_iter().collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Exclusion::Absent)
    }

    /// Whether `topic` is disqualified. Absence excludes nothing: absent
    /// participants never reach the evaluator.
    pub fn excludes(&self, topic: Topic) -> bool {
        match self {
            Exclusion::Topics(set) => set.contains(&topic),
            Exclusion::Absent => false,
        }
    }
}

/// A multiset stored as element counts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Multiset<T: Ord> {
    counts: BTreeMap<T, u32>,
}

impl<T: Ord> Default for Multiset<T> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }
}

impl<T: Ord> Multiset<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: T) {
        *self.counts.entry(item).or_insert(0) += 1;
    }

    /// Number of occurrences of `item` (0 when absent).
    pub fn count(&self, item: &T) -> u32 {
        self.counts.get(item).copied().unwrap_or(0)
    }

    /// Distinct elements with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (&T, u32)> {
        self.counts.iter().map(|(k, &c)| (k, c))
    }
}

impl<T: Ord> FromIterator<T> for Multiset<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Multiset::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

/// Read-only history consulted by the penalty evaluator.
///
/// Every lookup tolerates missing participants: an absent record reads as
/// an empty multiset or an empty exclusion set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct History {
    associations: BTreeMap<ParticipantId, Multiset<ParticipantId>>,
    topics: BTreeMap<ParticipantId, Multiset<Topic>>,
    exclusions: BTreeMap<ParticipantId, Exclusion>,
}

static NO_EXCLUSION: Exclusion = Exclusion::Topics(BTreeSet::new());

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `participant` previously shared a group with `partner`.
    pub fn record_association(&mut self, participant: ParticipantId, partner: ParticipantId) {
        self.associations
            .entry(participant)
            .or_default()
            .insert(partner);
    }

    /// Records that `participant` previously worked on `topic`.
    pub fn record_topic(&mut self, participant: ParticipantId, topic: Topic) {
        self.topics.entry(participant).or_default().insert(topic);
    }

    pub fn set_exclusion(&mut self, participant: ParticipantId, exclusion: Exclusion) {
        self.exclusions.insert(participant, exclusion);
    }

    /// Builder form of [`History::set_exclusion`].
    pub fn with_exclusion(mut self, participant: ParticipantId, exclusion: Exclusion) -> Self {
        self.set_exclusion(participant, exclusion);
        self
    }

    /// Appends a completed round.
    ///
    /// Every member of a group gains each other member as a prior partner
    /// once, and the group's topic once. Groups without a topic only
    /// contribute associations.
    pub fn record_round(
        &mut self,
        assignment: &BTreeMap<ParticipantId, GroupId>,
        topics: &BTreeMap<GroupId, Topic>,
    ) {
        let mut members: BTreeMap<GroupId, Vec<ParticipantId>> = BTreeMap::new();
        for (&participant, &group) in assignment {
            members.entry(group).or_default().push(participant);
        }
        for (group, ids) in &members {
            for &p in ids {
                for &q in ids {
                    if p != q {
                        self.record_association(p, q);
                    }
                }
                if let Some(&topic) = topics.get(group) {
                    self.record_topic(p, topic);
                }
            }
        }
    }

    /// Prior partners of `participant`, `None` for first-timers.
    pub fn associations(&self, participant: ParticipantId) -> Option<&Multiset<ParticipantId>> {
        self.associations.get(&participant)
    }

    pub fn association_count(&self, participant: ParticipantId, partner: ParticipantId) -> u32 {
        self.associations
            .get(&participant)
            .map_or(0, |set| set.count(&partner))
    }

    pub fn topic_count(&self, participant: ParticipantId, topic: Topic) -> u32 {
        self.topics
            .get(&participant)
            .map_or(0, |set| set.count(&topic))
    }

    pub fn prior_topics(&self, participant: ParticipantId) -> Option<&Multiset<Topic>> {
        self.topics.get(&participant)
    }

    pub fn exclusion(&self, participant: ParticipantId) -> &Exclusion {
        self.exclusions.get(&participant).unwrap_or(&NO_EXCLUSION)
    }
}
