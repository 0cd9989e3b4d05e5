//! Identifiers and the caller-facing input/output records.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque participant identifier.
pub type ParticipantId = u64;

/// Positive group number.
pub type GroupId = u32;

/// Topic label in `1..=topic_count`.
pub type Topic = u8;

/// Penalty of a complete assignment. Lower is better; zero ends a search.
pub type Energy = u64;

/// Everything the caller knows about the population before the search.
///
/// # Examples
///
/// ```
/// use u_groupmix::model::Roster;
///
/// let roster = Roster::new(1..=8)
///     .with_protected(1, 1)
///     .with_protected_topic(1, 2);
/// assert_eq!(roster.participants.len(), 8);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Roster {
    /// Every participant on the roster, absent ones included.
    pub participants: Vec<ParticipantId>,

    /// Group commitments from an earlier run. Never changed by the search.
    pub protected_assignments: BTreeMap<ParticipantId, GroupId>,

    /// Topic commitments from an earlier run. Never changed by the search.
    pub protected_topics: BTreeMap<GroupId, Topic>,

    /// Explicit set of eligible group ids. `None` derives them from the
    /// population size.
    pub group_ids: Option<BTreeSet<GroupId>>,
}

impl Roster {
    pub fn new(participants: impl IntoIterator<Item = ParticipantId>) -> Self {
        Self {
            participants: participants.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_protected(mut self, participant: ParticipantId, group: GroupId) -> Self {
        self.protected_assignments.insert(participant, group);
        self
    }

    pub fn with_protected_topic(mut self, group: GroupId, topic: Topic) -> Self {
        self.protected_topics.insert(group, topic);
        self
    }

    pub fn with_group_ids(mut self, ids: impl IntoIterator<Item = GroupId>) -> Self {
        self.group_ids = Some(ids.into_iter().collect());
        self
    }
}

/// A complete assignment: protected entries merged with solved open ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assignment {
    /// Participant → group.
    pub groups: BTreeMap<ParticipantId, GroupId>,

    /// Group → topic.
    pub topics: BTreeMap<GroupId, Topic>,
}

impl Assignment {
    /// Inverts the participant map into member lists.
    ///
    /// Groups that appear only in the topic map are listed with no members.
    pub fn members(&self) -> BTreeMap<GroupId, Vec<ParticipantId>> {
        let mut members: BTreeMap<GroupId, Vec<ParticipantId>> =
            self.topics.keys().map(|&g| (g, Vec::new())).collect();
        for (&participant, &group) in &self.groups {
            members.entry(group).or_default().push(participant);
        }
        members
    }

    /// Number of members per group, empty groups included.
    pub fn group_sizes(&self) -> BTreeMap<GroupId, usize> {
        self.members()
            .into_iter()
            .map(|(g, ids)| (g, ids.len()))
            .collect()
    }

    pub fn group_of(&self, participant: ParticipantId) -> Option<GroupId> {
        self.groups.get(&participant).copied()
    }

    pub fn topic_of(&self, group: GroupId) -> Option<Topic> {
        self.topics.get(&group).copied()
    }
}
