//! Assignment model.
//!
//! Participants are split into *protected* entries, committed to a group
//! in an earlier run, and *open* entries the search may move. Groups are
//! split the same way by whether their topic is already committed. Only
//! open entries ever change during a search.

mod config;
mod history;
mod instance;
mod types;

pub use config::{GroupSizeBounds, ModelConfig, PenaltyConfig};
pub(crate) use config::pow2;
pub use history::{Exclusion, History, Multiset};
pub use instance::{topic_quotas, GroupingState, Instance};
pub use types::{Assignment, Energy, GroupId, ParticipantId, Roster, Topic};
