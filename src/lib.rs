//! History-aware group and topic assignment.
//!
//! Splits a population of participants into groups of bounded size and
//! gives every group an exclusive topic, keeping away from pairings and
//! topics the participants already had in earlier rounds.
//!
//! - **Model** ([`model`]): roster, history, derived search instance and
//!   the open search state.
//! - **Penalty** ([`penalty`]): the energy of an assignment; powers of two
//!   in the number of repeats plus a flat penalty per hard violation.
//! - **Moves** ([`moves`]): topic swaps and group reassignments with exact
//!   undo.
//! - **Simulated Annealing** ([`anneal`]): one Metropolis chain with a
//!   linear or fixed temperature.
//! - **Parallel Tempering** ([`tempering`]): fixed-temperature chains on a
//!   ladder with replica exchange between rounds.
//! - **Optimizer** ([`optimizer`]): validates, searches and merges the
//!   result with the protected entries.
//!
//! # Quick start
//!
//! ```
//! use u_groupmix::model::{History, Roster};
//! use u_groupmix::optimizer::{Optimizer, OptimizerConfig};
//!
//! let mut history = History::new();
//! history.record_association(1, 2);
//! history.record_association(2, 1);
//!
//! let solution = Optimizer::new(OptimizerConfig::default().with_seed(42))
//!     .solve(&Roster::new(1..=9), &history)
//!     .unwrap();
//! assert_eq!(solution.energy, 0);
//! assert_ne!(solution.assignment.group_of(1), solution.assignment.group_of(2));
//! ```
//!
//! # Features
//!
//! - `parallel`: run tempering legs on rayon workers.
//! - `serde`: serialization of configuration and input/output records.

pub mod anneal;
pub mod error;
pub mod model;
pub mod moves;
pub mod optimizer;
pub mod penalty;
pub mod strategy;
pub mod tempering;

pub use error::{GroupingError, GroupingResult};
pub use optimizer::{Optimizer, OptimizerConfig, Solution, SolutionTrace, StrategyConfig};
