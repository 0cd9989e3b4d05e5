//! Parallel tempering (replica exchange).
//!
//! A fixed set of replica slots each runs a fixed-temperature
//! [`AnnealingChain`](crate::anneal::AnnealingChain) leg per round. After
//! all legs finish, adjacent temperatures try to trade places: a cold
//! slot holding a poor state can heat up and escape its basin while a hot
//! slot that stumbled on a good state cools down to refine it.
//!
//! Slots never move their states; an exchange only swaps the
//! temperature and energy labels.
//!
//! # References
//!
//! - Swendsen & Wang (1986), "Replica Monte Carlo Simulation of Spin-Glasses"
//! - Earl & Deem (2005), "Parallel tempering: Theory, applications, and new perspectives"

mod config;
mod replica;
mod runner;

pub use config::{geometric_ladder, ExchangeCriterion, ExchangePolicy, TemperingConfig};
pub use replica::{exchange_probability, Replica};
pub use runner::{LadderTrace, ParallelTempering, TemperingTrace};
