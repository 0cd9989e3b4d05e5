//! Single-chain simulated annealing.
//!
//! Each step proposes a [`Move`](crate::moves::Move), re-evaluates the
//! energy, and accepts with the Metropolis probability
//! `min(1, exp(-ΔE / T))`; rejected moves are undone. The temperature
//! either decreases linearly over the run or stays fixed for a leg inside
//! [`tempering`](crate::tempering).
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Metropolis et al. (1953), "Equation of State Calculations by Fast Computing Machines"

mod config;
mod runner;

pub use config::{AnnealConfig, Schedule};
pub(crate) use config::validate_probability;
pub use runner::{acceptance_probability, AnnealingChain};
