//! The search strategy abstraction shared by annealing and tempering.

use rand::Rng;

use crate::model::{Energy, GroupingState, Instance};

/// Result of a search run.
#[derive(Debug, Clone)]
pub struct SearchOutcome<T> {
    /// Final state of the search.
    ///
    /// For a single chain this is where the Markov chain ended; for
    /// tempering it is the lowest-energy replica.
    pub state: GroupingState,

    /// Energy of `state`.
    pub energy: Energy,

    /// Lowest-energy state visited.
    pub best_state: GroupingState,

    /// Energy of `best_state`.
    pub best_energy: Energy,

    /// Total Metropolis steps executed, over every chain.
    pub iterations: usize,

    /// Accepted moves, improvements and sideways moves included.
    pub accepted_moves: usize,

    /// Accepted moves that lowered the energy.
    pub improving_moves: usize,

    /// Whether the run stopped on the cancellation flag.
    pub cancelled: bool,

    /// Strategy-specific energy trace.
    pub trace: T,
}

/// A stochastic search over the open state of an [`Instance`].
///
/// Both the single annealing chain and the tempering controller implement
/// this trait; the controller runs its replicas' legs through it.
pub trait SearchStrategy {
    /// Energy trace produced alongside the result.
    type Trace;

    /// Budget used when the caller has no preference.
    fn default_budget(&self) -> usize;

    /// Searches from `initial` for at most `budget` units of work.
    ///
    /// The unit is strategy-specific: Metropolis steps for a chain,
    /// tempering rounds for the controller.
    fn search<R: Rng>(
        &self,
        instance: &Instance,
        initial: GroupingState,
        budget: usize,
        rng: &mut R,
    ) -> SearchOutcome<Self::Trace>;

    /// Searches with [`SearchStrategy::default_budget`].
    fn run<R: Rng>(
        &self,
        instance: &Instance,
        initial: GroupingState,
        rng: &mut R,
    ) -> SearchOutcome<Self::Trace> {
        self.search(instance, initial, self.default_budget(), rng)
    }
}
