//! Local moves over the open state.
//!
//! Each move records the values it overwrote, so a rejected move is
//! undone in O(1) and leaves the state exactly as it was.

use rand::seq::index::sample;
use rand::Rng;

use crate::model::{GroupingState, Instance, Topic};

/// Probability of proposing a topic swap when both kinds are possible.
pub const DEFAULT_TOPIC_SWAP_PROBABILITY: f64 = 0.2;

/// A reversible perturbation of a [`GroupingState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Move one open participant to another group slot.
    Reassign {
        participant: usize,
        from: usize,
        to: usize,
    },
    /// Exchange the topics of two open groups.
    SwapTopics {
        first: usize,
        second: usize,
        first_topic: Topic,
        second_topic: Topic,
    },
}

impl Move {
    /// Draws a move for `state`.
    ///
    /// A topic swap is chosen with `topic_swap_probability` when at least
    /// two open groups exist; otherwise one open participant is moved to a
    /// group drawn uniformly from every group, protected ones included.
    /// Without open participants a swap is proposed whenever possible.
    /// Returns `None` when the instance has nothing to move.
    pub fn propose<R: Rng>(
        instance: &Instance,
        state: &GroupingState,
        topic_swap_probability: f64,
        rng: &mut R,
    ) -> Option<Move> {
        let n_open_groups = state.topics.len();
        let n_open_participants = state.groups.len();
        let can_swap = n_open_groups > 1;

        let swap = can_swap
            && (n_open_participants == 0 || rng.random::<f64>() < topic_swap_probability);

        if swap {
            let picked = sample(rng, n_open_groups, 2);
            let (first, second) = (picked.index(0), picked.index(1));
            Some(Move::SwapTopics {
                first,
                second,
                first_topic: state.topics[first],
                second_topic: state.topics[second],
            })
        } else if n_open_participants > 0 {
            let participant = rng.random_range(0..n_open_participants);
            Some(Move::Reassign {
                participant,
                from: state.groups[participant],
                to: rng.random_range(0..instance.group_count()),
            })
        } else {
            None
        }
    }

    pub fn apply(&self, state: &mut GroupingState) {
        match *self {
            Move::Reassign {
                participant, to, ..
            } => state.groups[participant] = to,
            Move::SwapTopics {
                first,
                second,
                first_topic,
                second_topic,
            } => {
                state.topics[first] = second_topic;
                state.topics[second] = first_topic;
            }
        }
    }

    /// Restores the values overwritten by [`Move::apply`].
    pub fn undo(&self, state: &mut GroupingState) {
        match *self {
            Move::Reassign {
                participant, from, ..
            } => state.groups[participant] = from,
            Move::SwapTopics {
                first,
                second,
                first_topic,
                second_topic,
            } => {
                state.topics[first] = first_topic;
                state.topics[second] = second_topic;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{History, ModelConfig, Roster};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn instance(roster: Roster) -> Instance {
        Instance::new(&roster, &History::new(), &ModelConfig::default()).unwrap()
    }

    #[test]
    fn test_swap_picks_distinct_open_groups() {
        let instance = instance(Roster::new(1..=20));
        let mut rng = StdRng::seed_from_u64(42);
        let state = instance.random_state(&mut rng);
        for _ in 0..200 {
            if let Some(Move::SwapTopics { first, second, .. }) =
                Move::propose(&instance, &state, 1.0, &mut rng)
            {
                assert_ne!(first, second);
                assert!(first < 4 && second < 4);
            } else {
                panic!("expected a topic swap");
            }
        }
    }

    #[test]
    fn test_single_open_group_only_reassigns() {
        let instance = instance(Roster::new(1..=5));
        let mut rng = StdRng::seed_from_u64(7);
        let state = instance.random_state(&mut rng);
        for _ in 0..50 {
            let mv = Move::propose(&instance, &state, 1.0, &mut rng);
            assert!(matches!(mv, Some(Move::Reassign { .. })));
        }
    }

    #[test]
    fn test_protected_only_population_swaps_or_stops() {
        let roster = Roster::new(1..=4)
            .with_protected(1, 1)
            .with_protected(2, 1)
            .with_protected(3, 1)
            .with_protected(4, 1)
            .with_protected_topic(1, 1);
        let instance = instance(roster);
        let mut rng = StdRng::seed_from_u64(7);
        let state = instance.random_state(&mut rng);
        assert!(instance.is_frozen());
        assert_eq!(Move::propose(&instance, &state, 0.2, &mut rng), None);
    }

    #[test]
    fn test_reassign_targets_any_group() {
        let roster = Roster::new(1..=10)
            .with_protected(1, 2)
            .with_protected_topic(2, 1);
        let instance = instance(roster);
        let mut rng = StdRng::seed_from_u64(3);
        let state = instance.random_state(&mut rng);
        let mut seen = [false; 2];
        for _ in 0..200 {
            if let Some(Move::Reassign { to, .. }) =
                Move::propose(&instance, &state, 0.0, &mut rng)
            {
                seen[to] = true;
            }
        }
        assert_eq!(seen, [true, true]);
    }

    proptest! {
        #[test]
        fn prop_undo_restores_state(seed in any::<u64>(), n in 1u64..30, p in 0.0f64..1.0) {
            let instance = instance(Roster::new(1..=n));
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = instance.random_state(&mut rng);
            let before = state.clone();
            for _ in 0..20 {
                if let Some(mv) = Move::propose(&instance, &state, p, &mut rng) {
                    mv.apply(&mut state);
                    mv.undo(&mut state);
                }
                prop_assert_eq!(&state, &before);
            }
        }
    }
}
