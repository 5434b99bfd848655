//! State ordinals derived from current membership.

use crate::entity::{State, WILDCARD_ID};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// Ordinal of the wildcard state.
pub const WILDCARD_ORDINAL: i64 = -1;

/// A state paired with the ordinal it holds in the machine it came from.
#[derive(Debug, Clone)]
pub struct NumberedState {
    pub number: i64,
    pub state: Arc<State>,
}

impl Deref for NumberedState {
    type Target = State;

    fn deref(&self) -> &State {
        &self.state
    }
}

/// One numbering pass over the concrete states.
///
/// Concrete states are numbered 1..=N in collection order; the wildcard is
/// always -1. Never cached across mutations: build a fresh one per read.
#[derive(Debug, Clone, Default)]
pub struct Numbering {
    ordinals: HashMap<String, i64>,
}

impl Numbering {
    pub fn compute(states: &[Arc<State>]) -> Self {
        let ordinals = states
            .iter()
            .zip(1..)
            .map(|(state, number)| (state.id().to_string(), number))
            .collect();
        Self { ordinals }
    }

    pub fn get(&self, id: &str) -> Option<i64> {
        if id == WILDCARD_ID {
            return Some(WILDCARD_ORDINAL);
        }
        self.ordinals.get(id).copied()
    }

    pub fn number(&self, states: &[Arc<State>]) -> Vec<NumberedState> {
        states
            .iter()
            .filter_map(|state| {
                self.get(state.id()).map(|number| NumberedState {
                    number,
                    state: Arc::clone(state),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_from_one() {
        let states: Vec<Arc<State>> = ["A", "B", "C"]
            .into_iter()
            .map(|id| Arc::new(State::new(id)))
            .collect();
        let numbering = Numbering::compute(&states);

        let numbers: Vec<i64> = numbering.number(&states).iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(numbering.get("B"), Some(2));
        assert_eq!(numbering.get(WILDCARD_ID), Some(WILDCARD_ORDINAL));
        assert_eq!(numbering.get("Z"), None);
    }
}
