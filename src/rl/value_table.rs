// src/rl/value_table.rs
//
// Tabular Q-value store for the quantum controller.
//
// The keyspace is closed (3 states x 3 actions), so the table is a fixed
// array indexed by the enum variants. A per-state "visited" flag stands in
// for lazy row insertion: only visited rows are reported or serialized, and
// an unvisited row contributes 0.0 as its max.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{Action, StateLabel};

const N_STATES: usize = StateLabel::ALL.len();
const N_ACTIONS: usize = Action::ALL.len();

/// Serialized shape: `{ "LOW": { "DECREASE": 0.0, "KEEP": -1.2, ... }, ... }`.
pub type ValueMap = BTreeMap<StateLabel, BTreeMap<Action, f64>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueTable {
    values: [[f64; N_ACTIONS]; N_STATES],
    visited: [bool; N_STATES],
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a state as seen. Its row already holds 0.0 for every action.
    pub fn touch(&mut self, state: StateLabel) {
        self.visited[state.index()] = true;
    }

    pub fn is_visited(&self, state: StateLabel) -> bool {
        self.visited[state.index()]
    }

    /// True when no state has been visited yet.
    pub fn is_empty(&self) -> bool {
        !self.visited.iter().any(|&v| v)
    }

    pub fn get(&self, state: StateLabel, action: Action) -> f64 {
        self.values[state.index()][action.index()]
    }

    /// Overwrite one entry, marking the state visited.
    pub fn set(&mut self, state: StateLabel, action: Action, value: f64) {
        self.touch(state);
        self.values[state.index()][action.index()] = value;
    }

    pub fn row(&self, state: StateLabel) -> [f64; N_ACTIONS] {
        self.values[state.index()]
    }

    /// max_a Q(state, a); 0.0 for a state that was never visited.
    pub fn max_value(&self, state: StateLabel) -> f64 {
        if !self.is_visited(state) {
            return 0.0;
        }
        self.row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Greedy action for `state`.
    ///
    /// Left-to-right scan in DECREASE, KEEP, INCREASE order with a strict
    /// comparison, so the first maximal action wins ties.
    pub fn best_action(&self, state: StateLabel) -> Action {
        let row = self.row(state);
        let mut best = Action::ALL[0];
        for action in Action::ALL.iter().copied().skip(1) {
            if row[action.index()] > row[best.index()] {
                best = action;
            }
        }
        best
    }

    pub fn visited_states(&self) -> impl Iterator<Item = StateLabel> + '_ {
        StateLabel::ALL
            .iter()
            .copied()
            .filter(move |s| self.is_visited(*s))
    }

    /// Nested map of the visited rows.
    pub fn to_map(&self) -> ValueMap {
        self.visited_states()
            .map(|s| {
                let row = Action::ALL.iter().map(|&a| (a, self.get(s, a))).collect();
                (s, row)
            })
            .collect()
    }

    /// Rebuild a table from its nested-map form. Every state present is
    /// visited; missing actions default to 0.0.
    pub fn from_map(map: &ValueMap) -> Self {
        let mut table = ValueTable::new();
        for (&state, row) in map {
            table.touch(state);
            for (&action, &value) in row {
                table.set(state, action, value);
            }
        }
        table
    }
}

impl Serialize for ValueTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValueTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = ValueMap::deserialize(deserializer)?;
        Ok(ValueTable::from_map(&map))
    }
}
