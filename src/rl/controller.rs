// src/rl/controller.rs
//
// Quantum controller: owns the current quantum and the value table, asks its
// policy for an action each cycle and learns from the reward the dispatcher
// reports back.
//
// Update rule (one-step tabular Q-learning):
//   Q(s, a) += α * (r + γ * max_a' Q(s', a') - Q(s, a))
// with max over an unvisited s' taken as 0.0.

use super::policy::{EpsilonGreedy, Policy};
use super::value_table::ValueTable;
use crate::config::{LearningConfig, SchedConfig};
use crate::error::{SchedError, SchedResult};
use crate::types::{Action, StateLabel};

#[derive(Debug, Clone)]
pub struct QuantumController<P> {
    quantum: u32,
    max_quantum: Option<u32>,
    learning: LearningConfig,
    table: ValueTable,
    policy: P,
}

impl<P: Policy> QuantumController<P> {
    pub fn new(initial_quantum: u32, learning: LearningConfig, policy: P) -> SchedResult<Self> {
        if initial_quantum == 0 {
            return Err(SchedError::invalid_input(
                "initial_quantum",
                "must be >= 1, got 0",
            ));
        }
        learning.validate()?;

        Ok(Self {
            quantum: initial_quantum,
            max_quantum: None,
            learning,
            table: ValueTable::new(),
            policy,
        })
    }

    /// Build from a validated config, keeping its quantum ceiling.
    pub fn from_config(cfg: &SchedConfig, policy: P) -> SchedResult<Self> {
        cfg.validate()?;
        let mut ctl = Self::new(cfg.initial_quantum, cfg.learning, policy)?;
        ctl.max_quantum = cfg.max_quantum;
        Ok(ctl)
    }

    /// Start from a previously learned table instead of an empty one.
    pub fn with_table(mut self, table: ValueTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_max_quantum(mut self, max_quantum: Option<u32>) -> Self {
        self.max_quantum = max_quantum;
        self
    }

    pub fn quantum(&self) -> u32 {
        self.quantum
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Register `state` in the table and let the policy pick an action.
    pub fn choose_action(&mut self, state: StateLabel) -> Action {
        self.table.touch(state);
        self.policy.select(state, &self.table)
    }

    /// Apply an action to the quantum. The floor is 1; the optional ceiling
    /// only limits INCREASE.
    pub fn adjust_quantum(&mut self, action: Action) {
        match action {
            Action::Decrease => {
                if self.quantum > 1 {
                    self.quantum -= 1;
                }
            }
            Action::Keep => {}
            Action::Increase => {
                let capped = self.max_quantum.is_some_and(|max_q| self.quantum >= max_q);
                if !capped {
                    self.quantum = self.quantum.saturating_add(1);
                }
            }
        }
    }

    /// One Q-learning step for the transition (state, action) -> next_state.
    pub fn update(&mut self, state: StateLabel, action: Action, reward: f64, next_state: StateLabel) {
        self.table.touch(state);

        let max_next = self.table.max_value(next_state);
        let q = self.table.get(state, action);
        let target = reward + self.learning.gamma * max_next;
        self.table
            .set(state, action, q + self.learning.alpha * (target - q));
    }

    /// Consume the controller, returning the final quantum and table.
    pub fn into_parts(self) -> (u32, ValueTable) {
        (self.quantum, self.table)
    }
}

impl QuantumController<EpsilonGreedy> {
    /// Reference controller: epsilon-greedy over a ChaCha8 stream seeded with `seed`.
    pub fn epsilon_greedy(cfg: &SchedConfig, seed: u64) -> SchedResult<Self> {
        Self::from_config(cfg, EpsilonGreedy::seeded(cfg.learning.epsilon, seed))
    }
}
