// src/rl/policy.rs
//
// Action selection for the quantum controller.
//
// Design:
// - Policy trait: picks an Action given the current state and value table
// - EpsilonGreedy: reference exploration/exploitation rule over an injected RNG
// - FixedPolicy: always the same action (static-quantum baselines, traces)
//
// Policies never write to the table; learning lives in the controller.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::value_table::ValueTable;
use crate::types::{Action, StateLabel};

pub const EPSILON_GREEDY_POLICY_VERSION: &str = "epsilon-greedy-v1";
pub const FIXED_POLICY_VERSION: &str = "fixed-v1";

/// Interface for all action-selection rules.
pub trait Policy: Send {
    /// Stable identifier for logs and reports.
    fn version(&self) -> &str;

    /// Choose the next action for `state`.
    fn select(&mut self, state: StateLabel, table: &ValueTable) -> Action;
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn version(&self) -> &str {
        (**self).version()
    }

    fn select(&mut self, state: StateLabel, table: &ValueTable) -> Action {
        (**self).select(state, table)
    }
}

/// With probability epsilon pick uniformly among all actions, otherwise the
/// greedy action of the table.
///
/// The RNG is injected so runs are reproducible; `seeded` is the usual way in.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<R = ChaCha8Rng> {
    epsilon: f64,
    rng: R,
}

impl EpsilonGreedy<ChaCha8Rng> {
    pub fn seeded(epsilon: f64, seed: u64) -> Self {
        Self::with_rng(epsilon, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> EpsilonGreedy<R> {
    pub fn with_rng(epsilon: f64, rng: R) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
            rng,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl<R: Rng + Send> Policy for EpsilonGreedy<R> {
    fn version(&self) -> &str {
        EPSILON_GREEDY_POLICY_VERSION
    }

    fn select(&mut self, state: StateLabel, table: &ValueTable) -> Action {
        if self.rng.gen::<f64>() < self.epsilon {
            let idx = self.rng.gen_range(0..Action::ALL.len());
            return Action::ALL[idx];
        }
        table.best_action(state)
    }
}

/// Always returns the same action. With `Action::Keep` this is plain
/// round-robin with a static quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPolicy {
    action: Action,
}

impl FixedPolicy {
    pub fn new(action: Action) -> Self {
        Self { action }
    }

    pub fn keep() -> Self {
        Self::new(Action::Keep)
    }
}

impl Policy for FixedPolicy {
    fn version(&self) -> &str {
        FIXED_POLICY_VERSION
    }

    fn select(&mut self, _state: StateLabel, _table: &ValueTable) -> Action {
        self.action
    }
}
