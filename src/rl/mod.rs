// src/rl/mod.rs
//
// Reinforcement-learning controller for the time quantum.
//
// Key components:
// - ValueTable: fixed 3x3 Q-table over (StateLabel, Action)
// - Policy: action-selection trait (EpsilonGreedy, FixedPolicy)
// - QuantumController: quantum + table + Q-learning update
//
// The dispatcher only talks to QuantumController; it never writes the table.

pub mod controller;
pub mod policy;
pub mod value_table;

pub use controller::QuantumController;
pub use policy::{
    EpsilonGreedy, FixedPolicy, Policy, EPSILON_GREEDY_POLICY_VERSION, FIXED_POLICY_VERSION,
};
pub use value_table::{ValueMap, ValueTable};
