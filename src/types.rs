// src/types.rs
//
// Common shared types for the scheduling simulator.
//
// - StateLabel / Action: the closed RL state and action sets.
// - ItemId:              opaque work item identifier.
// - WorkItemSpec:        caller input (id + initial cost).
// - WorkItem:            mutable per-run record owned by the dispatcher.
// - CompletedItem:       frozen output record.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{SchedError, SchedResult};

/// Coarse bucket of the mean waiting time, used as the RL state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateLabel {
    Low,
    Medium,
    High,
}

impl StateLabel {
    pub const ALL: [StateLabel; 3] = [StateLabel::Low, StateLabel::Medium, StateLabel::High];

    /// Row index into the value table.
    pub fn index(self) -> usize {
        match self {
            StateLabel::Low => 0,
            StateLabel::Medium => 1,
            StateLabel::High => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StateLabel::Low => "LOW",
            StateLabel::Medium => "MEDIUM",
            StateLabel::High => "HIGH",
        }
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantum adjustment chosen by the controller each cycle.
///
/// Declaration order is the tie-break order of the greedy scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Decrease,
    Keep,
    Increase,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Decrease, Action::Keep, Action::Increase];

    /// Column index into the value table.
    pub fn index(self) -> usize {
        match self {
            Action::Decrease => 0,
            Action::Keep => 1,
            Action::Increase => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<Action> {
        Action::ALL.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Decrease => "DECREASE",
            Action::Keep => "KEEP",
            Action::Increase => "INCREASE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque work item identifier.
///
/// Deserializes from either a JSON string or a JSON number; numbers are kept
/// as their decimal rendering so `1` and `"1"` name the same item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId(n.to_string())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Str(String),
            Int(i64),
            UInt(u64),
            Float(f64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Str(s) => ItemId(s),
            RawId::Int(n) => ItemId(n.to_string()),
            RawId::UInt(n) => ItemId(n.to_string()),
            RawId::Float(x) => ItemId(x.to_string()),
        })
    }
}

/// Caller-supplied description of one runnable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemSpec {
    pub id: ItemId,
    /// Units of execution required. Must be finite and >= 0.
    #[serde(alias = "burstTime", alias = "burst_time", alias = "initialCost")]
    pub initial_cost: f64,
}

impl WorkItemSpec {
    pub fn new(id: impl Into<ItemId>, initial_cost: f64) -> Self {
        Self {
            id: id.into(),
            initial_cost,
        }
    }
}

/// Live simulation record. Mutated only by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub id: ItemId,
    pub initial_cost: f64,
    pub remaining_cost: f64,
    pub accumulated_wait: f64,
    pub completion_time: Option<f64>,
}

impl WorkItem {
    /// Build a fresh record from caller input.
    ///
    /// `field` names the item's position in the request for error reporting.
    pub fn from_spec(spec: &WorkItemSpec, field: &str) -> SchedResult<Self> {
        let cost = spec.initial_cost;
        if !cost.is_finite() {
            return Err(SchedError::invalid_input(
                field,
                format!("initial_cost must be finite, got {cost}"),
            ));
        }
        if cost < 0.0 {
            return Err(SchedError::invalid_input(
                field,
                format!("initial_cost must be >= 0, got {cost}"),
            ));
        }

        Ok(Self {
            id: spec.id.clone(),
            initial_cost: cost,
            remaining_cost: cost,
            accumulated_wait: 0.0,
            completion_time: None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.completion_time.is_some()
    }

    /// Freeze into an output record. Returns None while the item is still runnable.
    pub fn to_completed(&self) -> Option<CompletedItem> {
        self.completion_time.map(|completion_time| CompletedItem {
            id: self.id.clone(),
            initial_cost: self.initial_cost,
            completion_time,
            accumulated_wait: self.accumulated_wait,
        })
    }
}

/// Final, immutable record of a finished work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedItem {
    pub id: ItemId,
    pub initial_cost: f64,
    /// Virtual clock value of the cycle in which the item finished.
    pub completion_time: f64,
    pub accumulated_wait: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_serialize_in_upper_case() {
        assert_eq!(serde_json::to_string(&StateLabel::Medium).unwrap(), "\"MEDIUM\"");
        assert_eq!(serde_json::to_string(&Action::Increase).unwrap(), "\"INCREASE\"");

        let a: Action = serde_json::from_str("\"DECREASE\"").unwrap();
        assert_eq!(a, Action::Decrease);
    }

    #[test]
    fn index_matches_declaration_order() {
        for (i, a) in Action::ALL.iter().enumerate() {
            assert_eq!(a.index(), i);
            assert_eq!(Action::from_index(i), Some(*a));
        }
        for (i, s) in StateLabel::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
        assert_eq!(Action::from_index(3), None);
    }

    #[test]
    fn item_id_accepts_strings_and_numbers() {
        let specs: Vec<WorkItemSpec> =
            serde_json::from_str(r#"[{"id":"P1","burstTime":4},{"id":7,"initial_cost":2.5}]"#)
                .unwrap();

        assert_eq!(specs[0].id.as_str(), "P1");
        assert_eq!(specs[0].initial_cost, 4.0);
        assert_eq!(specs[1].id.as_str(), "7");
        assert_eq!(specs[1].initial_cost, 2.5);
    }

    #[test]
    fn negative_cost_is_rejected() {
        let err = WorkItem::from_spec(&WorkItemSpec::new("A", -1.0), "items[0]").unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(err.field(), "items[0]");
    }

    #[test]
    fn non_finite_cost_is_rejected() {
        assert!(WorkItem::from_spec(&WorkItemSpec::new("A", f64::NAN), "items[0]").is_err());
        assert!(WorkItem::from_spec(&WorkItemSpec::new("A", f64::INFINITY), "items[0]").is_err());
    }

    #[test]
    fn zero_cost_item_is_valid() {
        let item = WorkItem::from_spec(&WorkItemSpec::new("A", 0.0), "items[0]").unwrap();
        assert_eq!(item.remaining_cost, 0.0);
        assert!(!item.is_complete());
        assert!(item.to_completed().is_none());
    }
}
