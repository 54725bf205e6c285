// src/classifier.rs
//
// State classifier: aggregate system condition -> discrete RL state.
//
// The aggregate is the arithmetic mean of accumulated wait over every item of
// the run, queued and completed alike.

use crate::config::StateThresholds;
use crate::types::{StateLabel, WorkItem};

/// Bucket a mean waiting time with the reference thresholds (5 and 15).
pub fn classify(mean_wait: f64) -> StateLabel {
    StateThresholds::default().classify(mean_wait)
}

/// Mean accumulated wait across all tracked items. 0.0 for an empty run.
pub fn mean_wait(items: &[WorkItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let total: f64 = items.iter().map(|p| p.accumulated_wait).sum();
    total / items.len() as f64
}
