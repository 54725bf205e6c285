// src/metrics.rs
//
// Small online metrics helpers for schedules and research harnesses.
// - OnlineStats:     Welford running mean/variance + min/max.
// - ScheduleMetrics: per-run waiting / turnaround summary of a result.
// - percentile helpers for cross-run distributions.
//
// Intentionally simple + deterministic.

use serde::{Deserialize, Serialize};

use crate::dispatcher::SchedulingResult;

#[derive(Debug, Clone, Copy)]
pub struct OnlineStats {
    n: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for OnlineStats {
    fn default() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl OnlineStats {
    /// Adds a sample if finite. Non-finite samples are ignored.
    pub fn add(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }

        self.n += 1;
        self.min = self.min.min(x);
        self.max = self.max.max(x);

        // Welford online variance.
        let delta = x - self.mean;
        self.mean += delta / (self.n as f64);
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn min(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.max
        }
    }

    /// Population variance (divide by n).
    pub fn variance_population(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.m2 / (self.n as f64)
        }
    }

    pub fn stddev_population(&self) -> f64 {
        self.variance_population().sqrt()
    }
}

/// Summary of one scheduling run.
///
/// All items arrive at t = 0, so turnaround equals completion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleMetrics {
    pub items: usize,
    pub cycles: u64,
    /// Dispatches that ended with the item requeued.
    pub preemptions: u64,
    /// Clock value when the last item finished.
    pub makespan: f64,
    pub mean_wait: f64,
    pub max_wait: f64,
    pub wait_stddev: f64,
    pub mean_turnaround: f64,
    pub max_turnaround: f64,
    pub final_quantum: u32,
}

impl ScheduleMetrics {
    pub fn from_result(result: &SchedulingResult) -> Self {
        let mut wait = OnlineStats::default();
        let mut turnaround = OnlineStats::default();

        for item in &result.completed {
            wait.add(item.accumulated_wait);
            turnaround.add(item.completion_time);
        }

        let items = result.completed.len();

        Self {
            items,
            cycles: result.cycles,
            preemptions: result.cycles.saturating_sub(items as u64),
            makespan: turnaround.max(),
            mean_wait: wait.mean(),
            max_wait: wait.max(),
            wait_stddev: wait.stddev_population(),
            mean_turnaround: turnaround.mean(),
            max_turnaround: turnaround.max(),
            final_quantum: result.final_quantum,
        }
    }
}

/// Linear-interpolated percentile of an ascending slice. NaN when empty.
pub fn percentile(sorted: &[f64], p01: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let p = p01.clamp(0.0, 1.0);
    let n = sorted.len();
    let idx = p * (n.saturating_sub(1) as f64);
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = idx - (lo as f64);
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

/// (p05, p50, p95) of the finite samples.
pub fn p05_p50_p95(mut xs: Vec<f64>) -> (f64, f64, f64) {
    xs.retain(|x| x.is_finite());
    xs.sort_by(|a, b| a.total_cmp(b));
    (
        percentile(&xs, 0.05),
        percentile(&xs, 0.50),
        percentile(&xs, 0.95),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::ValueTable;
    use crate::types::{CompletedItem, ItemId};

    #[test]
    fn online_stats_basic() {
        let mut s = OnlineStats::default();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            s.add(x);
        }
        s.add(f64::NAN);

        assert_eq!(s.n(), 8);
        assert!((s.mean() - 5.0).abs() < 1e-12);
        assert!((s.stddev_population() - 2.0).abs() < 1e-12);
        assert_eq!(s.min(), 2.0);
        assert_eq!(s.max(), 9.0);
    }

    #[test]
    fn empty_stats_are_zero() {
        let s = OnlineStats::default();
        assert_eq!(s.mean(), 0.0);
        assert_eq!(s.min(), 0.0);
        assert_eq!(s.max(), 0.0);
    }

    #[test]
    fn percentiles_interpolate() {
        let (p05, p50, p95) = p05_p50_p95(vec![4.0, 0.0, 2.0, f64::NAN, 1.0, 3.0]);
        assert!((p05 - 0.2).abs() < 1e-12);
        assert_eq!(p50, 2.0);
        assert!((p95 - 3.8).abs() < 1e-12);
        assert!(percentile(&[], 0.5).is_nan());
    }

    #[test]
    fn schedule_metrics_from_result() {
        let result = SchedulingResult {
            completed: vec![
                CompletedItem {
                    id: ItemId::from("B"),
                    initial_cost: 2.0,
                    completion_time: 4.0,
                    accumulated_wait: 2.0,
                },
                CompletedItem {
                    id: ItemId::from("A"),
                    initial_cost: 4.0,
                    completion_time: 6.0,
                    accumulated_wait: 2.0,
                },
            ],
            final_quantum: 2,
            value_table: ValueTable::new(),
            policy: "fixed-v1".to_string(),
            cycles: 3,
            seed: None,
        };

        let m = ScheduleMetrics::from_result(&result);
        assert_eq!(m.items, 2);
        assert_eq!(m.preemptions, 1);
        assert_eq!(m.makespan, 6.0);
        assert_eq!(m.mean_wait, 2.0);
        assert_eq!(m.max_wait, 2.0);
        assert_eq!(m.wait_stddev, 0.0);
        assert_eq!(m.mean_turnaround, 5.0);
        assert_eq!(m.final_quantum, 2);
    }
}
