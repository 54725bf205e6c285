// src/dispatcher.rs
//
// Round-robin dispatcher: the simulation driver.
//
// Owns the FIFO ready queue, the completed list and the virtual clock. Each
// cycle it asks the quantum controller for an action, runs the head item for
// min(quantum, remaining) units, charges that slice as waiting time to every
// other queued item, requeues or retires the item, and reports the reward
// (negated mean wait over all items) back to the controller.
//
// Phases: Running (queue non-empty) -> Done (queue empty). Termination is
// guaranteed because every cycle either retires an item or consumes at least
// one unit of cost (quantum >= 1).

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::classifier;
use crate::config::{SchedConfig, StateThresholds};
use crate::error::{SchedError, SchedResult};
use crate::logging::{CycleRecord, EventSink, NoopSink};
use crate::rl::{Policy, QuantumController, ValueTable};
use crate::types::{CompletedItem, StateLabel, WorkItem, WorkItemSpec};

/// Outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingResult {
    /// Finished items in completion order.
    pub completed: Vec<CompletedItem>,
    pub final_quantum: u32,
    /// Learned values for every state visited during the run.
    pub value_table: ValueTable,
    /// Number of dispatch cycles executed.
    pub cycles: u64,
    /// Version tag of the policy that drove the run.
    #[serde(default)]
    pub policy: String,
    /// Exploration seed, when the run drew one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherPhase {
    Running,
    Done,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Every item of the run, in input order. Indices are stable.
    items: Vec<WorkItem>,
    ready: VecDeque<usize>,
    completed: Vec<usize>,
    clock: f64,
    cycles: u64,
    thresholds: StateThresholds,
}

impl Dispatcher {
    /// Validate the batch and build the initial ready queue in input order.
    ///
    /// Fails on the first negative / non-finite cost or duplicate id; nothing
    /// is simulated in that case.
    pub fn new(specs: &[WorkItemSpec]) -> SchedResult<Self> {
        let mut items = Vec::with_capacity(specs.len());
        let mut seen = HashSet::with_capacity(specs.len());

        for (i, spec) in specs.iter().enumerate() {
            if !seen.insert(spec.id.as_str()) {
                return Err(SchedError::invalid_input(
                    format!("items[{i}].id"),
                    format!("duplicate id {:?}", spec.id.as_str()),
                ));
            }
            items.push(WorkItem::from_spec(spec, &format!("items[{i}].initial_cost"))?);
        }

        Ok(Self {
            ready: (0..items.len()).collect(),
            completed: Vec::with_capacity(items.len()),
            items,
            clock: 0.0,
            cycles: 0,
            thresholds: StateThresholds::default(),
        })
    }

    pub fn with_thresholds(mut self, thresholds: StateThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn phase(&self) -> DispatcherPhase {
        if self.ready.is_empty() {
            DispatcherPhase::Done
        } else {
            DispatcherPhase::Running
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase() == DispatcherPhase::Done
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// All items of the run (queued and completed), in input order.
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn mean_wait(&self) -> f64 {
        classifier::mean_wait(&self.items)
    }

    pub fn current_state(&self) -> StateLabel {
        self.thresholds.classify(self.mean_wait())
    }

    /// Completed items in completion order.
    pub fn completed(&self) -> Vec<CompletedItem> {
        self.completed
            .iter()
            .filter_map(|&i| self.items[i].to_completed())
            .collect()
    }

    /// Run one dispatch cycle. Returns None once the queue is empty.
    pub fn step<P: Policy>(&mut self, ctl: &mut QuantumController<P>) -> Option<CycleRecord> {
        if self.ready.is_empty() {
            return None;
        }

        // 1-2) Observe, act.
        let state = self.current_state();
        let action = ctl.choose_action(state);
        ctl.adjust_quantum(action);

        // 3-6) Run the head item for one bounded slice.
        let idx = self.ready.pop_front()?;
        let slice = f64::from(ctl.quantum()).min(self.items[idx].remaining_cost);
        self.clock += slice;
        self.items[idx].remaining_cost -= slice;

        // 7) Everyone still waiting is charged the slice.
        for &j in &self.ready {
            self.items[j].accumulated_wait += slice;
        }

        // 8) Requeue or retire.
        let remaining_cost = self.items[idx].remaining_cost;
        let completed = remaining_cost <= 0.0;
        if completed {
            self.items[idx].remaining_cost = 0.0;
            self.items[idx].completion_time = Some(self.clock);
            self.completed.push(idx);
        } else {
            self.ready.push_back(idx);
        }

        // 9-11) Learn from the new condition.
        let mean_wait = self.mean_wait();
        let next_state = self.thresholds.classify(mean_wait);
        let reward = -mean_wait;
        ctl.update(state, action, reward, next_state);

        self.cycles += 1;

        Some(CycleRecord {
            cycle: self.cycles,
            clock: self.clock,
            state,
            action,
            quantum: ctl.quantum(),
            item_id: self.items[idx].id.clone(),
            slice,
            remaining_cost: self.items[idx].remaining_cost,
            completed,
            queue_len: self.ready.len(),
            mean_wait,
            next_state,
            reward,
        })
    }
}

/// Drive an already-validated dispatcher to completion.
pub fn simulate_with<P: Policy>(
    mut dispatcher: Dispatcher,
    mut controller: QuantumController<P>,
    sink: &mut dyn EventSink,
) -> SchedulingResult {
    while let Some(record) = dispatcher.step(&mut controller) {
        sink.log_cycle(&record);
    }

    let completed = dispatcher.completed();
    let cycles = dispatcher.cycles();
    let policy = controller.policy().version().to_string();
    let (final_quantum, value_table) = controller.into_parts();

    SchedulingResult {
        completed,
        final_quantum,
        value_table,
        cycles,
        policy,
        seed: None,
    }
}

/// Run a batch with a caller-owned controller (any policy, optionally a
/// seeded table) and the reference state thresholds.
pub fn simulate<P: Policy>(
    specs: &[WorkItemSpec],
    controller: QuantumController<P>,
    sink: &mut dyn EventSink,
) -> SchedResult<SchedulingResult> {
    let dispatcher = Dispatcher::new(specs)?;
    Ok(simulate_with(dispatcher, controller, sink))
}

/// Reference entry point: default learning constants, a fresh random seed,
/// and the given starting quantum.
pub fn run(specs: &[WorkItemSpec], initial_quantum: u32) -> SchedResult<SchedulingResult> {
    let cfg = SchedConfig {
        initial_quantum,
        ..SchedConfig::default()
    };
    run_with_config(specs, &cfg)
}

/// Run a batch under `cfg` without telemetry.
pub fn run_with_config(specs: &[WorkItemSpec], cfg: &SchedConfig) -> SchedResult<SchedulingResult> {
    run_with_sink(specs, cfg, &mut NoopSink)
}

/// Run a batch under `cfg`, streaming every cycle to `sink`.
///
/// Uses `cfg.seed` when set, otherwise draws one; either way the seed is
/// reported in the result so the run can be replayed.
pub fn run_with_sink(
    specs: &[WorkItemSpec],
    cfg: &SchedConfig,
    sink: &mut dyn EventSink,
) -> SchedResult<SchedulingResult> {
    run_from_table(specs, cfg, None, sink)
}

/// Like [`run_with_sink`], but learning starts from `table` (a value table
/// reported by an earlier run) when one is given.
pub fn run_from_table(
    specs: &[WorkItemSpec],
    cfg: &SchedConfig,
    table: Option<ValueTable>,
    sink: &mut dyn EventSink,
) -> SchedResult<SchedulingResult> {
    cfg.validate()?;
    let seed = cfg.seed.unwrap_or_else(rand::random);

    let mut controller = QuantumController::epsilon_greedy(cfg, seed)?;
    if let Some(table) = table {
        controller = controller.with_table(table);
    }
    let dispatcher = Dispatcher::new(specs)?.with_thresholds(cfg.thresholds);

    let mut result = simulate_with(dispatcher, controller, sink);
    result.seed = Some(seed);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearningConfig;
    use crate::logging::MemorySink;
    use crate::rl::FixedPolicy;
    use crate::types::Action;

    fn keep_controller(q: u32) -> QuantumController<FixedPolicy> {
        QuantumController::new(q, LearningConfig::default(), FixedPolicy::keep()).unwrap()
    }

    fn specs(items: &[(&str, f64)]) -> Vec<WorkItemSpec> {
        items
            .iter()
            .map(|&(id, cost)| WorkItemSpec::new(id, cost))
            .collect()
    }

    #[test]
    fn two_item_keep_trace() {
        let batch = specs(&[("A", 4.0), ("B", 2.0)]);
        let mut sink = MemorySink::new();
        let res = simulate(&batch, keep_controller(2), &mut sink).unwrap();

        assert_eq!(res.final_quantum, 2);
        assert_eq!(res.cycles, 3);

        let ids: Vec<&str> = res.completed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(res.completed[0].completion_time, 4.0);
        assert_eq!(res.completed[0].accumulated_wait, 2.0);
        assert_eq!(res.completed[1].completion_time, 6.0);
        assert_eq!(res.completed[1].accumulated_wait, 2.0);

        let recs = sink.records();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].item_id.as_str(), "A");
        assert_eq!(recs[0].clock, 2.0);
        assert!(!recs[0].completed);
        assert_eq!(recs[1].item_id.as_str(), "B");
        assert!(recs[1].completed);
        assert_eq!(recs[2].clock, 6.0);
        assert_eq!(recs[2].queue_len, 0);
    }

    #[test]
    fn two_item_keep_trace_value_table() {
        let batch = specs(&[("A", 4.0), ("B", 2.0)]);
        let res = simulate(&batch, keep_controller(2), &mut NoopSink).unwrap();

        // Mean waits after each cycle: 1, 2, 2 -> all LOW.
        //   Q1 = 0.1 * -1                 = -0.1
        //   Q2 = -0.1 + 0.1 * (-2 + 0.1)  = -0.29
        //   Q3 = -0.29 + 0.1 * (-2 + 0.29) = -0.461
        let t = &res.value_table;
        assert!(t.is_visited(StateLabel::Low));
        assert!(!t.is_visited(StateLabel::Medium));
        assert!((t.get(StateLabel::Low, Action::Keep) + 0.461).abs() < 1e-12);
        assert_eq!(t.get(StateLabel::Low, Action::Decrease), 0.0);
        assert_eq!(t.get(StateLabel::Low, Action::Increase), 0.0);
    }

    #[test]
    fn single_item_runs_in_one_slice() {
        let batch = specs(&[("A", 5.0)]);
        let res = simulate(&batch, keep_controller(10), &mut NoopSink).unwrap();

        assert_eq!(res.cycles, 1);
        assert_eq!(res.completed.len(), 1);
        assert_eq!(res.completed[0].completion_time, 5.0);
        assert_eq!(res.completed[0].accumulated_wait, 0.0);
    }

    #[test]
    fn empty_batch_is_immediately_done() {
        let res = run(&[], 3).unwrap();
        assert!(res.completed.is_empty());
        assert_eq!(res.final_quantum, 3);
        assert!(res.value_table.is_empty());
        assert_eq!(res.cycles, 0);
    }

    #[test]
    fn negative_cost_fails_before_any_cycle() {
        let batch = specs(&[("A", 3.0), ("B", -1.0)]);
        let err = run(&batch, 2).unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(err.field(), "items[1].initial_cost");
    }

    #[test]
    fn zero_quantum_fails() {
        let err = run(&specs(&[("A", 3.0)]), 0).unwrap_err();
        assert_eq!(err.field(), "initial_quantum");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Dispatcher::new(&specs(&[("A", 1.0), ("A", 2.0)])).unwrap_err();
        assert_eq!(err.field(), "items[1].id");
    }

    #[test]
    fn zero_cost_item_takes_one_empty_cycle() {
        let batch = specs(&[("Z", 0.0), ("A", 2.0)]);
        let res = simulate(&batch, keep_controller(2), &mut NoopSink).unwrap();

        assert_eq!(res.cycles, 2);
        assert_eq!(res.completed[0].id.as_str(), "Z");
        assert_eq!(res.completed[0].completion_time, 0.0);
        assert_eq!(res.completed[1].completion_time, 2.0);
        assert_eq!(res.completed[1].accumulated_wait, 0.0);
    }

    #[test]
    fn fractional_costs_complete_exactly() {
        let batch = specs(&[("A", 2.5), ("B", 1.0)]);
        let res = simulate(&batch, keep_controller(2), &mut NoopSink).unwrap();

        // A:2 (B waits 2), B:1 done@3 (A waits 1), A:0.5 done@3.5
        assert_eq!(res.completed[0].id.as_str(), "B");
        assert_eq!(res.completed[0].completion_time, 3.0);
        assert_eq!(res.completed[1].completion_time, 3.5);
        assert_eq!(res.completed[1].accumulated_wait, 1.0);
    }

    #[test]
    fn phase_transitions_to_done() {
        let mut d = Dispatcher::new(&specs(&[("A", 1.0)])).unwrap();
        let mut ctl = keep_controller(1);
        assert_eq!(d.phase(), DispatcherPhase::Running);
        assert!(d.step(&mut ctl).is_some());
        assert_eq!(d.phase(), DispatcherPhase::Done);
        assert!(d.step(&mut ctl).is_none());
        assert_eq!(d.cycles(), 1);
    }

    #[test]
    fn seeded_run_reports_seed_and_replays() {
        let batch = specs(&[("A", 9.0), ("B", 4.0), ("C", 7.0)]);
        let cfg = SchedConfig {
            seed: Some(99),
            ..SchedConfig::default()
        };
        let a = run_with_config(&batch, &cfg).unwrap();
        let b = run_with_config(&batch, &cfg).unwrap();
        assert_eq!(a.seed, Some(99));
        assert_eq!(a, b);
    }

    #[test]
    fn run_from_table_starts_from_learned_values() {
        let mut table = ValueTable::new();
        table.set(StateLabel::Low, Action::Increase, 3.0);
        let cfg = SchedConfig {
            initial_quantum: 2,
            learning: LearningConfig {
                epsilon: 0.0,
                ..LearningConfig::default()
            },
            seed: Some(1),
            ..SchedConfig::default()
        };

        let mut sink = MemorySink::new();
        let res = run_from_table(&specs(&[("A", 1.0)]), &cfg, Some(table), &mut sink).unwrap();
        assert_eq!(sink.records()[0].action, Action::Increase);
        assert_eq!(res.final_quantum, 3);
        assert_eq!(res.seed, Some(1));
    }

    #[test]
    fn result_names_the_policy() {
        let res = simulate(&specs(&[("A", 1.0)]), keep_controller(1), &mut NoopSink).unwrap();
        assert_eq!(res.policy, crate::rl::FIXED_POLICY_VERSION);

        let cfg = SchedConfig {
            seed: Some(4),
            ..SchedConfig::default()
        };
        let res = run_with_config(&specs(&[("A", 1.0)]), &cfg).unwrap();
        assert_eq!(res.policy, crate::rl::EPSILON_GREEDY_POLICY_VERSION);
    }

    #[test]
    fn custom_thresholds_change_classification() {
        let batch = specs(&[("A", 4.0), ("B", 2.0)]);
        let thresholds = StateThresholds { low: 0.5, high: 1.5 };
        let d = Dispatcher::new(&batch).unwrap().with_thresholds(thresholds);
        let res = simulate_with(d, keep_controller(2), &mut NoopSink);

        // Mean waits 0 -> LOW, then 1 -> MEDIUM.
        assert!(res.value_table.is_visited(StateLabel::Low));
        assert!(res.value_table.is_visited(StateLabel::Medium));
    }
}
