//! qslice core library.
//!
//! A single-server round-robin scheduling simulator whose time quantum is
//! tuned online by a tabular Q-learning controller. The binaries
//! (`src/main.rs`, `src/bin/monte_carlo.rs`) are thin harnesses around these
//! components.

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod rl;
pub mod types;
pub mod workload;

// --- Re-exports for ergonomic external use ---------------------------------

pub use classifier::{classify, mean_wait};

pub use config::{ExplorationProfile, LearningConfig, SchedConfig, StateThresholds};

pub use dispatcher::{
    run, run_from_table, run_with_config, run_with_sink, simulate, simulate_with, Dispatcher,
    DispatcherPhase, SchedulingResult,
};

pub use error::{SchedError, SchedResult};

pub use logging::{CycleRecord, EventSink, FileSink, MemorySink, NoopSink};

pub use metrics::{OnlineStats, ScheduleMetrics};

pub use rl::{EpsilonGreedy, FixedPolicy, Policy, QuantumController, ValueTable};

pub use types::{Action, CompletedItem, ItemId, StateLabel, WorkItem, WorkItemSpec};

pub use workload::{WorkloadConfig, WorkloadSampler};
