// src/main.rs
//
// Thin harness around the qslice library: read one scheduling request as
// JSON, run it, print the result as JSON.
//
// Request shape (same body the HTTP service accepted):
//   { "processes": [ { "id": "P1", "burstTime": 4 }, ... ], "initialQuantum": 2 }
// snake_case spellings ("items", "initial_cost", "initial_quantum") also work.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use qslice::config::{ExplorationProfile, SchedConfig};
use qslice::rl::EPSILON_GREEDY_POLICY_VERSION;
use qslice::{
    run_from_table, EventSink, FileSink, NoopSink, SchedError, ScheduleMetrics, SchedulingResult,
    ValueTable, WorkItemSpec,
};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ProfileArg {
    Greedy,
    Balanced,
    Exploratory,
}

impl From<ProfileArg> for ExplorationProfile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::Greedy => ExplorationProfile::Greedy,
            ProfileArg::Balanced => ExplorationProfile::Balanced,
            ProfileArg::Exploratory => ExplorationProfile::Exploratory,
        }
    }
}

/// Command-line arguments for the qslice binary.
#[derive(Debug, Parser)]
#[command(
    name = "qslice",
    about = "Round-robin scheduling simulation with a learned time quantum",
    version
)]
struct Cli {
    /// JSON request file. Reads stdin when omitted or "-".
    #[arg(long)]
    input: Option<PathBuf>,

    /// Exploration preset. If omitted, uses QSLICE_PROFILE (default Balanced).
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Starting quantum when the request does not carry one.
    #[arg(long)]
    initial_quantum: Option<u32>,

    /// Optional ceiling for the quantum (unbounded by default).
    #[arg(long)]
    max_quantum: Option<u32>,

    /// Exploration probability, overrides the profile.
    #[arg(long)]
    epsilon: Option<f64>,

    /// Seed for the exploration RNG. A fresh seed is drawn and reported otherwise.
    #[arg(long)]
    seed: Option<u64>,

    /// Value table (as printed in a previous result) to start learning from.
    #[arg(long)]
    seed_table: Option<PathBuf>,

    /// Write one JSON record per dispatch cycle to this file.
    #[arg(long)]
    trace_jsonl: Option<PathBuf>,

    /// Include a per-run metrics summary in the response.
    #[arg(long)]
    metrics: bool,

    /// Single-line JSON output.
    #[arg(long)]
    compact: bool,

    /// Verbosity: -v prints the run header on stderr.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Deserialize)]
struct ScheduleRequest {
    #[serde(default, alias = "items")]
    processes: Option<Vec<WorkItemSpec>>,
    #[serde(default, alias = "initialQuantum")]
    initial_quantum: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ScheduleResponse<'a> {
    message: &'static str,
    result: &'a SchedulingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<ScheduleMetrics>,
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).with_context(|| format!("failed to read request {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read request from stdin")?;
            Ok(buf)
        }
    }
}

/// Build the telemetry sink as a trait object so we can choose between
/// FileSink and NoopSink at runtime.
fn build_sink(trace_jsonl: Option<&Path>) -> Box<dyn EventSink> {
    if let Some(path) = trace_jsonl {
        match FileSink::create(path) {
            Ok(s) => Box::new(s),
            Err(err) => {
                eprintln!(
                    "Failed to create trace file ({}), falling back to NoopSink: {err}",
                    path.display()
                );
                Box::new(NoopSink)
            }
        }
    } else {
        Box::new(NoopSink)
    }
}

/// The request's quantum must be a whole number >= 1 (`2` and `2.0` both work).
fn request_quantum(q: f64) -> Result<u32, SchedError> {
    if q.is_finite() && q.fract() == 0.0 && q >= 1.0 && q <= f64::from(u32::MAX) {
        Ok(q as u32)
    } else {
        Err(SchedError::invalid_input(
            "initialQuantum",
            format!("must be a whole number >= 1, got {q}"),
        ))
    }
}

/// Profile + env first, then CLI flags, then the request's own quantum.
fn build_config(cli: &Cli, request_q: Option<f64>) -> Result<SchedConfig> {
    let mut cfg = match cli.profile {
        Some(p) => SchedConfig::from_env_or_profile(p.into()),
        None => SchedConfig::from_env_or_default(),
    };

    if let Some(q) = cli.initial_quantum {
        cfg.initial_quantum = q;
    }
    if let Some(max_q) = cli.max_quantum {
        cfg.max_quantum = Some(max_q);
    }
    if let Some(eps) = cli.epsilon {
        cfg.learning.epsilon = eps;
    }
    if let Some(seed) = cli.seed {
        cfg.seed = Some(seed);
    }

    if let Some(q) = request_q {
        cfg.initial_quantum = request_quantum(q)?;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn load_table(path: &Path) -> Result<ValueTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read value table {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse value table {}", path.display()))
}

fn try_main(cli: Cli) -> Result<()> {
    let raw = read_input(cli.input.as_deref())?;
    let request: ScheduleRequest =
        serde_json::from_str(&raw).context("failed to parse scheduling request")?;

    let Some(items) = request.processes else {
        bail!("Invalid processes array");
    };

    let cfg = build_config(&cli, request.initial_quantum)?;

    if cli.verbose > 0 {
        eprintln!(
            "qslice v{} | cfg={} policy={} items={} initial_quantum={} max_quantum={} epsilon={} seed={}",
            env!("CARGO_PKG_VERSION"),
            cfg.version,
            EPSILON_GREEDY_POLICY_VERSION,
            items.len(),
            cfg.initial_quantum,
            cfg.max_quantum
                .map(|q| q.to_string())
                .unwrap_or_else(|| "-".to_string()),
            cfg.learning.epsilon,
            cfg.seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "random".to_string())
        );
    }

    let table = cli.seed_table.as_deref().map(load_table).transpose()?;
    let mut sink = build_sink(cli.trace_jsonl.as_deref());
    let result = run_from_table(&items, &cfg, table, sink.as_mut())?;

    let response = ScheduleResponse {
        message: "Hybrid Scheduling Complete",
        result: &result,
        metrics: cli.metrics.then(|| ScheduleMetrics::from_result(&result)),
    };

    let out = if cli.compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };
    println!("{out}");

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_quantum_accepts_whole_numbers() {
        assert_eq!(request_quantum(2.0).unwrap(), 2);
        assert_eq!(request_quantum(1.0).unwrap(), 1);
    }

    #[test]
    fn request_quantum_rejects_fractions_and_non_positive() {
        for q in [0.0, -3.0, 2.5, f64::NAN, f64::INFINITY, 1e12] {
            let err = request_quantum(q).unwrap_err();
            assert_eq!(err.field(), "initialQuantum");
        }
    }

    #[test]
    fn float_quantum_in_request_parses() {
        let req: ScheduleRequest =
            serde_json::from_str(r#"{"processes":[],"initialQuantum":2.0}"#).unwrap();
        assert_eq!(req.initial_quantum, Some(2.0));
        let req: ScheduleRequest = serde_json::from_str(r#"{"processes":[],"initialQuantum":3}"#).unwrap();
        assert_eq!(req.initial_quantum, Some(3.0));
    }
}
