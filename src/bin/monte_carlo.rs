// src/bin/monte_carlo.rs
//
// Monte Carlo research harness: adaptive quantum vs static round-robin.
//
// Goals:
// - Deterministic multi-run evaluation using seed offsets (run i uses seed + i
//   for both the workload and the exploration stream).
// - Every sampled batch is scheduled twice: once by the learning controller,
//   once with the quantum pinned (FixedPolicy(KEEP)) as the baseline.
// - Output is identical for any --threads value.
//
// Run examples:
//   cargo run --bin monte_carlo -- --runs 200 --seed 7
//   QSLICE_PROFILE=greedy cargo run --bin monte_carlo -- --runs 100 --items 20 --quiet
//   cargo run --bin monte_carlo -- --runs 500 --threads 4 --csv runs.csv

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use rayon::prelude::*;

use qslice::config::{resolve_profile, ExplorationProfile, SchedConfig};
use qslice::metrics::{p05_p50_p95, OnlineStats, ScheduleMetrics};
use qslice::{
    run_with_config, simulate, FixedPolicy, NoopSink, QuantumController, SchedResult,
    WorkloadConfig, WorkloadSampler,
};

const DEFAULT_RUNS: usize = 50;
const DEFAULT_SEED: u64 = 1;
const DEFAULT_PRINT_EVERY: usize = 1;
const DEFAULT_THREADS: usize = 1;

#[derive(Debug, Clone)]
struct Args {
    runs: usize,
    seed: u64,
    profile: Option<ExplorationProfile>,
    initial_quantum: Option<u32>,
    items: Option<usize>,
    heavy_prob: Option<f64>,
    threads: usize,
    quiet: bool,
    print_every: usize,
    csv_out: Option<PathBuf>,
}

impl Args {
    fn usage() -> &'static str {
        "\
qslice Monte Carlo harness (adaptive vs static quantum)

USAGE:
  cargo run --bin monte_carlo -- [FLAGS]

PROFILE PRECEDENCE:
  1) --profile overrides environment
  2) else QSLICE_PROFILE
  3) else Balanced

FLAGS:
  --profile NAME         Greedy | Balanced | Exploratory
  --runs N               Number of runs (default: 50)
  --seed U64             Base seed (default: 1). Run i uses seed + i.
  --initial-quantum Q    Starting quantum for both schedulers (default: 2)
  --items N              Fixed batch size (default: 3..=12 sampled)
  --heavy-prob P         Probability of a long job (default: 0.1)
  --threads N            Worker threads (default: 1). Output does not depend on it.
  --print-every N        Print every N runs (default: 1). Ignored with --quiet.
  --csv PATH             Write per-run CSV rows to PATH
  --quiet                Suppress per-run lines; only print final summary
  --help                 Show this help
"
    }

    fn parse_or_exit() -> Self {
        match Self::parse(env::args().skip(1)) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("{e}\n\n{}", Self::usage());
                std::process::exit(2);
            }
        }
    }

    fn parse(argv: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut out = Args {
            runs: DEFAULT_RUNS,
            seed: DEFAULT_SEED,
            profile: None,
            initial_quantum: None,
            items: None,
            heavy_prob: None,
            threads: DEFAULT_THREADS,
            quiet: false,
            print_every: DEFAULT_PRINT_EVERY,
            csv_out: None,
        };

        let mut it = argv;

        while let Some(arg) = it.next() {
            // Support --flag=value style for convenience.
            let (flag, inline) = match arg.split_once('=') {
                Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
                _ => (arg.clone(), None),
            };
            let mut value = |name: &str| -> Result<String, String> {
                match inline.clone() {
                    Some(v) => Ok(v),
                    None => it.next().ok_or_else(|| format!("Missing value for {name}")),
                }
            };

            match flag.as_str() {
                "--help" | "-h" => {
                    println!("{}", Self::usage());
                    std::process::exit(0);
                }
                "--quiet" => out.quiet = true,

                "--profile" => {
                    let v = value("--profile")?;
                    out.profile = Some(ExplorationProfile::parse(&v).ok_or_else(|| {
                        "Invalid --profile. Expected: Greedy | Balanced | Exploratory".to_string()
                    })?);
                }
                "--runs" => {
                    out.runs = value("--runs")?
                        .parse::<usize>()
                        .map_err(|_| "Invalid --runs (expected integer)".to_string())?;
                    if out.runs == 0 {
                        return Err("--runs must be >= 1".to_string());
                    }
                }
                "--seed" => {
                    out.seed = value("--seed")?
                        .parse::<u64>()
                        .map_err(|_| "Invalid --seed (expected u64)".to_string())?;
                }
                "--initial-quantum" => {
                    let q = value("--initial-quantum")?
                        .parse::<u32>()
                        .map_err(|_| "Invalid --initial-quantum (expected integer)".to_string())?;
                    if q == 0 {
                        return Err("--initial-quantum must be >= 1".to_string());
                    }
                    out.initial_quantum = Some(q);
                }
                "--items" => {
                    let n = value("--items")?
                        .parse::<usize>()
                        .map_err(|_| "Invalid --items (expected integer)".to_string())?;
                    if n == 0 {
                        return Err("--items must be >= 1".to_string());
                    }
                    out.items = Some(n);
                }
                "--heavy-prob" => {
                    let p = value("--heavy-prob")?
                        .parse::<f64>()
                        .map_err(|_| "Invalid --heavy-prob (expected float)".to_string())?;
                    if !(0.0..=1.0).contains(&p) {
                        return Err("--heavy-prob must be in [0, 1]".to_string());
                    }
                    out.heavy_prob = Some(p);
                }
                "--threads" => {
                    out.threads = value("--threads")?
                        .parse::<usize>()
                        .map_err(|_| "Invalid --threads (expected integer)".to_string())?;
                    if out.threads == 0 {
                        return Err("--threads must be >= 1".to_string());
                    }
                }
                "--print-every" => {
                    out.print_every = value("--print-every")?
                        .parse::<usize>()
                        .map_err(|_| "Invalid --print-every (expected integer)".to_string())?;
                    if out.print_every == 0 {
                        return Err("--print-every must be >= 1".to_string());
                    }
                }
                "--csv" => {
                    out.csv_out = Some(PathBuf::from(value("--csv")?));
                }

                other => return Err(format!("Unknown argument: {other}")),
            }
        }

        Ok(out)
    }
}

#[derive(Debug, Clone)]
struct RunResult {
    run_index: usize,
    seed: u64,
    items: usize,
    adaptive: ScheduleMetrics,
    baseline: ScheduleMetrics,
}

fn workload_config(args: &Args) -> WorkloadConfig {
    let mut wl = WorkloadConfig::default();
    if let Some(n) = args.items {
        wl.items_range = (n, n);
    }
    if let Some(p) = args.heavy_prob {
        wl.heavy_prob = p;
    }
    wl
}

fn run_once(
    cfg: &SchedConfig,
    wl: &WorkloadConfig,
    run_index: usize,
    seed: u64,
) -> SchedResult<RunResult> {
    let batch = WorkloadSampler::new(wl.clone(), seed).sample();

    let adaptive_cfg = SchedConfig {
        seed: Some(seed),
        ..cfg.clone()
    };
    let adaptive = run_with_config(&batch, &adaptive_cfg)?;

    let static_ctl = QuantumController::from_config(cfg, FixedPolicy::keep())?;
    let baseline = simulate(&batch, static_ctl, &mut NoopSink)?;

    Ok(RunResult {
        run_index,
        seed,
        items: batch.len(),
        adaptive: ScheduleMetrics::from_result(&adaptive),
        baseline: ScheduleMetrics::from_result(&baseline),
    })
}

/// Run all batches on a pool of `args.threads` workers.
/// Results come back in run-index order.
fn run_all(cfg: &SchedConfig, wl: &WorkloadConfig, args: &Args) -> Result<Vec<RunResult>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .context("failed to build worker pool")?;

    let results = pool.install(|| {
        (0..args.runs)
            .into_par_iter()
            .map(|i| run_once(cfg, wl, i, args.seed.wrapping_add(i as u64)))
            .collect::<SchedResult<Vec<_>>>()
    })?;

    Ok(results)
}

#[derive(Default)]
struct SideStats {
    mean_wait: OnlineStats,
    mean_turnaround: OnlineStats,
    preemptions: OnlineStats,
    final_quantum: OnlineStats,
    wait_samples: Vec<f64>,
}

impl SideStats {
    fn add(&mut self, m: &ScheduleMetrics) {
        self.mean_wait.add(m.mean_wait);
        self.mean_turnaround.add(m.mean_turnaround);
        self.preemptions.add(m.preemptions as f64);
        self.final_quantum.add(f64::from(m.final_quantum));
        self.wait_samples.push(m.mean_wait);
    }

    fn print(&self, label: &str) {
        let (p05, p50, p95) = p05_p50_p95(self.wait_samples.clone());
        println!("  {label}");
        println!(
            "    mean_wait:       mean={:.4}  std(pop)={:.4}  min={:.4}  max={:.4}  p05={:.4}  p50={:.4}  p95={:.4}",
            self.mean_wait.mean(),
            self.mean_wait.stddev_population(),
            self.mean_wait.min(),
            self.mean_wait.max(),
            p05,
            p50,
            p95
        );
        println!(
            "    mean_turnaround: mean={:.4}  std(pop)={:.4}",
            self.mean_turnaround.mean(),
            self.mean_turnaround.stddev_population()
        );
        println!(
            "    preemptions:     mean={:.2}  max={:.0}",
            self.preemptions.mean(),
            self.preemptions.max()
        );
        println!(
            "    final_quantum:   mean={:.2}  min={:.0}  max={:.0}",
            self.final_quantum.mean(),
            self.final_quantum.min(),
            self.final_quantum.max()
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse_or_exit();

    let (profile, profile_src) = resolve_profile(args.profile);
    let mut cfg = SchedConfig::from_env_or_profile(profile);
    if let Some(q) = args.initial_quantum {
        cfg.initial_quantum = q;
    }
    cfg.validate().context("invalid scheduler configuration")?;
    let wl = workload_config(&args);

    println!(
        "qslice-mc v{} | profile={} ({}) runs={} seed={} initial_quantum={} epsilon={} items={:?} heavy_prob={} threads={} csv={}",
        env!("CARGO_PKG_VERSION"),
        profile.name(),
        profile_src,
        args.runs,
        args.seed,
        cfg.initial_quantum,
        cfg.learning.epsilon,
        wl.items_range,
        wl.heavy_prob,
        args.threads,
        args.csv_out
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    let results = run_all(&cfg, &wl, &args).context("simulation failed")?;

    let mut csv = match args.csv_out.as_ref() {
        Some(path) => {
            let f = File::create(path)
                .with_context(|| format!("failed to create CSV file {}", path.display()))?;
            let mut w = BufWriter::new(f);
            writeln!(
                w,
                "run,seed,items,adaptive_mean_wait,adaptive_mean_turnaround,adaptive_preemptions,adaptive_final_quantum,static_mean_wait,static_mean_turnaround,static_preemptions"
            )?;
            Some(w)
        }
        None => None,
    };

    let mut adaptive = SideStats::default();
    let mut baseline = SideStats::default();
    let mut wins: u64 = 0;
    let mut ties: u64 = 0;

    for r in &results {
        adaptive.add(&r.adaptive);
        baseline.add(&r.baseline);

        let diff = r.adaptive.mean_wait - r.baseline.mean_wait;
        if diff.abs() < 1e-9 {
            ties += 1;
        } else if diff < 0.0 {
            wins += 1;
        }

        if let Some(w) = csv.as_mut() {
            writeln!(
                w,
                "{},{},{},{:.6},{:.6},{},{},{:.6},{:.6},{}",
                r.run_index + 1,
                r.seed,
                r.items,
                r.adaptive.mean_wait,
                r.adaptive.mean_turnaround,
                r.adaptive.preemptions,
                r.adaptive.final_quantum,
                r.baseline.mean_wait,
                r.baseline.mean_turnaround,
                r.baseline.preemptions
            )?;
        }

        let i = r.run_index;
        let should_print = !args.quiet
            && (args.print_every == 1 || ((i + 1) % args.print_every == 0) || (i + 1 == args.runs));

        if should_print {
            println!(
                "run {:>4}/{:<4} seed={:<10} items={:>3} wait(adaptive)={:>9.4} wait(static)={:>9.4} q_final={:>3} preempt={:>4}/{:<4}",
                i + 1,
                args.runs,
                r.seed,
                r.items,
                r.adaptive.mean_wait,
                r.baseline.mean_wait,
                r.adaptive.final_quantum,
                r.adaptive.preemptions,
                r.baseline.preemptions
            );
        }
    }

    if let Some(mut w) = csv {
        w.flush()?;
    }

    let n = results.len() as f64;
    println!();
    println!("SUMMARY");
    println!("  runs:              {}", results.len());
    println!(
        "  adaptive_better:   {:.2}% ({} / {}), ties={}",
        100.0 * (wins as f64) / n,
        wins,
        results.len(),
        ties
    );
    adaptive.print("adaptive:");
    baseline.print("static:");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults() {
        let a = parse(&[]).unwrap();
        assert_eq!(a.runs, DEFAULT_RUNS);
        assert_eq!(a.seed, DEFAULT_SEED);
        assert_eq!(a.threads, 1);
        assert!(!a.quiet);
    }

    #[test]
    fn both_flag_styles() {
        let a = parse(&["--runs", "5", "--seed=9", "--profile=greedy", "--quiet"]).unwrap();
        assert_eq!(a.runs, 5);
        assert_eq!(a.seed, 9);
        assert_eq!(a.profile, Some(ExplorationProfile::Greedy));
        assert!(a.quiet);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["--runs", "0"]).is_err());
        assert!(parse(&["--initial-quantum=0"]).is_err());
        assert!(parse(&["--heavy-prob", "2"]).is_err());
        assert!(parse(&["--threads"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
    }

    #[test]
    fn thread_count_does_not_change_results() {
        let cfg = SchedConfig::default();
        let wl = WorkloadConfig::default();

        let mut one = parse(&["--runs", "9", "--seed", "3"]).unwrap();
        one.threads = 1;
        let mut four = one.clone();
        four.threads = 4;

        let a = run_all(&cfg, &wl, &one).unwrap();
        let b = run_all(&cfg, &wl, &four).unwrap();
        assert_eq!(a.len(), 9);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.run_index, y.run_index);
            assert_eq!(x.adaptive, y.adaptive);
            assert_eq!(x.baseline, y.baseline);
        }
    }
}
