// src/config.rs
//
// Central configuration for the scheduling simulator.
//
// The defaults reproduce the reference algorithm exactly:
//   initial quantum = 2, epsilon = 0.2, alpha = 0.1, gamma = 0.9,
//   state thresholds LOW < 5 <= MEDIUM < 15 <= HIGH, no quantum ceiling.
//
// Everything is exposed so research harnesses can sweep it, but any change
// away from these values changes the reference behaviour.

use crate::error::{SchedError, SchedResult};
use crate::types::StateLabel;

/// Default slice bound at the start of a run.
pub const DEFAULT_INITIAL_QUANTUM: u32 = 2;
/// Default exploration probability.
pub const DEFAULT_EPSILON: f64 = 0.2;
/// Default learning rate.
pub const DEFAULT_ALPHA: f64 = 0.1;
/// Default discount factor.
pub const DEFAULT_GAMMA: f64 = 0.9;
/// Mean wait below this is LOW.
pub const LOW_WAIT_THRESHOLD: f64 = 5.0;
/// Mean wait at or above this is HIGH.
pub const HIGH_WAIT_THRESHOLD: f64 = 15.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedConfig {
    /// Human-readable config version, echoed by the binaries.
    pub version: &'static str,
    /// Quantum the controller starts from. Must be >= 1.
    pub initial_quantum: u32,
    /// Optional ceiling for INCREASE. `None` reproduces the reference
    /// behaviour (unbounded growth).
    pub max_quantum: Option<u32>,
    /// Q-learning hyperparameters.
    pub learning: LearningConfig,
    /// Mean-wait bucket boundaries.
    pub thresholds: StateThresholds,
    /// Seed for the exploration RNG. `None` draws a fresh seed per run.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningConfig {
    /// Learning rate α in (0, 1].
    pub alpha: f64,
    /// Discount factor γ in [0, 1].
    pub gamma: f64,
    /// Exploration probability ε in [0, 1].
    pub epsilon: f64,
}

/// Boundaries of the LOW / MEDIUM / HIGH buckets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateThresholds {
    /// Mean wait strictly below this is LOW.
    pub low: f64,
    /// Mean wait at or above this is HIGH.
    pub high: f64,
}

/// Exploration preset used by the CLI / research harness.
///
/// Presets only change epsilon; Balanced is the reference setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationProfile {
    /// Pure exploitation (ε = 0). Fully deterministic.
    Greedy,
    Balanced,
    Exploratory,
}

impl ExplorationProfile {
    pub fn name(self) -> &'static str {
        match self {
            ExplorationProfile::Greedy => "Greedy",
            ExplorationProfile::Balanced => "Balanced",
            ExplorationProfile::Exploratory => "Exploratory",
        }
    }

    /// Parse a profile name (case-insensitive, short aliases allowed).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" | "g" => Some(ExplorationProfile::Greedy),
            "balanced" | "bal" | "b" | "" => Some(ExplorationProfile::Balanced),
            "exploratory" | "explore" | "e" => Some(ExplorationProfile::Exploratory),
            _ => None,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            gamma: DEFAULT_GAMMA,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl Default for StateThresholds {
    fn default() -> Self {
        Self {
            low: LOW_WAIT_THRESHOLD,
            high: HIGH_WAIT_THRESHOLD,
        }
    }
}

impl StateThresholds {
    /// Bucket a mean waiting time.
    pub fn classify(&self, mean_wait: f64) -> StateLabel {
        if mean_wait < self.low {
            StateLabel::Low
        } else if mean_wait < self.high {
            StateLabel::Medium
        } else {
            StateLabel::High
        }
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            version: "qslice-cfg-v1",
            initial_quantum: DEFAULT_INITIAL_QUANTUM,
            max_quantum: None,
            learning: LearningConfig::default(),
            thresholds: StateThresholds::default(),
            seed: None,
        }
    }
}

// --- Validation ---------------------------------------------------------------

impl SchedConfig {
    /// Reject configurations the controller cannot run with.
    pub fn validate(&self) -> SchedResult<()> {
        if self.initial_quantum == 0 {
            return Err(SchedError::invalid_input(
                "initial_quantum",
                "must be >= 1, got 0",
            ));
        }
        if let Some(max_q) = self.max_quantum {
            if max_q < self.initial_quantum {
                return Err(SchedError::invalid_input(
                    "max_quantum",
                    format!(
                        "must be >= initial_quantum ({}), got {max_q}",
                        self.initial_quantum
                    ),
                ));
            }
        }
        self.learning.validate()?;
        self.thresholds.validate()?;
        Ok(())
    }
}

impl LearningConfig {
    pub fn validate(&self) -> SchedResult<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(SchedError::invalid_input(
                "learning.alpha",
                format!("must be in (0, 1], got {}", self.alpha),
            ));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(SchedError::invalid_input(
                "learning.gamma",
                format!("must be in [0, 1], got {}", self.gamma),
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(SchedError::invalid_input(
                "learning.epsilon",
                format!("must be in [0, 1], got {}", self.epsilon),
            ));
        }
        Ok(())
    }
}

impl StateThresholds {
    pub fn validate(&self) -> SchedResult<()> {
        if !(self.low.is_finite() && self.high.is_finite()) || self.low < 0.0 || self.low > self.high
        {
            return Err(SchedError::invalid_input(
                "thresholds",
                format!(
                    "expected 0 <= low <= high, got low={} high={}",
                    self.low, self.high
                ),
            ));
        }
        Ok(())
    }
}

// --- Runtime config loader: profiles + env overrides -------------------------

/// Parse an env var, logging the outcome. Unset variables are silent.
fn env_override<T>(name: &str, current: &str) -> Option<T>
where
    T: std::str::FromStr + std::fmt::Display,
{
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => {
            eprintln!("[config] {name} = {v} (overrode default)");
            Some(v)
        }
        Err(_) => {
            eprintln!("[config] WARN: could not parse {name} = {raw:?}; using default {current}");
            None
        }
    }
}

impl SchedConfig {
    pub fn for_profile(profile: ExplorationProfile) -> Self {
        let mut cfg = SchedConfig::default();

        match profile {
            ExplorationProfile::Greedy => {
                cfg.learning.epsilon = 0.0;
            }
            ExplorationProfile::Balanced => {
                // Reference setting.
            }
            ExplorationProfile::Exploratory => {
                cfg.learning.epsilon = 0.4;
            }
        }

        cfg
    }

    /// Build a config from a profile, then apply environment overrides:
    ///
    ///   - QSLICE_INITIAL_QUANTUM  (u32, >= 1)
    ///   - QSLICE_MAX_QUANTUM      (u32)
    ///   - QSLICE_EPSILON          (f64, in [0, 1])
    ///   - QSLICE_ALPHA            (f64)
    ///   - QSLICE_GAMMA            (f64)
    ///   - QSLICE_SEED             (u64)
    ///
    /// Any variable that fails to parse is ignored with a warning. Range
    /// problems are left for `validate`.
    pub fn from_env_or_profile(profile: ExplorationProfile) -> Self {
        let mut cfg = SchedConfig::for_profile(profile);

        if let Some(q) = env_override::<u32>(
            "QSLICE_INITIAL_QUANTUM",
            &cfg.initial_quantum.to_string(),
        ) {
            cfg.initial_quantum = q;
        }
        if let Some(q) = env_override::<u32>("QSLICE_MAX_QUANTUM", "none") {
            cfg.max_quantum = Some(q);
        }
        if let Some(eps) = env_override::<f64>("QSLICE_EPSILON", &cfg.learning.epsilon.to_string())
        {
            cfg.learning.epsilon = eps;
        }
        if let Some(alpha) = env_override::<f64>("QSLICE_ALPHA", &cfg.learning.alpha.to_string()) {
            cfg.learning.alpha = alpha;
        }
        if let Some(gamma) = env_override::<f64>("QSLICE_GAMMA", &cfg.learning.gamma.to_string()) {
            cfg.learning.gamma = gamma;
        }
        if let Some(seed) = env_override::<u64>("QSLICE_SEED", "random") {
            cfg.seed = Some(seed);
        }

        cfg
    }

    /// Pick the profile from QSLICE_PROFILE (default Balanced), then apply
    /// all other env overrides.
    pub fn from_env_or_default() -> Self {
        Self::from_env_or_profile(resolve_profile(None).0)
    }
}

/// Resolve the effective profile: CLI first, then QSLICE_PROFILE, then Balanced.
///
/// Returns the profile and where it came from ("cli", "env" or "default").
pub fn resolve_profile(cli: Option<ExplorationProfile>) -> (ExplorationProfile, &'static str) {
    if let Some(p) = cli {
        return (p, "cli");
    }
    if let Ok(raw) = std::env::var("QSLICE_PROFILE") {
        match ExplorationProfile::parse(&raw) {
            Some(p) => return (p, "env"),
            None => {
                eprintln!("[config] WARN: unknown QSLICE_PROFILE = {raw:?}; using Balanced");
            }
        }
    }
    (ExplorationProfile::Balanced, "default")
}
