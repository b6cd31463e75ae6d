//! Solver configuration.
//!
//! Every struct deserializes with `#[serde(default)]`, so a JSON document only
//! needs the knobs it changes:
//!
//! ```json
//! {
//!   "termination": { "epsilon": 0.001 },
//!   "strategy": { "kind": "line_search", "t": 0.2, "backoff": 0.3,
//!                 "numeraire": { "reference": "average", "target": 10.0 } }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::market::Badness;
use crate::search::{AdaptiveConfig, ElasticConfig, LineSearchConfig, MomentumConfig};

// ============================================================================
// Termination - when a run stops
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Termination {
    /// Converged once `metric` drops below this.
    pub epsilon: f64,
    /// Stopping metric.
    pub metric: Badness,
    /// Outer-step cap for the backtracking strategies (momentum strategies
    /// carry their own iteration cap).
    pub max_steps: Option<u64>,
    /// Record every accepted iterate in the solution.
    pub keep_history: bool,
}

impl Default for Termination {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            metric: Badness::Absolute,
            max_steps: None,
            keep_history: false,
        }
    }
}

impl Termination {
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SolverResult<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(SolverError::config(
                "termination.epsilon",
                format!("must be positive, got {}", self.epsilon),
            ));
        }
        if self.max_steps == Some(0) {
            return Err(SolverError::config("termination.max_steps", "must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Backtracking - acceptance test and give-up policy shared by the
// line-search family
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backtracking {
    /// Metric used by the acceptance test.
    pub acceptance: Badness,
    /// A trial is accepted when `necessary_improvement * new <= old`.
    pub necessary_improvement: f64,
    /// Applied to the working tolerance after every rejected trial in a step.
    pub decay: f64,
    /// Applied to the carried tolerance after a step gives up.
    pub loosening: f64,
    /// How fast the carried tolerance returns to `necessary_improvement`
    /// after an accepted step.
    pub recovery: f64,
    /// Trials per outer step before giving up on it.
    pub max_trials: u32,
    /// Consecutive stalled steps before the run stops. A step stalls when it
    /// gives up, or when its accepted trial does not beat the best stopping
    /// badness so far.
    pub max_give_ups: u32,
}

impl Default for Backtracking {
    fn default() -> Self {
        Self {
            acceptance: Badness::Absolute,
            necessary_improvement: 1.0,
            decay: 1.0,
            loosening: 0.8,
            recovery: 0.5,
            max_trials: 20,
            max_give_ups: 10,
        }
    }
}

impl Backtracking {
    pub fn validate(&self) -> SolverResult<()> {
        positive("backtracking.necessary_improvement", self.necessary_improvement)?;
        unit_interval("backtracking.decay", self.decay)?;
        unit_interval("backtracking.loosening", self.loosening)?;
        unit_interval("backtracking.recovery", self.recovery)?;
        if self.max_trials == 0 {
            return Err(SolverError::config("backtracking.max_trials", "must be at least 1"));
        }
        if self.max_give_ups == 0 {
            return Err(SolverError::config("backtracking.max_give_ups", "must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Strategy selection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    LineSearch(LineSearchConfig),
    Adaptive(AdaptiveConfig),
    Elastic(ElasticConfig),
    Momentum(MomentumConfig),
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::LineSearch(LineSearchConfig::default())
    }
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::LineSearch(_) => "line_search",
            Strategy::Adaptive(_) => "adaptive",
            Strategy::Elastic(_) => "elastic",
            Strategy::Momentum(_) => "momentum",
        }
    }
}

impl From<LineSearchConfig> for Strategy {
    fn from(config: LineSearchConfig) -> Self {
        Strategy::LineSearch(config)
    }
}

impl From<AdaptiveConfig> for Strategy {
    fn from(config: AdaptiveConfig) -> Self {
        Strategy::Adaptive(config)
    }
}

impl From<ElasticConfig> for Strategy {
    fn from(config: ElasticConfig) -> Self {
        Strategy::Elastic(config)
    }
}

impl From<MomentumConfig> for Strategy {
    fn from(config: MomentumConfig) -> Self {
        Strategy::Momentum(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub termination: Termination,
    pub strategy: Strategy,
}

impl SolverConfig {
    pub fn new(strategy: impl Into<Strategy>, termination: Termination) -> Self {
        Self {
            termination,
            strategy: strategy.into(),
        }
    }

    pub fn from_json(json: &str) -> SolverResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SolverResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every knob against a price vector of `width` listings.
    pub fn validate(&self, width: usize) -> SolverResult<()> {
        self.termination.validate()?;
        match &self.strategy {
            Strategy::LineSearch(c) => c.validate(width),
            Strategy::Adaptive(c) => c.validate(width),
            Strategy::Elastic(c) => c.validate(width),
            Strategy::Momentum(c) => c.validate(width),
        }
    }
}

// === VALIDATION HELPERS ===

pub(crate) fn positive(field: &'static str, value: f64) -> SolverResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SolverError::config(field, format!("must be positive, got {value}")))
    }
}

pub(crate) fn unit_interval(field: &'static str, value: f64) -> SolverResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(SolverError::config(field, format!("must be in (0, 1], got {value}")))
    }
}
