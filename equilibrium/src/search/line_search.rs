use serde::{Deserialize, Serialize};

use crate::config::{Backtracking, Termination, positive, unit_interval};
use crate::error::SolverResult;
use crate::market::{Market, Numeraire, Participant};

use super::backtrack::{self, Iterate, StepRule};
use super::{Solution, adapt_prices};

/// Backtracking line search with one global step size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSearchConfig {
    /// Step size at the start of every outer step.
    pub t: f64,
    /// Multiplies `t` after a rejected trial.
    pub backoff: f64,
    /// The step gives up once `t` falls below this.
    pub min_t: f64,
    pub numeraire: Option<Numeraire>,
    pub backtracking: Backtracking,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            t: 0.5,
            backoff: 0.6,
            min_t: 0.1,
            numeraire: None,
            backtracking: Backtracking::default(),
        }
    }
}

impl LineSearchConfig {
    pub fn validate(&self, width: usize) -> SolverResult<()> {
        positive("line_search.t", self.t)?;
        positive("line_search.min_t", self.min_t)?;
        unit_interval("line_search.backoff", self.backoff)?;
        if let Some(numeraire) = &self.numeraire {
            numeraire.validate(width)?;
        }
        self.backtracking.validate()
    }
}

struct LineSearch<'c> {
    config: &'c LineSearchConfig,
    t: f64,
}

impl StepRule for LineSearch<'_> {
    fn name(&self) -> &'static str {
        "line_search"
    }

    fn begin_step(&mut self, _base: &Iterate) {
        self.t = self.config.t;
    }

    fn propose(&mut self, base: &Iterate) -> Vec<f64> {
        let t = self.t;
        adapt_prices(&base.prices, &base.supply, |_| t, self.config.numeraire.as_ref())
    }

    fn back_off(&mut self) {
        self.t *= self.config.backoff;
    }

    fn exhausted(&self) -> bool {
        self.t < self.config.min_t
    }

    fn signal(&self) -> Vec<f64> {
        vec![self.t]
    }
}

pub fn solve<P: Participant>(
    market: &mut Market<'_, P>,
    prices: Vec<f64>,
    termination: &Termination,
    config: &LineSearchConfig,
) -> Solution {
    let mut rule = LineSearch { config, t: config.t };
    backtrack::run(market, prices, termination, &config.backtracking, &mut rule)
}
