//! Two-level elasticity tracking.
//!
//! A long-term estimate of each listing's seller and buyer elasticity seeds
//! every outer step. Inside the step, each trial's finite differences refine
//! a working copy; once a trial is accepted the working copy is blended back
//! into the long-term estimate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{Backtracking, Termination, positive, unit_interval};
use crate::error::SolverResult;
use crate::market::{Elasticities, Market, Numeraire, Participant, settle_prices};

use super::Solution;
use super::backtrack::{self, Iterate, StepRule};

/// Relative price change below which a listing counts as unmoved.
const STUCK: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticConfig {
    /// Scales the volume-based initial elasticity guess.
    pub initial_slowdown: f64,
    /// Fraction of the Newton-like step taken on the first trial.
    pub initial_backoff: f64,
    /// Multiplies the step fraction after a rejected trial.
    pub backoff_decay: f64,
    /// Weight of a finished step's estimate in the long-term estimate.
    pub outer_mixing: f64,
    /// Weight of each trial's finite differences in the working estimate.
    pub inner_mixing: f64,
    /// The step gives up once the step fraction falls below this.
    pub min_backoff: f64,
    /// Seed for the perturbation of unmoved listings.
    pub seed: u64,
    pub numeraire: Option<Numeraire>,
    pub backtracking: Backtracking,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            initial_slowdown: 0.4,
            initial_backoff: 0.8,
            backoff_decay: 0.2,
            outer_mixing: 0.1,
            inner_mixing: 0.5,
            min_backoff: 1e-9,
            seed: 0,
            numeraire: None,
            backtracking: Backtracking {
                decay: 0.9,
                ..Backtracking::default()
            },
        }
    }
}

impl ElasticConfig {
    pub fn validate(&self, width: usize) -> SolverResult<()> {
        positive("elastic.initial_slowdown", self.initial_slowdown)?;
        positive("elastic.initial_backoff", self.initial_backoff)?;
        positive("elastic.min_backoff", self.min_backoff)?;
        unit_interval("elastic.backoff_decay", self.backoff_decay)?;
        unit_interval("elastic.outer_mixing", self.outer_mixing)?;
        unit_interval("elastic.inner_mixing", self.inner_mixing)?;
        if let Some(numeraire) = &self.numeraire {
            numeraire.validate(width)?;
        }
        self.backtracking.validate()
    }
}

struct Elastic<'c> {
    config: &'c ElasticConfig,
    long_term: Elasticities,
    inner: Elasticities,
    backoff: f64,
    rng: StdRng,
}

impl<'c> Elastic<'c> {
    fn new(config: &'c ElasticConfig) -> Self {
        Self {
            config,
            long_term: Elasticities::new(Vec::new(), Vec::new()),
            inner: Elasticities::new(Vec::new(), Vec::new()),
            backoff: config.initial_backoff,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }
}

impl StepRule for Elastic<'_> {
    fn name(&self) -> &'static str {
        "elastic"
    }

    fn begin_step(&mut self, base: &Iterate) {
        if self.long_term.len() != base.prices.len() {
            self.long_term =
                Elasticities::from_volume(&base.prices, &base.supply, self.config.initial_slowdown);
        }
        self.inner = self.long_term.clone();
        self.backoff = self.config.initial_backoff;
    }

    fn propose(&mut self, base: &Iterate) -> Vec<f64> {
        let total = self.inner.total();
        let mut next: Vec<f64> = base
            .prices
            .iter()
            .zip(&base.supply.flow)
            .zip(&total)
            .map(|((p, f), e)| p - self.backoff * f / e)
            .collect();
        settle_prices(&mut next, self.config.numeraire.as_ref());

        // an unmoved listing would leave its finite difference undefined
        for (new, old) in next.iter_mut().zip(&base.prices) {
            if (*new - old).abs() < STUCK * old {
                *new = old * (1.0 + self.rng.random_range(STUCK..2.0 * STUCK));
            }
        }
        next
    }

    fn observe(&mut self, base: &Iterate, trial: &Iterate) {
        let fresh = Elasticities::from_difference(
            &base.prices,
            &base.supply,
            &trial.prices,
            &trial.supply,
            &self.inner,
        );
        self.inner = self.inner.mix(&fresh, self.config.inner_mixing);
    }

    fn back_off(&mut self) {
        self.backoff *= self.config.backoff_decay;
    }

    fn exhausted(&self) -> bool {
        self.backoff < self.config.min_backoff
    }

    fn accept(&mut self, _base: &Iterate, _trial: &Iterate) {
        self.long_term = self.long_term.mix(&self.inner, self.config.outer_mixing);
    }

    fn signal(&self) -> Vec<f64> {
        self.long_term.total()
    }
}

pub fn solve<P: Participant>(
    market: &mut Market<'_, P>,
    prices: Vec<f64>,
    termination: &Termination,
    config: &ElasticConfig,
) -> Solution {
    let mut rule = Elastic::new(config);
    backtrack::run(market, prices, termination, &config.backtracking, &mut rule)
}
