//! Price-update strategies and the driver that runs them to convergence.
//!
//! Line search, adaptive and elastic search share one trial-and-backoff loop
//! ([`backtrack`]) and differ only in their [`StepRule`]. Momentum search has
//! no acceptance test and runs its own loop.

pub mod adaptive;
pub mod backtrack;
pub mod elastic;
pub mod line_search;
pub mod momentum;

pub use adaptive::AdaptiveConfig;
pub use backtrack::{Iterate, StepRule};
pub use elastic::ElasticConfig;
pub use line_search::LineSearchConfig;
pub use momentum::{MomentumConfig, MomentumRule};

use serde::{Deserialize, Serialize};

use crate::bundle::FlowVolume;
use crate::config::{SolverConfig, Strategy};
use crate::error::{SolverResult, check_prices};
use crate::market::{Market, Numeraire, Participant, SolverState, settle_prices};

// === RESULTS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Stopping metric fell below epsilon
    Converged,
    /// Too many consecutive steps found no acceptable trial
    GaveUp,
    /// Step or iteration cap reached
    Timeout,
}

/// One accepted iterate, kept when `Termination::keep_history` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    pub step: u64,
    pub prices: Vec<f64>,
    pub badness: f64,
    /// Strategy state after the step: step sizes, total elasticity or momentum.
    pub signal: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Best prices found (the converged ones when `outcome` is `Converged`).
    pub prices: Vec<f64>,
    /// Aggregate response at `prices`.
    pub supply: FlowVolume,
    /// Stopping metric at `prices`.
    pub badness: f64,
    pub outcome: Outcome,
    pub state: SolverState,
    pub history: Vec<Iteration>,
}

impl Solution {
    pub fn converged(&self) -> bool {
        self.outcome == Outcome::Converged
    }

    /// Prices rescaled to a numeraire, for reporting.
    pub fn scaled_prices(&self, numeraire: &Numeraire) -> Vec<f64> {
        numeraire.scaled(&self.prices)
    }
}

// === SHARED PRICE UPDATE ===

/// Multiplicative update `p * (1 - t * flow / volume)` with per-listing step
/// sizes, followed by the price floor and optional rescaling.
///
/// Excess supply lowers the price, excess demand raises it.
pub(crate) fn adapt_prices(
    prices: &[f64],
    supply: &FlowVolume,
    step: impl Fn(usize) -> f64,
    numeraire: Option<&Numeraire>,
) -> Vec<f64> {
    let mut next: Vec<f64> = prices
        .iter()
        .zip(supply.update_term())
        .enumerate()
        .map(|(i, (p, u))| p * (1.0 - step(i) * u))
        .collect();
    settle_prices(&mut next, numeraire);
    next
}

// === DRIVER ===

/// Search for equilibrium prices with the configured strategy.
///
/// Panics if the configuration or initial prices are invalid; use
/// [`try_solve`] to get those as errors instead.
pub fn solve<P: Participant>(
    participants: &[P],
    initial_prices: &[f64],
    config: &SolverConfig,
) -> Solution {
    match try_solve(participants, initial_prices, config) {
        Ok(solution) => solution,
        Err(e) => panic!("cannot start equilibrium search: {e}"),
    }
}

pub fn try_solve<P: Participant>(
    participants: &[P],
    initial_prices: &[f64],
    config: &SolverConfig,
) -> SolverResult<Solution> {
    check_prices(initial_prices, None)?;
    config.validate(initial_prices.len())?;

    let mut market = Market::new(participants);
    let prices = initial_prices.to_vec();
    let termination = &config.termination;
    let solution = match &config.strategy {
        Strategy::LineSearch(c) => line_search::solve(&mut market, prices, termination, c),
        Strategy::Adaptive(c) => adaptive::solve(&mut market, prices, termination, c),
        Strategy::Elastic(c) => elastic::solve(&mut market, prices, termination, c),
        Strategy::Momentum(c) => momentum::solve(&mut market, prices, termination, c),
    };
    Ok(solution)
}
