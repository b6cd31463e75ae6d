//! Parameter sweeps for the momentum strategies, whose rates have to be
//! calibrated per market.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{SolverConfig, Termination};
use crate::error::SolverResult;
use crate::market::Participant;
use crate::search::{MomentumConfig, Outcome, try_solve};

/// Result of one momentum run in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub rate: f64,
    pub first_mixing: f64,
    /// Market evaluations used (the cap when timed out).
    pub iterations: u64,
    pub outcome: Outcome,
    pub badness: f64,
}

impl GridPoint {
    pub fn timed_out(&self) -> bool {
        self.outcome == Outcome::Timeout
    }
}

/// Run `base` once for every `rate x first_mixing` combination.
///
/// Points come back in row-major order (rates outer).
pub fn grid_search<P: Participant>(
    participants: &[P],
    initial_prices: &[f64],
    termination: &Termination,
    base: &MomentumConfig,
    rates: &[f64],
    first_mixings: &[f64],
) -> SolverResult<Vec<GridPoint>> {
    let mut points = Vec::with_capacity(rates.len() * first_mixings.len());
    for &rate in rates {
        for &first_mixing in first_mixings {
            let config = SolverConfig::new(
                MomentumConfig {
                    rate,
                    first_mixing,
                    ..base.clone()
                },
                termination.clone(),
            );
            let solution = try_solve(participants, initial_prices, &config)?;
            let point = GridPoint {
                rate,
                first_mixing,
                iterations: solution.state.evaluations,
                outcome: solution.outcome,
                badness: solution.badness,
            };
            info!(
                rate,
                first_mixing,
                iterations = point.iterations,
                outcome = ?point.outcome,
                "grid point"
            );
            points.push(point);
        }
    }
    Ok(points)
}

/// The converged point with the fewest iterations.
pub fn fastest(points: &[GridPoint]) -> Option<&GridPoint> {
    points
        .iter()
        .filter(|p| p.outcome == Outcome::Converged)
        .min_by_key(|p| p.iterations)
}
