//! Momentum descent on the update term.
//!
//! No acceptance test and no backtracking: every iteration evaluates the
//! market once and moves prices along a smoothed update term. Cheap per
//! iteration, but the rates need calibrating per market.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Termination, positive, unit_interval};
use crate::error::{SolverError, SolverResult};
use crate::market::{Market, Numeraire, Participant, settle_prices};
use crate::types::mixing;

use super::{Iteration, Outcome, Solution};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumRule {
    /// Multiplicative step on a smoothed update term
    #[default]
    Eva,
    /// Multiplicative step scaled by a smoothed squared update term
    Adam,
    /// Additive step on a smoothed `price * update_term`
    Additive,
}

/// Defaults are starting points; each market needs its own calibration
/// (see [`crate::tuning::grid_search`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub rule: MomentumRule,
    pub rate: f64,
    /// Scales the first momentum before any smoothing has happened.
    pub initial_backoff: f64,
    pub first_mixing: f64,
    /// Adam only.
    pub second_mixing: f64,
    /// Evaluations before the run times out, the initial one included.
    pub max_iterations: u64,
    /// Additive only. The multiplicative rules leave the price level free;
    /// rescale their result with [`Solution::scaled_prices`].
    pub numeraire: Option<Numeraire>,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            rule: MomentumRule::Eva,
            rate: 0.2,
            initial_backoff: 0.1,
            first_mixing: 0.1,
            second_mixing: 0.01,
            max_iterations: 10_000,
            numeraire: None,
        }
    }
}

impl MomentumConfig {
    pub fn validate(&self, width: usize) -> SolverResult<()> {
        positive("momentum.rate", self.rate)?;
        positive("momentum.initial_backoff", self.initial_backoff)?;
        unit_interval("momentum.first_mixing", self.first_mixing)?;
        unit_interval("momentum.second_mixing", self.second_mixing)?;
        if self.max_iterations == 0 {
            return Err(SolverError::config("momentum.max_iterations", "must be at least 1"));
        }
        if let Some(numeraire) = &self.numeraire {
            numeraire.validate(width)?;
        }
        Ok(())
    }
}

/// First and (for Adam) second momentum of one run.
struct Momentum {
    first: Vec<f64>,
    second: Vec<f64>,
}

impl Momentum {
    fn start(rule: MomentumRule, config: &MomentumConfig, prices: &[f64], terms: &[f64]) -> Self {
        let first = match rule {
            MomentumRule::Eva => terms.iter().map(|u| config.initial_backoff * u).collect(),
            MomentumRule::Adam | MomentumRule::Additive => prices
                .iter()
                .zip(terms)
                .map(|(p, u)| config.initial_backoff * p * u)
                .collect(),
        };
        Self {
            first,
            second: vec![0.0; prices.len()],
        }
    }

    fn step(&self, rule: MomentumRule, config: &MomentumConfig, prices: &[f64]) -> Vec<f64> {
        let rate = config.rate;
        let mut next: Vec<f64> = match rule {
            MomentumRule::Eva => prices
                .iter()
                .zip(&self.first)
                .map(|(p, m)| p * (1.0 - rate * m))
                .collect(),
            MomentumRule::Adam => prices
                .iter()
                .zip(self.first.iter().zip(&self.second))
                .map(|(p, (m, v))| p * (1.0 - rate / (v + 0.001 * rate) * m))
                .collect(),
            MomentumRule::Additive => prices
                .iter()
                .zip(&self.first)
                .map(|(p, m)| p - rate * m)
                .collect(),
        };
        let numeraire = match rule {
            MomentumRule::Additive => config.numeraire.as_ref(),
            MomentumRule::Eva | MomentumRule::Adam => None,
        };
        settle_prices(&mut next, numeraire);
        next
    }

    fn update(&mut self, rule: MomentumRule, config: &MomentumConfig, prices: &[f64], terms: &[f64]) {
        match rule {
            MomentumRule::Eva => {
                self.first = mixing(&self.first, terms, config.first_mixing);
            }
            MomentumRule::Adam => {
                let squared: Vec<f64> = terms.iter().map(|u| u * u).collect();
                self.first = mixing(&self.first, terms, config.first_mixing);
                self.second = mixing(&self.second, &squared, config.second_mixing);
            }
            MomentumRule::Additive => {
                let scaled: Vec<f64> = prices.iter().zip(terms).map(|(p, u)| p * u).collect();
                self.first = mixing(&self.first, &scaled, config.first_mixing);
            }
        }
    }
}

pub fn solve<P: Participant>(
    market: &mut Market<'_, P>,
    mut prices: Vec<f64>,
    termination: &Termination,
    config: &MomentumConfig,
) -> Solution {
    let rule = config.rule;
    let mut supply = market.evaluate(&prices);
    let mut momentum = Momentum::start(rule, config, &prices, &supply.update_term());
    let mut badness = termination.metric.measure(&supply);
    let mut best = (prices.clone(), supply.clone(), badness);
    let mut iterations = 1u64;
    let mut history = Vec::new();

    info!(?rule, listings = prices.len(), badness, "starting momentum search");

    let outcome = loop {
        if badness < termination.epsilon {
            break Outcome::Converged;
        }
        if iterations >= config.max_iterations {
            warn!(?rule, iterations, badness, "momentum search timed out");
            break Outcome::Timeout;
        }

        let step = market.begin_step();
        prices = momentum.step(rule, config, &prices);
        supply = market.evaluate(&prices);
        momentum.update(rule, config, &prices, &supply.update_term());
        badness = termination.metric.measure(&supply);
        iterations += 1;
        if badness < best.2 {
            best = (prices.clone(), supply.clone(), badness);
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "solver_step",
            step = step,
            evaluations = market.state().evaluations,
            badness = badness,
        );

        if termination.keep_history {
            history.push(Iteration {
                step,
                prices: prices.clone(),
                badness,
                signal: momentum.first.clone(),
            });
        }
    };

    let (prices, supply, badness) = match outcome {
        Outcome::Converged => (prices, supply, badness),
        Outcome::GaveUp | Outcome::Timeout => best,
    };
    let state = market.state();
    info!(
        ?rule,
        ?outcome,
        steps = state.steps,
        evaluations = state.evaluations,
        badness,
        "momentum search finished"
    );

    Solution {
        prices,
        supply,
        badness,
        outcome,
        state,
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::FlowVolume;

    /// Sells `p` units, wants to buy `100 / p`: equilibrium at 10.
    struct Unit;

    impl Participant for Unit {
        fn participate(&self, prices: &[f64]) -> FlowVolume {
            let mut fv = FlowVolume::zero(1);
            fv.add_at(0, prices[0]);
            fv.add_at(0, -100.0 / prices[0]);
            fv
        }
    }

    fn run(rule: MomentumRule, max_iterations: u64) -> Solution {
        let participants = [Unit];
        let mut market = Market::new(&participants);
        let config = MomentumConfig {
            rule,
            max_iterations,
            ..MomentumConfig::default()
        };
        solve(
            &mut market,
            vec![4.0],
            &Termination::with_epsilon(1e-4),
            &config,
        )
    }

    #[test]
    fn test_eva_converges() {
        let solution = run(MomentumRule::Eva, 10_000);
        assert_eq!(solution.outcome, Outcome::Converged);
        assert!((solution.prices[0] - 10.0).abs() < 1e-3, "{:?}", solution.prices);
        assert_eq!(solution.state.evaluations, solution.state.steps + 1);
    }

    #[test]
    fn test_iteration_cap() {
        let solution = run(MomentumRule::Eva, 5);
        assert_eq!(solution.outcome, Outcome::Timeout);
        assert_eq!(solution.state.evaluations, 5);
    }

    #[test]
    fn test_initial_momentum() {
        let config = MomentumConfig::default();
        let prices = [2.0, 4.0];
        let terms = [0.5, -0.25];
        let eva = Momentum::start(MomentumRule::Eva, &config, &prices, &terms);
        assert_eq!(eva.first, vec![0.05, -0.025]);
        let adam = Momentum::start(MomentumRule::Adam, &config, &prices, &terms);
        assert_eq!(adam.first, vec![0.1, -0.1]);
        assert_eq!(adam.second, vec![0.0, 0.0]);
    }

    #[test]
    fn test_additive_step_is_floored() {
        let config = MomentumConfig::default();
        let momentum = Momentum {
            first: vec![100.0, -1.0],
            second: vec![0.0, 0.0],
        };
        let next = momentum.step(MomentumRule::Additive, &config, &[1.0, 1.0]);
        assert_eq!(next[0], crate::types::MIN_PRICE);
        assert!((next[1] - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_additive_numeraire_applies_after_floor() {
        let config = MomentumConfig {
            rule: MomentumRule::Additive,
            numeraire: Some(Numeraire::listing(0, 1.0)),
            ..MomentumConfig::default()
        };
        let momentum = Momentum {
            first: vec![100.0, -1.0],
            second: vec![0.0, 0.0],
        };
        // raw step is [-19, 1.2]; the reference is floored before rescaling
        let next = momentum.step(MomentumRule::Additive, &config, &[1.0, 1.0]);
        assert!((next[0] - 1.0).abs() < 1e-9, "{next:?}");
        assert!((next[1] - 1200.0).abs() < 1e-6, "{next:?}");
    }

    #[test]
    fn test_rule_from_json() {
        let config: MomentumConfig = serde_json::from_str(r#"{"rule": "adam", "rate": 0.05}"#).unwrap();
        assert_eq!(config.rule, MomentumRule::Adam);
        assert_eq!(config.rate, 0.05);
        assert_eq!(config.max_iterations, 10_000);
    }
}
