use serde::{Deserialize, Serialize};

use crate::bundle::FlowVolume;
use crate::config::{Backtracking, Termination, positive, unit_interval};
use crate::error::{SolverError, SolverResult};
use crate::market::{Badness, Market, Numeraire, Participant};
use crate::types::mixing;

use super::backtrack::{self, Iterate, StepRule};
use super::{Solution, adapt_prices};

/// Line search with one step size per listing, each adapted from how the
/// listing's update term responded to the last trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub starting_t: f64,
    /// Bounds on the per-trial change of a step size.
    pub min_change_factor: f64,
    pub max_change_factor: f64,
    /// Bounds on the step sizes themselves.
    pub min_t: f64,
    pub max_t: f64,
    /// Multiplies every step size after a rejected trial.
    pub backoff: f64,
    /// How much of an accepted step's sizes carry into the next step.
    pub stable_mixing: f64,
    pub numeraire: Option<Numeraire>,
    pub backtracking: Backtracking,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            starting_t: 0.4,
            min_change_factor: 1.0 / 1.3,
            max_change_factor: 1.3,
            min_t: 1e-4,
            max_t: 10.0,
            backoff: 0.8,
            stable_mixing: 0.5,
            numeraire: None,
            backtracking: Backtracking {
                acceptance: Badness::Relative,
                ..Backtracking::default()
            },
        }
    }
}

impl AdaptiveConfig {
    pub fn validate(&self, width: usize) -> SolverResult<()> {
        positive("adaptive.starting_t", self.starting_t)?;
        positive("adaptive.min_change_factor", self.min_change_factor)?;
        positive("adaptive.min_t", self.min_t)?;
        if self.max_change_factor < self.min_change_factor {
            return Err(SolverError::config(
                "adaptive.max_change_factor",
                format!("must be at least min_change_factor ({})", self.min_change_factor),
            ));
        }
        if self.max_t < self.min_t {
            return Err(SolverError::config(
                "adaptive.max_t",
                format!("must be at least min_t ({})", self.min_t),
            ));
        }
        unit_interval("adaptive.backoff", self.backoff)?;
        unit_interval("adaptive.stable_mixing", self.stable_mixing)?;
        if let Some(numeraire) = &self.numeraire {
            numeraire.validate(width)?;
        }
        self.backtracking.validate()
    }

    /// Rescale step sizes by how far the update term moved towards zero.
    ///
    /// With `old` the base update term and `new` the trial's, both signed so
    /// that `old >= 0`, the factor is `old / (old - new)`: the step that would
    /// have hit zero under a linear response. Listings without any signal keep
    /// their step size. Only `max_t` is enforced here; `min_t` floors the
    /// sizes actually used and marks a step as exhausted once every size has
    /// fallen below it.
    pub fn adapt(&self, ts: &[f64], old_supply: &FlowVolume, new_supply: &FlowVolume) -> Vec<f64> {
        let old_terms = old_supply.update_term();
        let new_terms = new_supply.update_term();
        ts.iter()
            .zip(old_terms.iter().zip(&new_terms))
            .map(|(t, (o, n))| {
                let sign = sign(*o);
                let old = sign * o;
                let new = sign * n;
                let diff = old - new;
                let ratio = if diff == 0.0 {
                    if old == 0.0 { 1.0 } else { self.max_change_factor }
                } else {
                    old / diff
                };
                let factor = ratio.clamp(self.min_change_factor, self.max_change_factor);
                (t * factor).min(self.max_t)
            })
            .collect()
    }
}

// f64::signum maps 0.0 to 1.0; here a zero signal stays zero
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

struct Adaptive<'c> {
    config: &'c AdaptiveConfig,
    stable: Vec<f64>,
    ts: Vec<f64>,
}

impl StepRule for Adaptive<'_> {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn begin_step(&mut self, base: &Iterate) {
        if self.stable.len() != base.prices.len() {
            self.stable = vec![self.config.starting_t; base.prices.len()];
        }
        self.ts = self.stable.clone();
    }

    fn propose(&mut self, base: &Iterate) -> Vec<f64> {
        let ts = &self.ts;
        let min_t = self.config.min_t;
        adapt_prices(
            &base.prices,
            &base.supply,
            |i| ts[i].max(min_t),
            self.config.numeraire.as_ref(),
        )
    }

    fn observe(&mut self, base: &Iterate, trial: &Iterate) {
        self.ts = self.config.adapt(&self.ts, &base.supply, &trial.supply);
    }

    fn back_off(&mut self) {
        for t in self.ts.iter_mut() {
            *t *= self.config.backoff;
        }
    }

    fn exhausted(&self) -> bool {
        self.ts.iter().all(|t| *t < self.config.min_t)
    }

    fn accept(&mut self, _base: &Iterate, _trial: &Iterate) {
        self.stable = mixing(&self.stable, &self.ts, self.config.stable_mixing);
    }

    fn signal(&self) -> Vec<f64> {
        self.stable.clone()
    }
}

pub fn solve<P: Participant>(
    market: &mut Market<'_, P>,
    prices: Vec<f64>,
    termination: &Termination,
    config: &AdaptiveConfig,
) -> Solution {
    let mut rule = Adaptive {
        config,
        stable: Vec::new(),
        ts: Vec::new(),
    };
    backtrack::run(market, prices, termination, &config.backtracking, &mut rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MIN_VOLUME;

    /// Bundle whose update terms are exactly `terms`.
    fn with_terms(terms: &[f64]) -> FlowVolume {
        FlowVolume::new(terms.to_vec(), vec![1.0 - MIN_VOLUME; terms.len()])
    }

    #[test]
    fn test_adapt_ratios() {
        let config = AdaptiveConfig::default();
        let ts = [1.0; 6];
        let old = with_terms(&[0.5, 0.5, 0.5, -0.5, 0.0, 0.5]);
        let new = with_terms(&[0.1, 0.25, 0.7, -0.1, 0.3, 0.5]);
        let adapted = config.adapt(&ts, &old, &new);

        // moved 0.4 of 0.5 towards zero
        assert!((adapted[0] - 1.25).abs() < 1e-12);
        // would have wanted 2.0, capped
        assert!((adapted[1] - 1.3).abs() < 1e-12);
        // moved away from zero
        assert!((adapted[2] - 1.0 / 1.3).abs() < 1e-12);
        // negative signal is mirrored
        assert!((adapted[3] - 1.25).abs() < 1e-12);
        // no base signal
        assert_eq!(adapted[4], 1.0);
        // no change at all
        assert!((adapted[5] - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_adapt_respects_step_bounds() {
        let config = AdaptiveConfig::default();
        let old = with_terms(&[0.5, 0.5]);
        let new = with_terms(&[0.25, 0.9]);
        let adapted = config.adapt(&[9.0, 1e-4], &old, &new);
        assert_eq!(adapted[0], 10.0);
        // below min_t is allowed; it only counts towards exhaustion
        assert_eq!(adapted[1], 1e-4 * config.min_change_factor);
    }

    #[test]
    fn test_diverging_trials_exhaust_before_trial_cap() {
        let config = AdaptiveConfig::default();
        let mut rule = Adaptive {
            config: &config,
            stable: Vec::new(),
            ts: Vec::new(),
        };
        let base = Iterate {
            prices: vec![1.0, 1.0],
            supply: with_terms(&[0.5, -0.5]),
        };
        let worse = Iterate {
            prices: vec![1.0, 1.0],
            supply: with_terms(&[0.7, -0.7]),
        };
        rule.begin_step(&base);
        let mut trials = 0;
        while !rule.exhausted() {
            rule.observe(&base, &worse);
            rule.back_off();
            trials += 1;
        }
        // 0.4 * (0.8 / 1.3)^k first drops below 1e-4 at k = 18
        assert_eq!(trials, 18);
        assert!(trials < config.backtracking.max_trials);
    }

    #[test]
    fn test_proposal_uses_floored_step() {
        let config = AdaptiveConfig::default();
        let mut rule = Adaptive {
            config: &config,
            stable: vec![0.0, 0.0],
            ts: vec![0.0, 0.0],
        };
        let base = Iterate {
            prices: vec![1.0, 1.0],
            supply: with_terms(&[0.5, 0.0]),
        };
        let next = rule.propose(&base);
        assert!((next[0] - (1.0 - config.min_t * 0.5)).abs() < 1e-12);
        assert_eq!(next[1], 1.0);
    }

    #[test]
    fn test_stable_sizes_carry_over() {
        let config = AdaptiveConfig::default();
        let mut rule = Adaptive {
            config: &config,
            stable: Vec::new(),
            ts: Vec::new(),
        };
        let base = Iterate {
            prices: vec![1.0, 1.0],
            supply: with_terms(&[0.5, -0.5]),
        };
        rule.begin_step(&base);
        assert_eq!(rule.ts, vec![0.4, 0.4]);
        rule.ts = vec![0.8, 0.2];
        rule.accept(&base, &base);
        let stable = rule.signal();
        assert!((stable[0] - 0.6).abs() < 1e-12 && (stable[1] - 0.3).abs() < 1e-12);
        rule.begin_step(&base);
        assert_eq!(rule.ts, rule.stable);
    }
}
