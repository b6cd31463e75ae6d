//! The trial-and-backoff loop shared by line search, adaptive and elastic
//! search.
//!
//! Each outer step proposes trial prices from the current iterate, evaluates
//! the market there and accepts the trial if it passes the improvement test
//! `tolerance * new_badness <= old_badness`. A rejected trial shrinks the
//! step (strategy-specific) and optionally loosens the tolerance for the next
//! trial. A step whose step size collapses "gives up": the current prices
//! stay and the carried tolerance loosens for later steps. Steps accepted
//! under a loosened tolerance that do not beat the best badness so far count
//! as stalled, the same as give-ups; after too many consecutive stalls the
//! run ends with [`Outcome::GaveUp`].

use tracing::{debug, info, warn};

use crate::bundle::FlowVolume;
use crate::config::{Backtracking, Termination};
use crate::market::{Market, Participant};
use crate::types::{assert_positive, mix};

use super::{Iteration, Outcome, Solution};

/// Prices together with the market's response at them.
#[derive(Debug, Clone, PartialEq)]
pub struct Iterate {
    pub prices: Vec<f64>,
    pub supply: FlowVolume,
}

/// The strategy-specific half of a backtracking search.
pub trait StepRule {
    fn name(&self) -> &'static str;

    /// Reset per-step state before the first trial of an outer step.
    fn begin_step(&mut self, base: &Iterate);

    /// Trial prices for the next attempt from `base`.
    fn propose(&mut self, base: &Iterate) -> Vec<f64>;

    /// Learn from a trial, accepted or not.
    fn observe(&mut self, _base: &Iterate, _trial: &Iterate) {}

    /// Shrink the step after a rejected trial.
    fn back_off(&mut self);

    /// True once the step is too small to be worth another trial.
    fn exhausted(&self) -> bool;

    /// Carry state over after an accepted trial.
    fn accept(&mut self, _base: &Iterate, _trial: &Iterate) {}

    /// Snapshot of the rule's adaptive state, for history.
    fn signal(&self) -> Vec<f64>;
}

/// Run `rule` from `prices` until the stopping metric drops below epsilon,
/// the step cap is hit, or the rule keeps failing.
pub fn run<P: Participant, R: StepRule>(
    market: &mut Market<'_, P>,
    prices: Vec<f64>,
    termination: &Termination,
    policy: &Backtracking,
    rule: &mut R,
) -> Solution {
    assert_positive(&prices);
    let supply = market.evaluate(&prices);
    let mut current = Iterate { prices, supply };
    let mut badness = termination.metric.measure(&current.supply);
    let mut best = (current.clone(), badness);

    let mut tolerance = policy.necessary_improvement;
    let mut give_ups = 0u32;
    let mut history = Vec::new();

    info!(
        strategy = rule.name(),
        listings = current.prices.len(),
        badness,
        "starting equilibrium search"
    );

    let outcome = loop {
        if badness < termination.epsilon {
            break Outcome::Converged;
        }
        if let Some(max_steps) = termination.max_steps {
            if market.state().steps >= max_steps {
                warn!(strategy = rule.name(), max_steps, badness, "step limit reached");
                break Outcome::Timeout;
            }
        }

        let step = market.begin_step();
        match backtrack_step(market, &current, policy, tolerance, rule, step) {
            Some(trial) => {
                tolerance = mix(tolerance, policy.necessary_improvement, policy.recovery);
                current = trial;
                badness = termination.metric.measure(&current.supply);
                let improved = badness < best.1;
                if improved {
                    best = (current.clone(), badness);
                    give_ups = 0;
                } else {
                    give_ups += 1;
                    debug!(
                        strategy = rule.name(),
                        step,
                        give_ups,
                        badness,
                        "accepted step did not improve"
                    );
                }

                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "solver_step",
                    step = step,
                    evaluations = market.state().evaluations,
                    badness = badness,
                    acceptance_badness = policy.acceptance.measure(&current.supply),
                    tolerance = tolerance,
                );

                if termination.keep_history {
                    history.push(Iteration {
                        step,
                        prices: current.prices.clone(),
                        badness,
                        signal: rule.signal(),
                    });
                }
                if !improved && give_ups >= policy.max_give_ups {
                    warn!(strategy = rule.name(), step, give_ups, badness, "search stalled");
                    break Outcome::GaveUp;
                }
            }
            None => {
                give_ups += 1;
                tolerance *= policy.loosening;
                warn!(
                    strategy = rule.name(),
                    step,
                    give_ups,
                    badness,
                    "giving up on step, keeping current prices"
                );
                if give_ups >= policy.max_give_ups {
                    break Outcome::GaveUp;
                }
            }
        }
    };

    let (final_iterate, final_badness) = match outcome {
        Outcome::Converged => (current, badness),
        Outcome::GaveUp | Outcome::Timeout => best,
    };
    let state = market.state();
    info!(
        strategy = rule.name(),
        ?outcome,
        steps = state.steps,
        evaluations = state.evaluations,
        badness = final_badness,
        "equilibrium search finished"
    );

    Solution {
        prices: final_iterate.prices,
        supply: final_iterate.supply,
        badness: final_badness,
        outcome,
        state,
        history,
    }
}

/// One outer step: propose, evaluate and back off until a trial is accepted
/// or the rule is exhausted. Returns the accepted trial.
fn backtrack_step<P: Participant, R: StepRule>(
    market: &mut Market<'_, P>,
    base: &Iterate,
    policy: &Backtracking,
    tolerance: f64,
    rule: &mut R,
    step: u64,
) -> Option<Iterate> {
    rule.begin_step(base);
    let base_badness = policy.acceptance.measure(&base.supply);
    let mut required = tolerance;

    for trial_no in 1..=policy.max_trials {
        let prices = rule.propose(base);
        if prices.iter().any(|p| !p.is_finite()) {
            debug!(step, trial = trial_no, "trial prices overflowed");
            rule.back_off();
            required *= policy.decay;
            if rule.exhausted() {
                break;
            }
            continue;
        }
        assert_positive(&prices);
        let supply = market.evaluate(&prices);
        let trial = Iterate { prices, supply };
        rule.observe(base, &trial);

        let trial_badness = policy.acceptance.measure(&trial.supply);
        let accepted = required * trial_badness <= base_badness;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "solver_trial",
            step = step,
            trial = trial_no as u64,
            badness = trial_badness,
            accepted = accepted,
        );

        if accepted {
            rule.accept(base, &trial);
            return Some(trial);
        }

        debug!(
            step,
            trial = trial_no,
            trial_badness,
            base_badness,
            required,
            "trial rejected"
        );
        rule.back_off();
        required *= policy.decay;
        if rule.exhausted() {
            break;
        }
    }
    None
}
