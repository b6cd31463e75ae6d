//! Market evaluation: the participant contract, aggregation of responses,
//! disequilibrium metrics, numeraire scaling and elasticity estimates.

pub mod elasticity;
pub mod metric;
pub mod scaling;

pub use elasticity::*;
pub use metric::*;
pub use scaling::*;

use serde::{Deserialize, Serialize};

use crate::bundle::FlowVolume;
use crate::types::assert_positive;

// === PARTICIPANT CONTRACT ===

/// An agent that reports its net flow and traded volume at given prices.
///
/// Implementations must be pure with respect to `prices`: the solver calls
/// `participate` many times per step with trial prices and discards most of
/// the answers.
pub trait Participant {
    fn participate(&self, prices: &[f64]) -> FlowVolume;
}

impl<P: Participant + ?Sized> Participant for Box<P> {
    fn participate(&self, prices: &[f64]) -> FlowVolume {
        (**self).participate(prices)
    }
}

impl<P: Participant + ?Sized> Participant for &P {
    fn participate(&self, prices: &[f64]) -> FlowVolume {
        (**self).participate(prices)
    }
}

// === SOLVER STATE ===

/// Diagnostic progress counters for one solver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverState {
    /// Number of aggregation calls (including rejected trials)
    pub evaluations: u64,
    /// Number of outer steps started
    pub steps: u64,
}

// === AGGREGATION ===

/// Sum every participant's response at `prices`.
pub fn aggregate<P: Participant>(participants: &[P], prices: &[f64]) -> FlowVolume {
    assert_positive(prices);
    let mut total = FlowVolume::zero(prices.len());
    for participant in participants {
        let response = participant.participate(prices);
        assert_eq!(
            response.len(),
            prices.len(),
            "participant answered for {} listings, prices have {}",
            response.len(),
            prices.len()
        );
        total += &response;
    }
    total
}

/// The participants of one solver run together with its progress counters.
pub struct Market<'a, P> {
    participants: &'a [P],
    state: SolverState,
}

impl<'a, P: Participant> Market<'a, P> {
    pub fn new(participants: &'a [P]) -> Self {
        Self {
            participants,
            state: SolverState::default(),
        }
    }

    /// Aggregate all responses at `prices`, counting the evaluation.
    pub fn evaluate(&mut self, prices: &[f64]) -> FlowVolume {
        self.state.evaluations += 1;
        tracing::trace!(evaluation = self.state.evaluations, "evaluating market");
        aggregate(self.participants, prices)
    }

    pub(crate) fn begin_step(&mut self) -> u64 {
        self.state.steps += 1;
        self.state.steps
    }

    pub fn participants(&self) -> &'a [P] {
        self.participants
    }

    pub fn state(&self) -> SolverState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f64>);

    impl Participant for Fixed {
        fn participate(&self, _prices: &[f64]) -> FlowVolume {
            FlowVolume::from_flow(self.0.clone())
        }
    }

    #[test]
    fn test_aggregate_sums_participants() {
        let participants = vec![Fixed(vec![1.0, -2.0]), Fixed(vec![-1.0, 0.5])];
        let total = aggregate(&participants, &[1.0, 1.0]);
        assert_eq!(total.flow, vec![0.0, -1.5]);
        assert_eq!(total.volume, vec![2.0, 2.5]);
    }

    #[test]
    fn test_market_counts_evaluations() {
        let participants: Vec<Box<dyn Participant>> = vec![Box::new(Fixed(vec![1.0]))];
        let mut market = Market::new(&participants);
        market.evaluate(&[1.0]);
        market.evaluate(&[2.0]);
        assert_eq!(market.state().evaluations, 2);
        assert_eq!(market.state().steps, 0);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn test_aggregate_rejects_non_positive_prices() {
        aggregate(&[Fixed(vec![1.0])], &[0.0]);
    }

    #[test]
    #[should_panic(expected = "answered for 2 listings")]
    fn test_aggregate_rejects_wrong_width() {
        aggregate(&[Fixed(vec![1.0, 1.0])], &[1.0]);
    }
}
