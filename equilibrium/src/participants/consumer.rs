use crate::bundle::FlowVolume;
use crate::market::Participant;
use crate::types::assert_positive;

/// Spends a fixed budget across goods in proportion to `weights`.
///
/// Demand for listing `i` is `(money / sum_j(w_j / p_j)) * w_i / p_i^2`, the
/// optimum of a square-root utility under the budget constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Consumer {
    pub weights: Vec<f64>,
    pub money: f64,
}

impl Consumer {
    pub fn new(weights: Vec<f64>, money: f64) -> Self {
        assert!(
            weights.iter().all(|w| *w >= 0.0),
            "consumer weights must be non-negative: {weights:?}"
        );
        assert!(money >= 0.0, "consumer budget must be non-negative, got {money}");
        Self { weights, money }
    }

    pub fn demand(&self, prices: &[f64]) -> Vec<f64> {
        assert_eq!(
            prices.len(),
            self.weights.len(),
            "consumer built for {} listings, got {} prices",
            self.weights.len(),
            prices.len()
        );
        let utility_per_money: f64 = self.weights.iter().zip(prices).map(|(w, p)| w / p).sum();
        if utility_per_money == 0.0 {
            return vec![0.0; prices.len()];
        }
        let lambda_squared = self.money / utility_per_money;
        self.weights
            .iter()
            .zip(prices)
            .map(|(w, p)| lambda_squared * w / (p * p))
            .collect()
    }
}

impl Participant for Consumer {
    fn participate(&self, prices: &[f64]) -> FlowVolume {
        assert_positive(prices);
        let demand = self.demand(prices);
        let flow = demand.iter().map(|d| -d).collect();
        FlowVolume::new(flow, demand)
    }
}
