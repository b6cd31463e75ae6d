use crate::bundle::FlowVolume;
use crate::market::Participant;
use crate::types::assert_positive;

/// Pure exchange agent with Cobb-Douglas preferences.
///
/// Sells its whole `endowment` at market prices and spends the proceeds on
/// `weights[i] / sum(weights)` shares per good. Its excess supply is
/// homogeneous of degree zero in prices, so a market of exchange agents only
/// pins relative prices.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub weights: Vec<f64>,
    pub endowment: Vec<f64>,
}

impl Exchange {
    pub fn new(weights: Vec<f64>, endowment: Vec<f64>) -> Self {
        assert_eq!(weights.len(), endowment.len(), "weights and endowment shape mismatch");
        assert!(
            weights.iter().all(|w| *w >= 0.0) && weights.iter().sum::<f64>() > 0.0,
            "weights must be non-negative and not all zero: {weights:?}"
        );
        assert!(
            endowment.iter().all(|e| *e >= 0.0),
            "endowment must be non-negative: {endowment:?}"
        );
        Self { weights, endowment }
    }

    pub fn wealth(&self, prices: &[f64]) -> f64 {
        self.endowment.iter().zip(prices).map(|(e, p)| e * p).sum()
    }

    pub fn demand(&self, prices: &[f64]) -> Vec<f64> {
        let share = self.wealth(prices) / self.weights.iter().sum::<f64>();
        self.weights
            .iter()
            .zip(prices)
            .map(|(w, p)| w * share / p)
            .collect()
    }
}

impl Participant for Exchange {
    fn participate(&self, prices: &[f64]) -> FlowVolume {
        assert_positive(prices);
        assert_eq!(
            prices.len(),
            self.endowment.len(),
            "exchange agent built for {} listings, got {} prices",
            self.endowment.len(),
            prices.len()
        );
        let demand = self.demand(prices);
        let flow = self.endowment.iter().zip(&demand).map(|(e, d)| e - d).collect();
        let volume = self.endowment.iter().zip(&demand).map(|(e, d)| e + d).collect();
        FlowVolume::new(flow, volume)
    }
}
