use crate::bundle::FlowVolume;
use crate::types::{MAX_ELASTICITY, MIN_ELASTICITY, mixing};

/// Estimated local price sensitivity of sellers and buyers, per listing.
///
/// `sellers` is how much more is sold per unit price increase, `buyers` how
/// much less is bought. Both are kept strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Elasticities {
    pub sellers: Vec<f64>,
    pub buyers: Vec<f64>,
}

impl Elasticities {
    pub fn new(sellers: Vec<f64>, buyers: Vec<f64>) -> Self {
        assert_eq!(sellers.len(), buyers.len(), "elasticity shape mismatch");
        assert!(
            sellers.iter().chain(&buyers).all(|e| *e > 0.0),
            "elasticities must be positive"
        );
        Self { sellers, buyers }
    }

    /// Initial guess from traded volume: each side gets
    /// `slowdown * volume / (2 * price)`, floored.
    pub fn from_volume(prices: &[f64], supply: &FlowVolume, slowdown: f64) -> Self {
        let half: Vec<f64> = supply
            .volume
            .iter()
            .zip(prices)
            .map(|(v, p)| (slowdown * v / (2.0 * p)).max(MIN_ELASTICITY))
            .collect();
        Self::new(half.clone(), half)
    }

    /// Finite-difference estimate between two evaluations.
    ///
    /// Listings whose price did not move keep the estimate from `fallback`.
    pub fn from_difference(
        prices: &[f64],
        supply: &FlowVolume,
        new_prices: &[f64],
        new_supply: &FlowVolume,
        fallback: &Elasticities,
    ) -> Self {
        let (old_sold, old_bought) = (supply.sold(), supply.bought());
        let (new_sold, new_bought) = (new_supply.sold(), new_supply.bought());

        let mut sellers = Vec::with_capacity(prices.len());
        let mut buyers = Vec::with_capacity(prices.len());
        for i in 0..prices.len() {
            let dp = new_prices[i] - prices[i];
            if dp == 0.0 {
                sellers.push(fallback.sellers[i]);
                buyers.push(fallback.buyers[i]);
                continue;
            }
            let es = (new_sold[i] - old_sold[i]) / dp;
            let eb = (old_bought[i] - new_bought[i]) / dp;
            sellers.push(clip(es));
            buyers.push(clip(eb));
        }
        Self::new(sellers, buyers)
    }

    pub fn total(&self) -> Vec<f64> {
        self.sellers
            .iter()
            .zip(&self.buyers)
            .map(|(s, b)| (s + b).max(MIN_ELASTICITY))
            .collect()
    }

    /// Exponentially smooth towards `other`.
    pub fn mix(&self, other: &Elasticities, factor: f64) -> Self {
        Self {
            sellers: mixing(&self.sellers, &other.sellers, factor),
            buyers: mixing(&self.buyers, &other.buyers, factor),
        }
    }

    pub fn len(&self) -> usize {
        self.sellers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sellers.is_empty()
    }
}

// NaN (0/0 from an untraded listing) falls to the floor
fn clip(e: f64) -> f64 {
    if e.is_nan() {
        MIN_ELASTICITY
    } else {
        e.clamp(MIN_ELASTICITY, MAX_ELASTICITY)
    }
}
