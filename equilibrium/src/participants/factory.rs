use crate::bundle::FlowVolume;
use crate::market::Participant;
use crate::types::{ListingId, assert_positive};

/// Linear production activity.
///
/// One unit of activity turns the negative entries of `coefficients` into the
/// positive ones. The activity rate is the value of one unit at current prices
/// divided by `labor_cost`; unprofitable activity shuts down entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct Factory {
    pub coefficients: Vec<f64>,
    pub labor_cost: f64,
    /// First listing the coefficients apply to.
    pub offset: ListingId,
}

impl Factory {
    pub fn new(coefficients: Vec<f64>, labor_cost: f64) -> Self {
        Self::placed(coefficients, labor_cost, 0)
    }

    /// A factory whose coefficients cover `offset..offset + coefficients.len()`
    /// of a wider price vector, e.g. one region's goods.
    pub fn placed(coefficients: Vec<f64>, labor_cost: f64, offset: ListingId) -> Self {
        assert!(
            labor_cost > 0.0,
            "labor cost must be positive, got {labor_cost}"
        );
        Self {
            coefficients,
            labor_cost,
            offset,
        }
    }

    /// Activity rate at `prices` (zero when unprofitable).
    pub fn rate(&self, prices: &[f64]) -> f64 {
        let local = &prices[self.offset..self.offset + self.coefficients.len()];
        let revenue: f64 = self.coefficients.iter().zip(local).map(|(c, p)| c * p).sum();
        if revenue <= 0.0 {
            0.0
        } else {
            revenue / self.labor_cost
        }
    }
}

impl Participant for Factory {
    fn participate(&self, prices: &[f64]) -> FlowVolume {
        assert_positive(prices);
        let mut output = FlowVolume::zero(prices.len());
        let rate = self.rate(prices);
        if rate > 0.0 {
            let unit = FlowVolume::from_flow(self.coefficients.clone());
            output.add_scaled_at(self.offset, &unit, rate);
        }
        output
    }
}
