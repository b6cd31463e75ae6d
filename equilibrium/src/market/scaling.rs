use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::types::{ListingId, floor_prices};

/// What the price level is pinned to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// The price of one listing
    Listing(ListingId),
    /// The arithmetic mean of all prices
    #[default]
    Average,
}

/// Rescales whole price vectors so the reference sits at `target`.
///
/// Excess demand of a closed economy is homogeneous of degree zero in prices,
/// so without a numeraire the price level can drift freely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Numeraire {
    pub reference: Reference,
    pub target: f64,
}

impl Default for Numeraire {
    fn default() -> Self {
        Self {
            reference: Reference::Average,
            target: 10.0,
        }
    }
}

impl Numeraire {
    pub fn listing(listing: ListingId, target: f64) -> Self {
        Self {
            reference: Reference::Listing(listing),
            target,
        }
    }

    pub fn average(target: f64) -> Self {
        Self {
            reference: Reference::Average,
            target,
        }
    }

    fn reference_value(&self, prices: &[f64]) -> f64 {
        match self.reference {
            Reference::Listing(listing) => prices[listing],
            Reference::Average => prices.iter().sum::<f64>() / prices.len() as f64,
        }
    }

    /// Multiply all prices by `target / reference`.
    pub fn apply(&self, prices: &mut [f64]) {
        if prices.is_empty() {
            return;
        }
        let base = self.reference_value(prices);
        assert!(base > 0.0, "numeraire reference price must be positive, got {base}");
        let factor = self.target / base;
        for p in prices.iter_mut() {
            *p *= factor;
        }
    }

    /// Return a rescaled copy.
    pub fn scaled(&self, prices: &[f64]) -> Vec<f64> {
        let mut out = prices.to_vec();
        self.apply(&mut out);
        out
    }

    pub fn validate(&self, width: usize) -> SolverResult<()> {
        if !(self.target.is_finite() && self.target > 0.0) {
            return Err(SolverError::config(
                "numeraire.target",
                format!("must be positive, got {}", self.target),
            ));
        }
        if let Reference::Listing(listing) = self.reference {
            if listing >= width {
                return Err(SolverError::NumeraireOutOfRange { listing, width });
            }
        }
        Ok(())
    }
}

/// Floor a raw trial, rescale it to the optional numeraire and floor again.
///
/// The first floor keeps the reference positive when a step overshoots it;
/// the second catches listings pushed under the floor by the rescale.
pub fn settle_prices(prices: &mut [f64], numeraire: Option<&Numeraire>) {
    floor_prices(prices);
    if let Some(numeraire) = numeraire {
        numeraire.apply(prices);
        floor_prices(prices);
    }
}
