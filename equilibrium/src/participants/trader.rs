use crate::bundle::FlowVolume;
use crate::market::Participant;
use crate::types::{ListingId, assert_positive};

/// Carries a good between two listings, typically the same good in two
/// regions, paying in labor.
///
/// Each unit of activity buys one unit at `from` and sells `efficiency` units
/// at `to`. Profit per unit divided by the price of `labor` gives the
/// activity rate; the trader hires `rate^2` labor at that listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Trader {
    pub from: ListingId,
    pub to: ListingId,
    pub labor: ListingId,
    pub efficiency: f64,
}

impl Trader {
    pub fn new(from: ListingId, to: ListingId, labor: ListingId, efficiency: f64) -> Self {
        assert_ne!(from, to, "trader must move goods between two listings");
        assert!(
            efficiency > 0.0 && efficiency <= 1.0,
            "trade efficiency must be in (0, 1], got {efficiency}"
        );
        Self {
            from,
            to,
            labor,
            efficiency,
        }
    }

    pub fn rate(&self, prices: &[f64]) -> f64 {
        let margin = self.efficiency * prices[self.to] - prices[self.from];
        if margin <= 0.0 {
            0.0
        } else {
            margin / prices[self.labor]
        }
    }
}

impl Participant for Trader {
    fn participate(&self, prices: &[f64]) -> FlowVolume {
        assert_positive(prices);
        let mut output = FlowVolume::zero(prices.len());
        let rate = self.rate(prices);
        if rate > 0.0 {
            output.add_at(self.from, -rate);
            output.add_at(self.to, self.efficiency * rate);
            output.add_at(self.labor, -rate * rate);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_trade_without_margin() {
        let trader = Trader::new(0, 1, 2, 0.9);
        let output = trader.participate(&[10.0, 10.0, 1.0]);
        assert_eq!(output, FlowVolume::zero(3));
    }

    #[test]
    fn test_moves_goods_and_hires_labor() {
        let trader = Trader::new(0, 1, 2, 0.5);
        // margin 0.5 * 30 - 5 = 10, rate 10 / 5 = 2
        let output = trader.participate(&[5.0, 30.0, 5.0]);
        assert_eq!(output.flow, vec![-2.0, 1.0, -4.0]);
        assert_eq!(output.volume, vec![2.0, 1.0, 4.0]);
        output.check_invariants();
    }
}
