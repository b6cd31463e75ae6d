use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::types::{ListingId, MIN_VOLUME};

/// Aggregate response of one or more participants at a price vector.
///
/// - `flow`: signed net quantity per listing (negative = net demand,
///   positive = net supply)
/// - `volume`: gross quantity moved per listing, always `>= |flow|`
///
/// `volume` counts both sides of the market, so `sold + bought == volume`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowVolume {
    pub flow: Vec<f64>,
    pub volume: Vec<f64>,
}

impl FlowVolume {
    pub fn zero(len: usize) -> Self {
        Self {
            flow: vec![0.0; len],
            volume: vec![0.0; len],
        }
    }

    /// Build from parallel vectors. Panics if the shapes differ or a volume is negative.
    pub fn new(flow: Vec<f64>, volume: Vec<f64>) -> Self {
        assert_eq!(flow.len(), volume.len(), "flow and volume shape mismatch");
        assert!(
            volume.iter().all(|v| *v >= 0.0),
            "volume must be non-negative: {volume:?}"
        );
        Self { flow, volume }
    }

    /// A bundle whose volume is exactly the absolute flow (one-sided agent).
    pub fn from_flow(flow: Vec<f64>) -> Self {
        let volume = flow.iter().map(|f| f.abs()).collect();
        Self { flow, volume }
    }

    pub fn len(&self) -> usize {
        self.flow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flow.is_empty()
    }

    /// Add a single signed quantity at one listing.
    pub fn add_at(&mut self, listing: ListingId, quantity: f64) {
        self.flow[listing] += quantity;
        self.volume[listing] += quantity.abs();
    }

    /// Add `factor * other` into `offset..offset + other.len()`.
    ///
    /// Used by participants that only touch a contiguous slice of the listings
    /// (e.g. one region's goods).
    pub fn add_scaled_at(&mut self, offset: ListingId, other: &FlowVolume, factor: f64) {
        assert!(factor >= 0.0, "scale factor must be non-negative, got {factor}");
        assert!(
            offset + other.len() <= self.len(),
            "slice {}..{} out of range for width {}",
            offset,
            offset + other.len(),
            self.len()
        );
        for (i, (f, v)) in other.flow.iter().zip(&other.volume).enumerate() {
            self.flow[offset + i] += factor * f;
            self.volume[offset + i] += factor * v;
        }
    }

    /// Quantity sold per listing: `(volume + flow) / 2`.
    pub fn sold(&self) -> Vec<f64> {
        self.flow
            .iter()
            .zip(&self.volume)
            .map(|(f, v)| (v + f) / 2.0)
            .collect()
    }

    /// Quantity bought per listing: `(volume - flow) / 2`.
    pub fn bought(&self) -> Vec<f64> {
        self.flow
            .iter()
            .zip(&self.volume)
            .map(|(f, v)| (v - f) / 2.0)
            .collect()
    }

    /// Excess supply relative to traded volume, in `(-1, 1)`.
    pub fn update_term(&self) -> Vec<f64> {
        self.flow
            .iter()
            .zip(&self.volume)
            .map(|(f, v)| f / (v + MIN_VOLUME))
            .collect()
    }

    /// Panics if any listing violates `volume >= |flow|` (with tolerance for rounding).
    pub fn check_invariants(&self) {
        assert_eq!(self.flow.len(), self.volume.len(), "flow and volume shape mismatch");
        for (listing, (f, v)) in self.flow.iter().zip(&self.volume).enumerate() {
            let slack = 1e-9 * v.abs().max(1.0);
            assert!(*v >= 0.0, "negative volume {v} at listing {listing}");
            assert!(
                f.abs() <= v + slack,
                "flow {f} exceeds volume {v} at listing {listing}"
            );
        }
    }
}

impl AddAssign<&FlowVolume> for FlowVolume {
    fn add_assign(&mut self, other: &FlowVolume) {
        assert_eq!(self.len(), other.len(), "adding bundles of different shape");
        for (a, b) in self.flow.iter_mut().zip(&other.flow) {
            *a += b;
        }
        for (a, b) in self.volume.iter_mut().zip(&other.volume) {
            *a += b;
        }
    }
}

impl AddAssign for FlowVolume {
    fn add_assign(&mut self, other: FlowVolume) {
        *self += &other;
    }
}

impl Add for FlowVolume {
    type Output = FlowVolume;

    fn add(mut self, other: FlowVolume) -> FlowVolume {
        self += &other;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sold_and_bought_decompose_flow() {
        let mut b = FlowVolume::zero(2);
        b.add_at(0, 3.0);
        b.add_at(0, -1.0);
        b.add_at(1, -2.0);

        assert_eq!(b.flow, vec![2.0, -2.0]);
        assert_eq!(b.volume, vec![4.0, 2.0]);
        assert_eq!(b.sold(), vec![3.0, 0.0]);
        assert_eq!(b.bought(), vec![1.0, 2.0]);
        b.check_invariants();
    }

    #[test]
    fn test_add_scaled_at_touches_only_slice() {
        let mut wide = FlowVolume::zero(5);
        let local = FlowVolume::from_flow(vec![1.0, -2.0]);
        wide.add_scaled_at(2, &local, 3.0);

        assert_eq!(wide.flow, vec![0.0, 0.0, 3.0, -6.0, 0.0]);
        assert_eq!(wide.volume, vec![0.0, 0.0, 3.0, 6.0, 0.0]);
    }

    #[test]
    fn test_add_accumulates_both_components() {
        let a = FlowVolume::from_flow(vec![1.0, -1.0]);
        let b = FlowVolume::from_flow(vec![-1.0, -1.0]);
        let sum = a + b;

        assert_eq!(sum.flow, vec![0.0, -2.0]);
        assert_eq!(sum.volume, vec![2.0, 2.0]);
    }

    #[test]
    fn test_update_term_bounded_by_one() {
        let b = FlowVolume::new(vec![5.0, -5.0, 0.0], vec![5.0, 7.0, 0.0]);
        let u = b.update_term();
        assert!(u[0] < 1.0 && u[0] > 0.99);
        assert!(u[1] < 0.0 && u[1] > -1.0);
        assert_eq!(u[2], 0.0);
    }

    #[test]
    #[should_panic(expected = "different shape")]
    fn test_add_rejects_shape_mismatch() {
        let mut a = FlowVolume::zero(2);
        a += &FlowVolume::zero(3);
    }

    #[test]
    #[should_panic(expected = "exceeds volume")]
    fn test_invariants_catch_flow_above_volume() {
        FlowVolume::new(vec![2.0], vec![1.0]).check_invariants();
    }
}
