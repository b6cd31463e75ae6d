// ============================================================================
// Core numeric types shared by the solver
// ============================================================================

/// Index of one (good, region) pair in a price vector.
pub type ListingId = usize;

/// A price per listing. All entries must stay strictly positive.
pub type Prices = Vec<f64>;

/// Floor applied to every updated price.
pub const MIN_PRICE: f64 = 0.001;

/// Additive floor on traded volume when normalising flow by volume.
pub const MIN_VOLUME: f64 = 0.001;

/// Elasticity estimates are clipped to this range.
pub const MIN_ELASTICITY: f64 = 0.0001;
pub const MAX_ELASTICITY: f64 = 10_000.0;

/// Exponential smoothing: `(1 - factor) * a + factor * b`, element-wise.
pub fn mixing(a: &[f64], b: &[f64], factor: f64) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "mixing vectors of different length");
    a.iter()
        .zip(b)
        .map(|(x, y)| (1.0 - factor) * x + factor * y)
        .collect()
}

/// Scalar form of [`mixing`].
pub fn mix(a: f64, b: f64, factor: f64) -> f64 {
    (1.0 - factor) * a + factor * b
}

/// Clamp every price to at least [`MIN_PRICE`].
pub fn floor_prices(prices: &mut [f64]) {
    for p in prices.iter_mut() {
        *p = p.max(MIN_PRICE);
    }
}

/// Panics unless every price is finite and strictly positive.
pub fn assert_positive(prices: &[f64]) {
    for (listing, &p) in prices.iter().enumerate() {
        assert!(
            p.is_finite() && p > 0.0,
            "price of listing {listing} must be positive and finite, got {p}"
        );
    }
}
