use thiserror::Error;

use crate::types::ListingId;

/// Recoverable problems with a solver configuration or its inputs.
///
/// Non-convergence is not an error: it is reported through
/// [`Outcome`](crate::search::Outcome) on the returned solution.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("numeraire listing {listing} out of range for {width} listings")]
    NumeraireOutOfRange { listing: ListingId, width: usize },

    #[error("price {price} of listing {listing} is not strictly positive")]
    InvalidPrices { listing: ListingId, price: f64 },

    #[error("expected {expected} listings, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("failed to parse solver configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SolverResult<T> = std::result::Result<T, SolverError>;

impl SolverError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SolverError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Check a price vector without panicking.
pub fn check_prices(prices: &[f64], expected_width: Option<usize>) -> SolverResult<()> {
    if let Some(expected) = expected_width {
        if prices.len() != expected {
            return Err(SolverError::ShapeMismatch {
                expected,
                found: prices.len(),
            });
        }
    }
    match prices
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.is_finite() && **p > 0.0))
    {
        Some((listing, &price)) => Err(SolverError::InvalidPrices { listing, price }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_prices() {
        assert!(check_prices(&[1.0, 2.0], Some(2)).is_ok());
        assert!(matches!(
            check_prices(&[1.0, 2.0], Some(3)),
            Err(SolverError::ShapeMismatch { expected: 3, found: 2 })
        ));
        assert!(matches!(
            check_prices(&[1.0, f64::NAN], None),
            Err(SolverError::InvalidPrices { listing: 1, .. })
        ));
        assert!(matches!(
            check_prices(&[-1.0], None),
            Err(SolverError::InvalidPrices { listing: 0, .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = SolverError::config("epsilon", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid configuration: epsilon must be positive"
        );
        let err = SolverError::NumeraireOutOfRange { listing: 7, width: 4 };
        assert_eq!(
            err.to_string(),
            "numeraire listing 7 out of range for 4 listings"
        );
    }
}
