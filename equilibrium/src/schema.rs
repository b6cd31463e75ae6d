//! Naming for price vectors laid out as goods within regions.
//!
//! Listing `region * goods + good` is the price of `good` in `region`, so each
//! region's goods form one contiguous block.

use crate::types::ListingId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSchema {
    goods: Vec<String>,
    regions: Vec<String>,
}

impl PriceSchema {
    pub fn new<G, R>(goods: G, regions: R) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let goods: Vec<String> = goods.into_iter().map(Into::into).collect();
        let regions: Vec<String> = regions.into_iter().map(Into::into).collect();
        assert!(!goods.is_empty(), "schema needs at least one good");
        assert!(!regions.is_empty(), "schema needs at least one region");
        Self { goods, regions }
    }

    /// A single unnamed region.
    pub fn local<G>(goods: G) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Self::new(goods, ["local"])
    }

    pub fn width(&self) -> usize {
        self.goods.len() * self.regions.len()
    }

    pub fn goods(&self) -> &[String] {
        &self.goods
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn listing(&self, good: usize, region: usize) -> ListingId {
        assert!(good < self.goods.len(), "good {good} out of range");
        assert!(region < self.regions.len(), "region {region} out of range");
        self.region_offset(region) + good
    }

    /// First listing of a region's block.
    pub fn region_offset(&self, region: usize) -> ListingId {
        region * self.goods.len()
    }

    /// (good, region) names of a listing.
    pub fn describe(&self, listing: ListingId) -> (&str, &str) {
        assert!(listing < self.width(), "listing {listing} out of range");
        let n = self.goods.len();
        (&self.goods[listing % n], &self.regions[listing / n])
    }

    pub fn listing_of_names(&self, good: &str, region: &str) -> Option<ListingId> {
        let g = self.goods.iter().position(|name| name == good)?;
        let r = self.regions.iter().position(|name| name == region)?;
        Some(self.listing(g, r))
    }

    /// One `good@region = value` line per listing.
    pub fn format_prices(&self, prices: &[f64]) -> String {
        assert_eq!(prices.len(), self.width(), "price vector does not match schema");
        prices
            .iter()
            .enumerate()
            .map(|(listing, p)| {
                let (good, region) = self.describe(listing);
                format!("{good}@{region} = {p:.4}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
