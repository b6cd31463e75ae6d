use serde::{Deserialize, Serialize};

use crate::bundle::FlowVolume;
use crate::types::MIN_VOLUME;

/// Scalar measure of disequilibrium ("badness") of an aggregate response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badness {
    /// L1 norm of the flow
    #[default]
    Absolute,
    /// L1 norm of flow relative to traded volume, so thin markets are not
    /// drowned out by large ones
    Relative,
}

impl Badness {
    pub fn measure(self, supply: &FlowVolume) -> f64 {
        match self {
            Badness::Absolute => absolute_badness(supply),
            Badness::Relative => relative_badness(supply),
        }
    }
}

pub fn absolute_badness(supply: &FlowVolume) -> f64 {
    supply.flow.iter().map(|f| f.abs()).sum()
}

pub fn relative_badness(supply: &FlowVolume) -> f64 {
    supply
        .flow
        .iter()
        .zip(&supply.volume)
        .map(|(f, v)| (f / (v + MIN_VOLUME)).abs())
        .sum()
}
