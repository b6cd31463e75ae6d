//! Competitive-equilibrium price search.
//!
//! Participants report net flow and traded volume at a price vector; the
//! solver adjusts prices until aggregate flow (excess supply) is close to
//! zero. See [`search::solve`] for the entry point and [`config`] for the
//! available strategies.

pub mod bundle;
pub mod config;
pub mod error;
pub mod market;
pub mod participants;
pub mod schema;
pub mod search;
pub mod tuning;
pub mod types;

pub use bundle::FlowVolume;
pub use config::{Backtracking, SolverConfig, Strategy, Termination};
pub use error::{SolverError, SolverResult};
pub use market::{Badness, Market, Numeraire, Participant, Reference, SolverState, aggregate};
pub use schema::PriceSchema;
pub use search::{Outcome, Solution, solve, try_solve};
pub use types::*;

// Re-export instrument for tests and tools that want to record solver traces
#[cfg(feature = "instrument")]
pub use instrument;
