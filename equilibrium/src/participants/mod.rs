//! Reference participants.
//!
//! Small closed-form agents used to build test markets. Each one reports a
//! [`FlowVolume`](crate::bundle::FlowVolume) over the full price vector, with
//! `volume >= |flow|` per listing.

pub mod consumer;
pub mod exchange;
pub mod factory;
pub mod trader;

pub use consumer::Consumer;
pub use exchange::Exchange;
pub use factory::Factory;
pub use trader::Trader;
