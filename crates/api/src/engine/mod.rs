//! The availability resolution engine.
//!
//! [`resolver::AvailabilityResolver`] orchestrates normalization, the
//! cache, the two coverage matchers, and enrichment;
//! [`singleflight::FlightGroup`] collapses concurrent identical lookups
//! into one computation.

pub mod resolver;
pub mod singleflight;

pub use resolver::{AvailabilityResolver, Resolution, ResolveError};
