//! Client for the external Provider service.
//!
//! The Provider service owns the provider catalog and the geographic
//! coverage rules; this crate fetches both over HTTP. The
//! [`ProviderDirectory`] trait is the seam the resolver depends on, so
//! tests can substitute an in-memory stub for the live service.

pub mod api;
pub mod directory;

pub use api::{ProviderApi, ProviderApiError};
pub use directory::{Provider, ProviderDirectory};
