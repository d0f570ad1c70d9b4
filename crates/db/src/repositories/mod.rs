//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod availability_cache_repo;
pub mod technical_access_repo;

pub use availability_cache_repo::AvailabilityCacheRepo;
pub use technical_access_repo::TechnicalAccessRepo;
