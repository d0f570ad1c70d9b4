//! Availability-cache entity model.

use provnet_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A memoized resolution result from the `availability_cache` table.
///
/// An entry past `expires_at` is logically absent even while the row
/// still exists; readers must go through
/// [`AvailabilityCacheRepo::get_fresh`](crate::repositories::AvailabilityCacheRepo::get_fresh)
/// unless they explicitly want stale data.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailabilityCacheEntry {
    pub id: DbId,
    pub address_hash: String,
    pub provider_ids: Vec<DbId>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AvailabilityCacheEntry {
    /// Whether the entry is still within its TTL at `now`.
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}
