//! Repository for the `availability_cache` table.
//!
//! The cache is a durable TTL store rather than in-process memory: the
//! resolver runs as multiple stateless instances, and a per-instance
//! cache would let them disagree. Expiry is lazy — reads filter on
//! `expires_at`, and a background sweep deletes dead rows eventually.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use provnet_core::types::DbId;

use crate::models::availability_cache::AvailabilityCacheEntry;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, address_hash, provider_ids, expires_at, created_at, updated_at";

/// Read/write access to memoized resolution results.
pub struct AvailabilityCacheRepo;

impl AvailabilityCacheRepo {
    /// Entry for `address_hash` if one exists and is within its TTL.
    pub async fn get_fresh(
        pool: &PgPool,
        address_hash: &str,
    ) -> Result<Option<AvailabilityCacheEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM availability_cache
             WHERE address_hash = $1 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, AvailabilityCacheEntry>(&query)
            .bind(address_hash)
            .fetch_optional(pool)
            .await
    }

    /// Entry for `address_hash` regardless of expiry.
    ///
    /// Used only on the degradation path: a stale answer beats no answer
    /// when the upstream Provider service is unreachable.
    pub async fn get_any(
        pool: &PgPool,
        address_hash: &str,
    ) -> Result<Option<AvailabilityCacheEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM availability_cache WHERE address_hash = $1");
        sqlx::query_as::<_, AvailabilityCacheEntry>(&query)
            .bind(address_hash)
            .fetch_optional(pool)
            .await
    }

    /// Upsert the entry for `address_hash` with a fresh TTL.
    ///
    /// Concurrent writers for the same hash are resolved by the
    /// `ON CONFLICT` upsert — last writer wins, which is correct because
    /// both computed the same answer from the same source data.
    pub async fn put(
        pool: &PgPool,
        address_hash: &str,
        provider_ids: &[DbId],
        ttl: Duration,
    ) -> Result<AvailabilityCacheEntry, sqlx::Error> {
        let mut ids: Vec<DbId> = provider_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let expires_at = Utc::now() + ttl;

        let query = format!(
            "INSERT INTO availability_cache (address_hash, provider_ids, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (address_hash) DO UPDATE SET
                 provider_ids = EXCLUDED.provider_ids,
                 expires_at = EXCLUDED.expires_at,
                 updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AvailabilityCacheEntry>(&query)
            .bind(address_hash)
            .bind(&ids)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Delete all rows past their expiry. Returns the number removed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM availability_cache WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
