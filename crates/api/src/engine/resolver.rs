//! Availability resolution orchestration.
//!
//! One entry point, [`AvailabilityResolver::resolve`]: normalize the
//! address, consult the durable cache, run the exact and range matchers,
//! write confident results back, enrich ids into provider objects, and
//! degrade instead of failing when the Provider service is down.
//!
//! Raw addresses never reach the logs; every trace line identifies the
//! request by its address hash.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use sqlx::PgPool;

use provnet_core::address::{address_hash, normalize, AddressInput, AddressKey};
use provnet_core::coverage::{self, ExactOutcome, MatchTier};
use provnet_core::types::DbId;
use provnet_db::repositories::{AvailabilityCacheRepo, TechnicalAccessRepo};
use provnet_provider::{Provider, ProviderApiError, ProviderDirectory};

use super::singleflight::{Flight, FlightGroup};

/// Errors a resolution can surface to its caller.
///
/// Clonable because one computation's outcome is broadcast to every
/// collapsed waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// The Provider service was unreachable and nothing could be served.
    #[error("Provider service unavailable: {0}")]
    Upstream(String),

    /// Local storage failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Anything else, including an abandoned in-flight computation.
    #[error("{0}")]
    Internal(String),
}

impl From<sqlx::Error> for ResolveError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// A resolved answer for one address.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// Deduplicated ids of providers able to connect the address.
    pub provider_ids: Vec<DbId>,
    /// Full provider objects when enrichment succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<Provider>>,
    /// Confidence tier of the underlying match. Absent for cache hits:
    /// the cache stores only confident results, not which tier produced
    /// them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<MatchTier>,
    /// Whether the answer came from the availability cache.
    pub cached: bool,
    /// True when a collaborator failure degraded the answer (stale
    /// cache, or ids without enrichment).
    pub degraded: bool,
}

/// Orchestrates the resolution pipeline over the cache, the matchers,
/// and the Provider service.
///
/// Cheap to share: wrap in `Arc` and clone the handle into state.
pub struct AvailabilityResolver {
    pool: PgPool,
    directory: Arc<dyn ProviderDirectory>,
    cache_ttl: Duration,
    flights: FlightGroup<Result<Resolution, ResolveError>>,
}

impl AvailabilityResolver {
    pub fn new(pool: PgPool, directory: Arc<dyn ProviderDirectory>, cache_ttl: Duration) -> Self {
        Self {
            pool,
            directory,
            cache_ttl,
            flights: FlightGroup::new(),
        }
    }

    /// Resolve with the configured default cache TTL.
    pub async fn resolve(&self, input: &AddressInput) -> Result<Resolution, ResolveError> {
        self.resolve_with_ttl(input, self.cache_ttl).await
    }

    /// Resolve with an explicit TTL for any cache write this lookup
    /// produces.
    pub async fn resolve_with_ttl(
        &self,
        input: &AddressInput,
        ttl: Duration,
    ) -> Result<Resolution, ResolveError> {
        let key = normalize(input);
        let hash = address_hash(&key);

        if let Some(entry) = AvailabilityCacheRepo::get_fresh(&self.pool, &hash).await? {
            tracing::debug!(address_hash = %hash, "Availability cache hit");
            return Ok(self.enrich(entry.provider_ids, None, true).await);
        }

        match self.flights.join(&hash) {
            Flight::Owner(guard) => {
                let outcome = self.compute(&key, &hash, ttl).await;
                guard.finish(outcome.clone());
                outcome
            }
            Flight::Waiter(mut rx) => {
                tracing::debug!(address_hash = %hash, "Joined in-flight resolution");
                match rx.recv().await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ResolveError::Internal(
                        "In-flight resolution was abandoned".to_string(),
                    )),
                }
            }
        }
    }

    /// The cache-miss path: match, write back, enrich.
    ///
    /// Runs exactly once per in-flight address hash; the outcome is
    /// broadcast to every collapsed caller.
    async fn compute(
        &self,
        key: &AddressKey,
        hash: &str,
        ttl: Duration,
    ) -> Result<Resolution, ResolveError> {
        let exact = self.exact_outcome(key).await?;

        // The range matcher runs only when no positive override already
        // settled the question.
        let range_ids = if !exact.has_positive() && key.city.is_some() {
            match self.directory.coverage_rules(key).await {
                Ok(rules) => coverage::range_provider_ids(&rules, key),
                Err(e) => {
                    tracing::warn!(
                        address_hash = %hash,
                        error = %e,
                        "Coverage lookup failed, degrading"
                    );
                    return self.degrade(hash, &exact, e).await;
                }
            }
        } else {
            Vec::new()
        };

        let merged = coverage::merge(&exact, &range_ids);

        if merged.should_fall_back() {
            // Nothing matched and nothing was denied: answer with the
            // full catalog, marked low-confidence and never cached, so
            // improved coverage data shows up without waiting out a TTL.
            return match self.directory.active_providers().await {
                Ok(providers) => {
                    tracing::debug!(address_hash = %hash, "No coverage match, serving fallback tier");
                    Ok(Resolution {
                        provider_ids: providers.iter().map(|p| p.id).collect(),
                        providers: Some(providers),
                        tier: Some(MatchTier::None),
                        cached: false,
                        degraded: false,
                    })
                }
                Err(e) => {
                    tracing::warn!(
                        address_hash = %hash,
                        error = %e,
                        "Fallback provider listing failed, degrading"
                    );
                    self.degrade(hash, &exact, e).await
                }
            };
        }

        if merged.tier.is_cacheable() {
            if let Err(e) =
                AvailabilityCacheRepo::put(&self.pool, hash, &merged.provider_ids, ttl).await
            {
                // A lost cache write only costs a recomputation later.
                tracing::warn!(address_hash = %hash, error = %e, "Availability cache write failed");
            }
        }

        tracing::info!(
            address_hash = %hash,
            tier = merged.tier.as_str(),
            provider_count = merged.provider_ids.len(),
            "Availability resolved"
        );

        Ok(self.enrich(merged.provider_ids, Some(merged.tier), false).await)
    }

    /// Fetch and evaluate per-unit overrides for the key, if it carries
    /// a unit reference.
    async fn exact_outcome(&self, key: &AddressKey) -> Result<ExactOutcome, ResolveError> {
        let records = match (key.apartment_id, key.building_id) {
            (Some(apartment_id), building_id) => {
                TechnicalAccessRepo::find_active_for_apartment(&self.pool, apartment_id, building_id)
                    .await?
            }
            (None, Some(building_id)) => {
                TechnicalAccessRepo::find_active_for_building(&self.pool, building_id).await?
            }
            (None, None) => return Ok(ExactOutcome::default()),
        };

        let views: Vec<_> = records.iter().map(|r| r.as_access_record()).collect();
        Ok(coverage::exact_outcome(&views))
    }

    /// Provider-service failure path: prefer a stale cache entry, then
    /// whatever the overrides alone established, and only fail when
    /// there is truly nothing to return.
    async fn degrade(
        &self,
        hash: &str,
        exact: &ExactOutcome,
        cause: ProviderApiError,
    ) -> Result<Resolution, ResolveError> {
        if let Some(entry) = AvailabilityCacheRepo::get_any(&self.pool, hash).await? {
            tracing::warn!(
                address_hash = %hash,
                "Serving stale cache entry after upstream failure"
            );
            return Ok(Resolution {
                provider_ids: entry.provider_ids,
                providers: None,
                tier: None,
                cached: true,
                degraded: true,
            });
        }

        let merged = coverage::merge(exact, &[]);
        if !merged.provider_ids.is_empty() || !merged.denied.is_empty() {
            return Ok(Resolution {
                provider_ids: merged.provider_ids,
                providers: None,
                tier: Some(merged.tier),
                cached: false,
                degraded: true,
            });
        }

        Err(ResolveError::Upstream(cause.to_string()))
    }

    /// Turn resolved ids into full provider objects.
    ///
    /// Enrichment failure downgrades to raw ids; it never fails the
    /// request.
    async fn enrich(
        &self,
        provider_ids: Vec<DbId>,
        tier: Option<MatchTier>,
        cached: bool,
    ) -> Resolution {
        if provider_ids.is_empty() {
            return Resolution {
                provider_ids,
                providers: Some(Vec::new()),
                tier,
                cached,
                degraded: false,
            };
        }

        match self.directory.active_providers().await {
            Ok(all) => {
                let providers: Vec<Provider> = all
                    .into_iter()
                    .filter(|p| provider_ids.contains(&p.id))
                    .collect();
                Resolution {
                    provider_ids,
                    providers: Some(providers),
                    tier,
                    cached,
                    degraded: false,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Provider enrichment failed, returning raw ids");
                Resolution {
                    provider_ids,
                    providers: None,
                    tier,
                    cached,
                    degraded: true,
                }
            }
        }
    }
}
