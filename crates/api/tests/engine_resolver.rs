//! Integration tests for the resolution engine itself: single-flight
//! deduplication, fallback behavior, TTL overrides, and degradation.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{city_rule, provider, StubDirectory};
use sqlx::PgPool;

use provnet_api::engine::{AvailabilityResolver, ResolveError};
use provnet_core::address::{address_hash, normalize, AddressInput};
use provnet_core::coverage::MatchTier;
use provnet_db::models::technical_access::CreateTechnicalAccessRecord;
use provnet_db::repositories::{AvailabilityCacheRepo, TechnicalAccessRepo};

fn resolver_with(pool: &PgPool, directory: Arc<StubDirectory>) -> AvailabilityResolver {
    AvailabilityResolver::new(pool.clone(), directory, chrono::Duration::hours(24))
}

fn moscow_address() -> AddressInput {
    AddressInput {
        city: Some("Москва".to_string()),
        street: Some("Тверская".to_string()),
        house: Some("25".to_string()),
        building_id: None,
        apartment_id: None,
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_input_serves_fallback_and_writes_no_cache_row(pool: PgPool) {
    let directory = Arc::new(
        StubDirectory::new().with_providers(vec![provider(1, "Rostelecom"), provider(2, "CityLink")]),
    );
    let resolver = resolver_with(&pool, directory);

    let resolution = resolver.resolve(&AddressInput::default()).await.unwrap();

    assert_eq!(resolution.provider_ids, vec![1, 2]);
    assert_eq!(resolution.tier, Some(MatchTier::None));
    assert!(!resolution.cached);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM availability_cache")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_identical_resolves_run_the_matcher_once(pool: PgPool) {
    let directory = Arc::new(
        StubDirectory::new()
            .with_providers(vec![provider(2, "CityLink")])
            .with_rules(vec![city_rule(2, "Москва")])
            // Hold the lookup open long enough for the second caller to
            // arrive while the first is still in flight.
            .with_coverage_delay(Duration::from_millis(100)),
    );
    let resolver = Arc::new(resolver_with(&pool, directory.clone()));

    let input = moscow_address();
    let (a, b) = tokio::join!(resolver.resolve(&input), resolver.resolve(&input));

    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.provider_ids, vec![2]);
    assert_eq!(b.provider_ids, vec![2]);

    assert_eq!(directory.coverage_calls.load(Ordering::SeqCst), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn fresh_cache_hit_never_reaches_the_matcher(pool: PgPool) {
    let directory = Arc::new(StubDirectory::new().with_providers(vec![provider(2, "CityLink")]));
    let resolver = resolver_with(&pool, directory.clone());

    let input = moscow_address();
    let hash = address_hash(&normalize(&input));
    AvailabilityCacheRepo::put(&pool, &hash, &[2], chrono::Duration::hours(1))
        .await
        .unwrap();

    let resolution = resolver.resolve(&input).await.unwrap();

    assert_eq!(resolution.provider_ids, vec![2]);
    assert!(resolution.cached);
    assert_eq!(directory.coverage_calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn stale_cache_entry_beats_failing_upstream(pool: PgPool) {
    let input = moscow_address();
    let hash = address_hash(&normalize(&input));

    AvailabilityCacheRepo::put(&pool, &hash, &[2, 4], chrono::Duration::hours(1))
        .await
        .unwrap();
    sqlx::query(
        "UPDATE availability_cache
         SET created_at = NOW() - INTERVAL '2 days',
             expires_at = NOW() - INTERVAL '1 day'
         WHERE address_hash = $1",
    )
    .bind(&hash)
    .execute(&pool)
    .await
    .unwrap();

    let resolver = resolver_with(&pool, Arc::new(StubDirectory::failing()));
    let resolution = resolver.resolve(&input).await.unwrap();

    assert_eq!(resolution.provider_ids, vec![2, 4]);
    assert!(resolution.cached);
    assert!(resolution.degraded);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upstream_failure_with_nothing_to_serve_is_an_error(pool: PgPool) {
    let resolver = resolver_with(&pool, Arc::new(StubDirectory::failing()));

    let err = resolver.resolve(&moscow_address()).await.unwrap_err();
    assert_matches!(err, ResolveError::Upstream(_));
}

#[sqlx::test(migrations = "../../migrations")]
async fn upstream_failure_still_serves_exact_overrides(pool: PgPool) {
    TechnicalAccessRepo::create(
        &pool,
        &CreateTechnicalAccessRecord {
            building_id: Some(10),
            apartment_id: None,
            provider_id: 1,
            connection_type: "ftth".to_string(),
            is_available: true,
            notes: None,
        },
    )
    .await
    .unwrap();

    let resolver = resolver_with(&pool, Arc::new(StubDirectory::failing()));

    // The positive override settles the match without upstream help;
    // only enrichment fails, so the raw ids still come back.
    let input = AddressInput {
        building_id: Some(10),
        ..Default::default()
    };
    let resolution = resolver.resolve(&input).await.unwrap();

    assert_eq!(resolution.provider_ids, vec![1]);
    assert_eq!(resolution.tier, Some(MatchTier::Exact));
    assert!(resolution.providers.is_none());
    assert!(resolution.degraded);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upstream_failure_preserves_denials(pool: PgPool) {
    TechnicalAccessRepo::create(
        &pool,
        &CreateTechnicalAccessRecord {
            building_id: Some(10),
            apartment_id: None,
            provider_id: 2,
            connection_type: "ftth".to_string(),
            is_available: false,
            notes: None,
        },
    )
    .await
    .unwrap();

    let resolver = resolver_with(&pool, Arc::new(StubDirectory::failing()));

    // Coverage can't be fetched, but the explicit denial is still an
    // answer: empty, authoritative, degraded.
    let input = AddressInput {
        city: Some("Москва".to_string()),
        building_id: Some(10),
        ..Default::default()
    };
    let resolution = resolver.resolve(&input).await.unwrap();

    assert!(resolution.provider_ids.is_empty());
    assert_eq!(resolution.tier, Some(MatchTier::Exact));
    assert!(resolution.degraded);
}

#[sqlx::test(migrations = "../../migrations")]
async fn apartment_override_beats_building_record(pool: PgPool) {
    for record in [
        CreateTechnicalAccessRecord {
            building_id: Some(10),
            apartment_id: None,
            provider_id: 1,
            connection_type: "ftth".to_string(),
            is_available: true,
            notes: None,
        },
        CreateTechnicalAccessRecord {
            building_id: None,
            apartment_id: Some(100),
            provider_id: 1,
            connection_type: "ftth".to_string(),
            is_available: false,
            notes: Some("riser is full".to_string()),
        },
    ] {
        TechnicalAccessRepo::create(&pool, &record).await.unwrap();
    }

    let directory = Arc::new(StubDirectory::new().with_providers(vec![provider(1, "Rostelecom")]));
    let resolver = resolver_with(&pool, directory);

    let input = AddressInput {
        building_id: Some(10),
        apartment_id: Some(100),
        ..Default::default()
    };
    let resolution = resolver.resolve(&input).await.unwrap();

    // The apartment-level denial wins: authoritative empty answer.
    assert!(resolution.provider_ids.is_empty());
    assert_eq!(resolution.tier, Some(MatchTier::Exact));
}

#[sqlx::test(migrations = "../../migrations")]
async fn ttl_override_bounds_the_cache_write(pool: PgPool) {
    let directory = Arc::new(
        StubDirectory::new()
            .with_providers(vec![provider(2, "CityLink")])
            .with_rules(vec![city_rule(2, "Москва")]),
    );
    let resolver = resolver_with(&pool, directory);

    let input = moscow_address();
    resolver
        .resolve_with_ttl(&input, chrono::Duration::seconds(60))
        .await
        .unwrap();

    let hash = address_hash(&normalize(&input));
    let entry = AvailabilityCacheRepo::get_fresh(&pool, &hash)
        .await
        .unwrap()
        .expect("confident result should be cached");

    let ceiling = chrono::Utc::now() + chrono::Duration::seconds(61);
    assert!(entry.expires_at <= ceiling);
}
