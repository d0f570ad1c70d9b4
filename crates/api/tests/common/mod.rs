//! Shared helpers for API integration tests.
//!
//! Provides a stub Provider service with call counters, a test
//! `ServerConfig`, and request helpers that drive the router via
//! `tower::ServiceExt` without a TCP listener.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use provnet_api::config::ServerConfig;
use provnet_api::engine::AvailabilityResolver;
use provnet_api::router::build_app_router;
use provnet_api::state::AppState;
use provnet_core::address::AddressKey;
use provnet_core::coverage::CoverageRule;
use provnet_provider::{Provider, ProviderApiError, ProviderDirectory};

/// In-memory double for the Provider service, with call counters so
/// tests can assert how often the resolver actually reached upstream.
pub struct StubDirectory {
    providers: Vec<Provider>,
    rules: Vec<CoverageRule>,
    fail: bool,
    coverage_delay: Option<Duration>,
    pub coverage_calls: AtomicUsize,
    pub provider_calls: AtomicUsize,
}

impl StubDirectory {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            rules: Vec::new(),
            fail: false,
            coverage_delay: None,
            coverage_calls: AtomicUsize::new(0),
            provider_calls: AtomicUsize::new(0),
        }
    }

    /// A stub whose every call fails like an unreachable service.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_providers(mut self, providers: Vec<Provider>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_rules(mut self, rules: Vec<CoverageRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Hold each coverage lookup open, so concurrent callers overlap.
    pub fn with_coverage_delay(mut self, delay: Duration) -> Self {
        self.coverage_delay = Some(delay);
        self
    }
}

#[async_trait]
impl ProviderDirectory for StubDirectory {
    async fn active_providers(&self) -> Result<Vec<Provider>, ProviderApiError> {
        self.provider_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderApiError::Api {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(self
            .providers
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn coverage_rules(
        &self,
        _key: &AddressKey,
    ) -> Result<Vec<CoverageRule>, ProviderApiError> {
        self.coverage_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.coverage_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderApiError::Api {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(self.rules.clone())
    }
}

/// An active provider with the given id and name.
pub fn provider(id: i64, name: &str) -> Provider {
    Provider {
        id,
        name: name.to_string(),
        is_active: true,
        description: None,
    }
}

/// A city-wide coverage rule.
pub fn city_rule(provider_id: i64, city: &str) -> CoverageRule {
    CoverageRule {
        provider_id,
        city: city.to_string(),
        district: None,
        street: None,
        house_from: None,
        house_to: None,
    }
}

/// A street-level coverage rule with house bounds.
pub fn street_rule(provider_id: i64, city: &str, street: &str, from: i64, to: i64) -> CoverageRule {
    CoverageRule {
        provider_id,
        city: city.to_string(),
        district: None,
        street: Some(street.to_string()),
        house_from: Some(from),
        house_to: Some(to),
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        provider_api_url: "http://localhost:4100".to_string(),
        provider_api_timeout_secs: 5,
        cache_ttl_secs: 86400,
        cache_sweep_interval_secs: 3600,
    }
}

/// Build the full application router with all middleware layers, using
/// the given database pool and Provider service double.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack that production uses.
pub fn build_test_app(pool: PgPool, directory: Arc<StubDirectory>) -> Router {
    let config = test_config();
    let resolver = Arc::new(AvailabilityResolver::new(
        pool.clone(),
        directory,
        chrono::Duration::seconds(config.cache_ttl_secs),
    ));
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        resolver,
    };
    build_app_router(state, &config)
}

/// Send a GET request to the app.
pub async fn get(app: Router, path: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(path)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a POST request with a JSON body to the app.
pub async fn post_json(app: Router, path: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
