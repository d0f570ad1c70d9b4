//! REST client for the Provider service HTTP endpoints.
//!
//! Wraps `GET /api/providers` and `GET /api/coverage/check` using
//! [`reqwest`]. Every call carries a bounded timeout; a failed attempt
//! (timeout, connect error, 5xx) is retried exactly once after a short
//! backoff before the error propagates to the resolver's degradation
//! path.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use provnet_core::address::AddressKey;
use provnet_core::coverage::CoverageRule;

use crate::directory::{Provider, ProviderDirectory};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before the single retry attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Errors from the Provider service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderApiError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Provider service returned a non-2xx status code.
    #[error("Provider service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The Provider service answered 2xx but with `success: false`.
    #[error("Provider service rejected the request: {0}")]
    Rejected(String),
}

impl ProviderApiError {
    /// Whether one retry is worth attempting.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::Rejected(_) => false,
        }
    }
}

/// Response envelope used by the Provider service.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// HTTP client for the Provider service.
pub struct ProviderApi {
    client: reqwest::Client,
    base_url: String,
}

impl ProviderApi {
    /// Create a new client with the default request timeout.
    ///
    /// * `base_url` - e.g. `http://provider-svc:4100`.
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new client with an explicit request timeout.
    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET a path with query params, retrying once on transient failure.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderApiError> {
        let url = format!("{}{path}", self.base_url);

        match self.try_get(&url, query).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_retryable() => {
                tracing::warn!(path, error = %e, "Provider service call failed, retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.try_get(&url, query).await
            }
            Err(e) => Err(e),
        }
    }

    /// Execute a single GET and unwrap the response envelope.
    async fn try_get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderApiError> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> = response.json().await?;
        if !envelope.success {
            return Err(ProviderApiError::Rejected(
                envelope.error.unwrap_or_else(|| "no error detail".to_string()),
            ));
        }
        envelope.data.ok_or_else(|| {
            ProviderApiError::Rejected("success response without data".to_string())
        })
    }
}

#[async_trait]
impl ProviderDirectory for ProviderApi {
    async fn active_providers(&self) -> Result<Vec<Provider>, ProviderApiError> {
        let providers: Vec<Provider> = self.get_json("/api/providers", &[]).await?;
        Ok(providers.into_iter().filter(|p| p.is_active).collect())
    }

    async fn coverage_rules(&self, key: &AddressKey) -> Result<Vec<CoverageRule>, ProviderApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(city) = &key.city {
            query.push(("city", city.clone()));
        }
        if let Some(street) = &key.street {
            query.push(("street", street.clone()));
        }
        if let Some(house) = key.house_number() {
            query.push(("house", house.to_string()));
        }

        self.get_json("/api/coverage/check", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = ProviderApi::new("http://localhost:4100/".to_string());
        assert_eq!(api.base_url, "http://localhost:4100");
    }

    #[test]
    fn api_errors_with_5xx_are_retryable() {
        let err = ProviderApiError::Api {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_retryable());

        let err = ProviderApiError::Api {
            status: 404,
            body: String::new(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn rejected_is_not_retryable() {
        assert!(!ProviderApiError::Rejected("nope".to_string()).is_retryable());
    }
}
