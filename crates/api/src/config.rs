/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Base URL of the Provider service.
    pub provider_api_url: String,
    /// Per-request timeout for Provider service calls, in seconds.
    pub provider_api_timeout_secs: u64,
    /// Default TTL for availability cache entries, in seconds (default: 24h).
    pub cache_ttl_secs: i64,
    /// How often the expired-entry sweep runs, in seconds.
    pub cache_sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                  |
    /// |-----------------------------|--------------------------|
    /// | `HOST`                      | `0.0.0.0`                |
    /// | `PORT`                      | `3000`                   |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                     |
    /// | `PROVIDER_API_URL`          | `http://localhost:4100`  |
    /// | `PROVIDER_API_TIMEOUT_SECS` | `5`                      |
    /// | `AVAILABILITY_CACHE_TTL_SECS` | `86400`                |
    /// | `CACHE_SWEEP_INTERVAL_SECS` | `3600`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let provider_api_url =
            std::env::var("PROVIDER_API_URL").unwrap_or_else(|_| "http://localhost:4100".into());

        let provider_api_timeout_secs: u64 = std::env::var("PROVIDER_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("PROVIDER_API_TIMEOUT_SECS must be a valid u64");

        let cache_ttl_secs: i64 = std::env::var("AVAILABILITY_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .expect("AVAILABILITY_CACHE_TTL_SECS must be a valid i64");

        let cache_sweep_interval_secs: u64 = std::env::var("CACHE_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("CACHE_SWEEP_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            provider_api_url,
            provider_api_timeout_secs,
            cache_ttl_secs,
            cache_sweep_interval_secs,
        }
    }
}
