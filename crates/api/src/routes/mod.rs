pub mod availability;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /availability/check                     full pipeline (POST)
/// /availability/providers/{building_id}   building lookup, enriched
/// /availability/{address_id}              unit lookup (?type=building|apartment)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/availability", availability::router())
}
