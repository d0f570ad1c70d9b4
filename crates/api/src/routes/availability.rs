//! Route definitions for the `/availability` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::availability;
use crate::state::AppState;

/// Routes mounted at `/api/availability`.
///
/// ```text
/// POST /check                        -> check
/// GET  /providers/{building_id}      -> providers_for_building
/// GET  /{address_id}                 -> resolve_unit
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check", post(availability::check))
        .route(
            "/providers/{building_id}",
            get(availability::providers_for_building),
        )
        .route("/{address_id}", get(availability::resolve_unit))
}
