//! Handlers for the availability resolution endpoints.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use provnet_core::address::AddressInput;
use provnet_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for the unit lookup endpoint.
#[derive(Debug, Deserialize)]
pub struct UnitQuery {
    /// `building` (default) or `apartment`.
    #[serde(rename = "type")]
    pub unit_type: Option<String>,
}

/// Body of `POST /availability/check`.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckRequest {
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 255))]
    pub street: Option<String>,
    #[validate(length(max = 64))]
    pub house: Option<String>,
    pub building_id: Option<DbId>,
    pub apartment_id: Option<DbId>,
}

impl CheckRequest {
    fn into_address(self) -> AddressInput {
        AddressInput {
            city: self.city,
            street: self.street,
            house: self.house,
            building_id: self.building_id,
            apartment_id: self.apartment_id,
        }
    }
}

/// GET /availability/{address_id}?type=building|apartment
///
/// Exact-matcher-first resolution for a known unit.
pub async fn resolve_unit(
    State(state): State<AppState>,
    Path(address_id): Path<DbId>,
    Query(query): Query<UnitQuery>,
) -> AppResult<impl IntoResponse> {
    let input = match query.unit_type.as_deref().unwrap_or("building") {
        "building" => AddressInput {
            building_id: Some(address_id),
            ..Default::default()
        },
        "apartment" => AddressInput {
            apartment_id: Some(address_id),
            ..Default::default()
        },
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown unit type '{other}', expected 'building' or 'apartment'"
            )))
        }
    };

    let resolution = state.resolver.resolve(&input).await?;
    Ok(Json(ApiResponse::ok(resolution)))
}

/// POST /availability/check
///
/// Full resolution pipeline for a structured address.
pub async fn check(
    State(state): State<AppState>,
    Json(input): Json<CheckRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let address = input.into_address();
    if address.is_empty() {
        return Err(AppError::BadRequest(
            "At least one address component is required".to_string(),
        ));
    }

    let resolution = state.resolver.resolve(&address).await?;
    Ok(Json(ApiResponse::ok(resolution)))
}

/// GET /availability/providers/{building_id}
///
/// Alias of the building-id lookup; the resolution carries full
/// provider objects whenever the Provider service is reachable.
pub async fn providers_for_building(
    State(state): State<AppState>,
    Path(building_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let input = AddressInput {
        building_id: Some(building_id),
        ..Default::default()
    };

    let resolution = state.resolver.resolve(&input).await?;
    Ok(Json(ApiResponse::ok(resolution)))
}
