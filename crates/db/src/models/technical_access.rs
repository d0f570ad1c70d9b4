//! Technical-access entity model and DTOs.
//!
//! A technical-access record is an authoritative per-building or
//! per-apartment statement that one provider can or cannot serve that
//! unit, overriding coarse coverage rules. Rows are owned by back-office
//! processes; this service reads them.

use provnet_core::coverage::{AccessRecord, UnitScope};
use provnet_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `technical_access` table.
///
/// Exactly one of `building_id` / `apartment_id` is set (CHECK
/// constraint); at most one active row exists per unit+provider pair
/// (partial unique indexes).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TechnicalAccessRecord {
    pub id: DbId,
    pub building_id: Option<DbId>,
    pub apartment_id: Option<DbId>,
    pub provider_id: DbId,
    pub connection_type: String,
    pub is_available: bool,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TechnicalAccessRecord {
    /// Granularity of this record: apartment beats building when the
    /// matcher reconciles conflicting records for one provider.
    pub fn scope(&self) -> UnitScope {
        if self.apartment_id.is_some() {
            UnitScope::Apartment
        } else {
            UnitScope::Building
        }
    }

    /// Reduce to the view the coverage matcher operates on.
    pub fn as_access_record(&self) -> AccessRecord {
        AccessRecord {
            provider_id: self.provider_id,
            scope: self.scope(),
            is_available: self.is_available,
        }
    }
}

/// DTO for creating a technical-access record (seeding and tests; the
/// mutation surface proper lives in the back office).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTechnicalAccessRecord {
    pub building_id: Option<DbId>,
    pub apartment_id: Option<DbId>,
    pub provider_id: DbId,
    pub connection_type: String,
    pub is_available: bool,
    pub notes: Option<String>,
}
