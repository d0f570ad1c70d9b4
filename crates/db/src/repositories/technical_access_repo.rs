//! Repository for the `technical_access` table.

use sqlx::PgPool;

use provnet_core::types::DbId;

use crate::models::technical_access::{CreateTechnicalAccessRecord, TechnicalAccessRecord};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, building_id, apartment_id, provider_id, connection_type, \
                       is_available, notes, is_active, created_at, updated_at";

/// Read access to per-unit availability overrides.
pub struct TechnicalAccessRepo;

impl TechnicalAccessRepo {
    /// All active records for a building.
    pub async fn find_active_for_building(
        pool: &PgPool,
        building_id: DbId,
    ) -> Result<Vec<TechnicalAccessRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM technical_access
             WHERE building_id = $1 AND is_active
             ORDER BY provider_id"
        );
        sqlx::query_as::<_, TechnicalAccessRecord>(&query)
            .bind(building_id)
            .fetch_all(pool)
            .await
    }

    /// All active records for an apartment, plus the enclosing
    /// building's records when the caller knows the building id.
    ///
    /// Both levels are returned so the matcher can apply its
    /// most-specific-wins precedence in one pass.
    pub async fn find_active_for_apartment(
        pool: &PgPool,
        apartment_id: DbId,
        building_id: Option<DbId>,
    ) -> Result<Vec<TechnicalAccessRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM technical_access
             WHERE is_active AND (apartment_id = $1 OR ($2::BIGINT IS NOT NULL AND building_id = $2))
             ORDER BY provider_id"
        );
        sqlx::query_as::<_, TechnicalAccessRecord>(&query)
            .bind(apartment_id)
            .bind(building_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a new record, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTechnicalAccessRecord,
    ) -> Result<TechnicalAccessRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO technical_access
                 (building_id, apartment_id, provider_id, connection_type, is_available, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TechnicalAccessRecord>(&query)
            .bind(input.building_id)
            .bind(input.apartment_id)
            .bind(input.provider_id)
            .bind(&input.connection_type)
            .bind(input.is_available)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }
}
