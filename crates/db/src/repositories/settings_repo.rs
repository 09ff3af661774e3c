//! Repository for the `analysis_settings` table.

use sqlx::{PgConnection, PgPool};
use satscan_core::types::DbId;

use crate::models::settings::{AnalysisSettings, UpdateSettings};

const COLUMNS: &str = "id, user_id, detect_runways, detect_aircraft, detect_houses, \
    detect_roads, detect_water_bodies, created_at, updated_at";

pub struct SettingsRepo;

impl SettingsRepo {
    /// Insert a default settings row for `user_id` unless one exists.
    ///
    /// Takes a connection so callers can run it inside their own transaction.
    pub async fn ensure(conn: &mut PgConnection, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO analysis_settings (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Fetch a user's settings, creating the default row on first access.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<AnalysisSettings, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::ensure(&mut *conn, user_id).await?;
        let query = format!("SELECT {COLUMNS} FROM analysis_settings WHERE user_id = $1");
        sqlx::query_as::<_, AnalysisSettings>(&query)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Apply a partial update, creating the row (defaults + changes) if absent.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpdateSettings,
    ) -> Result<AnalysisSettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO analysis_settings
                (user_id, detect_runways, detect_aircraft, detect_houses, detect_roads, detect_water_bodies)
             VALUES ($1, COALESCE($2, true), COALESCE($3, true), COALESCE($4, true),
                     COALESCE($5, true), COALESCE($6, true))
             ON CONFLICT (user_id) DO UPDATE SET
                detect_runways = COALESCE($2, analysis_settings.detect_runways),
                detect_aircraft = COALESCE($3, analysis_settings.detect_aircraft),
                detect_houses = COALESCE($4, analysis_settings.detect_houses),
                detect_roads = COALESCE($5, analysis_settings.detect_roads),
                detect_water_bodies = COALESCE($6, analysis_settings.detect_water_bodies)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnalysisSettings>(&query)
            .bind(user_id)
            .bind(input.detect_runways)
            .bind(input.detect_aircraft)
            .bind(input.detect_houses)
            .bind(input.detect_roads)
            .bind(input.detect_water_bodies)
            .fetch_one(pool)
            .await
    }
}
