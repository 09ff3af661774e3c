//! Repository for the `analysis_images` table.

use sqlx::{PgConnection, PgPool};
use satscan_core::detection::DetectionOutput;
use satscan_core::status::{
    SOURCE_API, SOURCE_HISTORICAL, STATUS_COMPLETED, STATUS_FAILED, STATUS_PENDING,
    STATUS_PROCESSING,
};
use satscan_core::types::{DbId, Timestamp};

use crate::models::analysis_image::{AnalysisImage, CreateAnalysisImage};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, analysis_id, image_date, processing_date, image_path, \
    ppt_path, runway_detected, runway_length, runway_width, aircraft_count, house_count, \
    road_count, water_body_count, geojson_data, status, source_type, created_at, updated_at";

/// "Latest image" ordering: newest `image_date` first, undated last, ties by insertion.
const LATEST_FIRST: &str = "ORDER BY image_date DESC NULLS LAST, id ASC";

/// SQL twin of [`AnalysisImage::is_untouched`].
const UNTOUCHED: &str = "processing_date IS NULL AND geojson_data IS NULL \
    AND NOT runway_detected AND aircraft_count = 0 AND house_count = 0 \
    AND road_count = 0 AND water_body_count = 0";

/// Provides CRUD, processing and backfill operations for analysis images.
pub struct AnalysisImageRepo;

impl AnalysisImageRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Attach a new image record to an analysis.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAnalysisImage,
    ) -> Result<AnalysisImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO analysis_images (analysis_id, image_date, image_path, status, source_type)
             VALUES ($1, $2, $3, COALESCE($4, '{STATUS_PENDING}'), COALESCE($5, '{SOURCE_API}'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(input.analysis_id)
            .bind(input.image_date)
            .bind(&input.image_path)
            .bind(&input.status)
            .bind(&input.source_type)
            .fetch_one(pool)
            .await
    }

    /// All images of an analysis, latest first.
    pub async fn list_by_analysis(
        pool: &PgPool,
        analysis_id: DbId,
    ) -> Result<Vec<AnalysisImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM analysis_images WHERE analysis_id = $1 {LATEST_FIRST}"
        );
        sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(analysis_id)
            .fetch_all(pool)
            .await
    }

    /// Find an image by ID, but only if it belongs to `analysis_id`.
    pub async fn find_in_analysis(
        pool: &PgPool,
        analysis_id: DbId,
        image_id: DbId,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM analysis_images WHERE id = $1 AND analysis_id = $2"
        );
        sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(image_id)
            .bind(analysis_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_latest(
        pool: &PgPool,
        analysis_id: DbId,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::latest(&mut *conn, analysis_id).await
    }

    async fn latest(
        conn: &mut PgConnection,
        analysis_id: DbId,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM analysis_images WHERE analysis_id = $1 {LATEST_FIRST} LIMIT 1"
        );
        sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(analysis_id)
            .fetch_optional(conn)
            .await
    }

    /// Images of an analysis that reference a stored file, latest first.
    ///
    /// The files may have gone missing since; callers check the disk.
    pub async fn list_with_artifacts(
        pool: &PgPool,
        analysis_id: DbId,
    ) -> Result<Vec<AnalysisImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM analysis_images
             WHERE analysis_id = $1 AND image_path IS NOT NULL
             {LATEST_FIRST}"
        );
        sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(analysis_id)
            .fetch_all(pool)
            .await
    }

    // ── Demo-data backfill ───────────────────────────────────────────

    /// Populate the latest image with `output` if no image of the analysis
    /// has ever recorded anything.
    ///
    /// Runs under a row lock on the parent analysis and re-checks the image
    /// state after acquiring it, so the backfill happens at most once per
    /// analysis: the first writer wins and later callers see its data. An
    /// analysis without images gets a `historical` image holding `output`.
    ///
    /// Returns the latest image afterwards, or `None` if the analysis is gone.
    pub async fn backfill_detection(
        pool: &PgPool,
        analysis_id: DbId,
        output: &DetectionOutput,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        Self::backfill(pool, analysis_id, output, false).await
    }

    /// Like [`Self::backfill_detection`], but returns the most recent image
    /// carrying geometry. When no image of the analysis has any, the latest
    /// image gets `output.geojson`. Stored geometry is never replaced.
    pub async fn backfill_geometry(
        pool: &PgPool,
        analysis_id: DbId,
        output: &DetectionOutput,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        Self::backfill(pool, analysis_id, output, true).await
    }

    async fn backfill(
        pool: &PgPool,
        analysis_id: DbId,
        output: &DetectionOutput,
        fill_geometry: bool,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked: Option<DbId> =
            sqlx::query_scalar("SELECT id FROM analyses WHERE id = $1 FOR UPDATE")
                .bind(analysis_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let recorded_query = format!(
            "SELECT EXISTS (
                SELECT 1 FROM analysis_images WHERE analysis_id = $1 AND NOT ({UNTOUCHED})
             )"
        );
        let recorded: bool = sqlx::query_scalar(&recorded_query)
            .bind(analysis_id)
            .fetch_one(&mut *tx)
            .await?;

        let image = match Self::latest(&mut *tx, analysis_id).await? {
            None => {
                let query = format!(
                    "INSERT INTO analysis_images
                        (analysis_id, image_date, runway_detected, runway_length, runway_width,
                         aircraft_count, house_count, road_count, water_body_count, geojson_data,
                         status, source_type)
                     VALUES ($1, NOW(), $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, AnalysisImage>(&query)
                    .bind(analysis_id)
                    .bind(output.runway_detected)
                    .bind(output.runway_length)
                    .bind(output.runway_width)
                    .bind(output.aircraft_count)
                    .bind(output.house_count)
                    .bind(output.road_count)
                    .bind(output.water_body_count)
                    .bind(&output.geojson)
                    .bind(STATUS_COMPLETED)
                    .bind(SOURCE_HISTORICAL)
                    .fetch_one(&mut *tx)
                    .await?
            }
            Some(image) if !recorded => {
                let query = format!(
                    "UPDATE analysis_images SET
                        runway_detected = $2,
                        runway_length = $3,
                        runway_width = $4,
                        aircraft_count = $5,
                        house_count = $6,
                        road_count = $7,
                        water_body_count = $8,
                        geojson_data = $9,
                        status = $10
                     WHERE id = $1 AND {UNTOUCHED}
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, AnalysisImage>(&query)
                    .bind(image.id)
                    .bind(output.runway_detected)
                    .bind(output.runway_length)
                    .bind(output.runway_width)
                    .bind(output.aircraft_count)
                    .bind(output.house_count)
                    .bind(output.road_count)
                    .bind(output.water_body_count)
                    .bind(&output.geojson)
                    .bind(STATUS_COMPLETED)
                    .fetch_optional(&mut *tx)
                    .await?
                    .unwrap_or(image)
            }
            Some(image) if fill_geometry => {
                match Self::latest_with_geometry(&mut *tx, analysis_id).await? {
                    Some(with_geometry) => with_geometry,
                    None => {
                        let query = format!(
                            "UPDATE analysis_images SET geojson_data = $2
                             WHERE id = $1 AND geojson_data IS NULL
                             RETURNING {COLUMNS}"
                        );
                        sqlx::query_as::<_, AnalysisImage>(&query)
                            .bind(image.id)
                            .bind(&output.geojson)
                            .fetch_optional(&mut *tx)
                            .await?
                            .unwrap_or(image)
                    }
                }
            }
            Some(image) => image,
        };

        tx.commit().await?;
        Ok(Some(image))
    }

    async fn latest_with_geometry(
        conn: &mut PgConnection,
        analysis_id: DbId,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM analysis_images
             WHERE analysis_id = $1 AND geojson_data IS NOT NULL
             {LATEST_FIRST} LIMIT 1"
        );
        sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(analysis_id)
            .fetch_optional(conn)
            .await
    }

    // ── Processing lifecycle ─────────────────────────────────────────

    /// Start processing a new image for an analysis.
    ///
    /// Claims the untouched `pending` placeholder created with the analysis
    /// when one is still available; otherwise inserts a new image. Either
    /// way the returned row is `processing` with `processing_date` set.
    pub async fn begin_processing(
        pool: &PgPool,
        analysis_id: DbId,
        source_type: &str,
        image_path: &str,
        image_date: Timestamp,
    ) -> Result<AnalysisImage, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let claim = format!(
            "SELECT id FROM analysis_images
             WHERE analysis_id = $1 AND status = '{STATUS_PENDING}' AND image_path IS NULL
               AND {UNTOUCHED}
             ORDER BY id
             LIMIT 1
             FOR UPDATE SKIP LOCKED"
        );
        let claimed: Option<DbId> = sqlx::query_scalar(&claim)
            .bind(analysis_id)
            .fetch_optional(&mut *tx)
            .await?;

        let image = match claimed {
            Some(id) => {
                let query = format!(
                    "UPDATE analysis_images SET
                        status = $2,
                        processing_date = NOW(),
                        image_path = $3,
                        image_date = $4,
                        source_type = $5
                     WHERE id = $1
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, AnalysisImage>(&query)
                    .bind(id)
                    .bind(STATUS_PROCESSING)
                    .bind(image_path)
                    .bind(image_date)
                    .bind(source_type)
                    .fetch_one(&mut *tx)
                    .await?
            }
            None => {
                let query = format!(
                    "INSERT INTO analysis_images
                        (analysis_id, status, processing_date, image_path, image_date, source_type)
                     VALUES ($1, $2, NOW(), $3, $4, $5)
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, AnalysisImage>(&query)
                    .bind(analysis_id)
                    .bind(STATUS_PROCESSING)
                    .bind(image_path)
                    .bind(image_date)
                    .bind(source_type)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        tx.commit().await?;
        Ok(image)
    }

    /// Store detection results and mark the image `completed`.
    pub async fn record_detection(
        pool: &PgPool,
        image_id: DbId,
        output: &DetectionOutput,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        let query = format!(
            "UPDATE analysis_images SET
                runway_detected = $2,
                runway_length = $3,
                runway_width = $4,
                aircraft_count = $5,
                house_count = $6,
                road_count = $7,
                water_body_count = $8,
                geojson_data = $9,
                status = $10,
                processing_date = COALESCE(processing_date, NOW())
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(image_id)
            .bind(output.runway_detected)
            .bind(output.runway_length)
            .bind(output.runway_width)
            .bind(output.aircraft_count)
            .bind(output.house_count)
            .bind(output.road_count)
            .bind(output.water_body_count)
            .bind(&output.geojson)
            .bind(STATUS_COMPLETED)
            .fetch_optional(pool)
            .await
    }

    /// Mark an image `failed`. Returns `true` if a row was updated.
    pub async fn mark_failed(pool: &PgPool, image_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE analysis_images SET status = $2 WHERE id = $1")
            .bind(image_id)
            .bind(STATUS_FAILED)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record where the generated report for this image lives.
    pub async fn set_report_path(
        pool: &PgPool,
        image_id: DbId,
        ppt_path: &str,
    ) -> Result<Option<AnalysisImage>, sqlx::Error> {
        let query = format!(
            "UPDATE analysis_images SET ppt_path = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(image_id)
            .bind(ppt_path)
            .fetch_optional(pool)
            .await
    }
}
