//! Repository for the `analyses` table.

use sqlx::PgPool;
use satscan_core::status::{SOURCE_API, STATUS_PENDING};
use satscan_core::types::DbId;

use crate::models::analysis::{Analysis, AnalysisFilter, CreateAnalysis};
use crate::models::analysis_image::AnalysisImage;
use crate::repositories::analysis_image_repo::COLUMNS as IMAGE_COLUMNS;
use crate::repositories::SettingsRepo;

const COLUMNS: &str = "id, user_id, name, latitude, longitude, created_at, updated_at";

/// Provides CRUD operations for analyses.
pub struct AnalysisRepo;

impl AnalysisRepo {
    /// Create an analysis with its initial pending image.
    ///
    /// In one transaction: make sure the owner has a settings row, insert
    /// the analysis, then insert a `pending` image with no date or file.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAnalysis,
    ) -> Result<(Analysis, AnalysisImage), sqlx::Error> {
        let mut tx = pool.begin().await?;

        SettingsRepo::ensure(&mut *tx, input.user_id).await?;

        let query = format!(
            "INSERT INTO analyses (user_id, name, latitude, longitude)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let analysis = sqlx::query_as::<_, Analysis>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(input.latitude)
            .bind(input.longitude)
            .fetch_one(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO analysis_images (analysis_id, status, source_type)
             VALUES ($1, $2, $3)
             RETURNING {IMAGE_COLUMNS}"
        );
        let image = sqlx::query_as::<_, AnalysisImage>(&query)
            .bind(analysis.id)
            .bind(STATUS_PENDING)
            .bind(SOURCE_API)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((analysis, image))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Analysis>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM analyses WHERE id = $1");
        sqlx::query_as::<_, Analysis>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List analyses newest first, returning the page and the total match count.
    pub async fn list(
        pool: &PgPool,
        filter: &AnalysisFilter<'_>,
    ) -> Result<(Vec<Analysis>, i64), sqlx::Error> {
        let pattern = filter.search.map(|s| format!("%{}%", escape_like(s)));

        let query = format!(
            "SELECT {COLUMNS} FROM analyses
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR name ILIKE $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Analysis>(&query)
            .bind(filter.owner_id)
            .bind(&pattern)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM analyses
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR name ILIKE $2)",
        )
        .bind(filter.owner_id)
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        Ok((items, total))
    }

    /// Every file path referenced by the analysis' images.
    pub async fn artifact_paths(pool: &PgPool, id: DbId) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT image_path, ppt_path FROM analysis_images WHERE analysis_id = $1",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;
        Ok(flatten_paths(rows))
    }

    /// Every file path referenced by any analysis owned by `user_id`.
    pub async fn artifact_paths_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT i.image_path, i.ppt_path
             FROM analysis_images i
             JOIN analyses a ON a.id = i.analysis_id
             WHERE a.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(flatten_paths(rows))
    }

    /// Delete an analysis; its images cascade. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn flatten_paths(rows: Vec<(Option<String>, Option<String>)>) -> Vec<String> {
    rows.into_iter()
        .flat_map(|(image, ppt)| image.into_iter().chain(ppt))
        .collect()
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
