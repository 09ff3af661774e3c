//! Handlers for `/process`: run detection on a fresh or uploaded image.
//!
//! Processing is synchronous. The image record moves `processing` →
//! `completed` (or `failed`) before the response is sent.

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use satscan_core::detection::GeoFrame;
use satscan_core::error::CoreError;
use satscan_core::status::{SOURCE_API, SOURCE_UPLOAD};
use satscan_core::types::{DbId, Timestamp};
use satscan_core::upload::{image_extension, stored_image_name, ALLOWED_IMAGE_EXTENSIONS};
use satscan_core::validation::parse_image_date;
use satscan_db::models::analysis::Analysis;
use satscan_db::models::analysis_image::AnalysisImage;
use satscan_db::repositories::{AnalysisImageRepo, SettingsRepo};
use satscan_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::extract::{AppForm, AppJson};
use crate::handlers::load_owned_analysis;
use crate::middleware::auth::AuthUser;
use crate::response::AnalysisDetail;
use crate::state::AppState;
use crate::storage::{remove_artifacts, save_artifact};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Form body for `POST /process/recent`.
#[derive(Debug, Default, Deserialize)]
pub struct RecentForm {
    pub analysis_id: Option<String>,
}

/// Request body for `POST /process/temporal`.
#[derive(Debug, Default, Deserialize)]
pub struct TemporalRequest {
    pub analysis_id: Option<DbId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub message: &'static str,
    /// The image that was just processed.
    pub image: AnalysisImage,
    pub analysis: AnalysisDetail,
}

fn parse_analysis_id(raw: Option<&str>) -> AppResult<DbId> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        AppError::Core(CoreError::Validation("Analysis ID is required".into()))
    })?;
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid analysis ID '{raw}'")))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

// ---------------------------------------------------------------------------
// Detection pipeline
// ---------------------------------------------------------------------------

/// Start processing the image stored at `path`.
///
/// The file was written before any row points at it, so it is removed
/// again when the record cannot be created.
pub async fn begin_processing_or_discard(
    pool: &DbPool,
    analysis_id: DbId,
    source_type: &str,
    path: String,
    image_date: Timestamp,
) -> AppResult<AnalysisImage> {
    match AnalysisImageRepo::begin_processing(pool, analysis_id, source_type, &path, image_date)
        .await
    {
        Ok(image) => Ok(image),
        Err(e) => {
            tracing::warn!(analysis_id, path = %path, error = %e, "Could not start processing");
            remove_artifacts(&[path]).await;
            Err(e.into())
        }
    }
}

/// Detect objects in `bytes` and store the results on `image`.
///
/// Uses the analysis owner's feature settings. On a detector failure the
/// image is marked `failed` and the error returned.
async fn detect_into(
    state: &AppState,
    analysis: &Analysis,
    image: &AnalysisImage,
    bytes: Bytes,
) -> AppResult<AnalysisImage> {
    let features = SettingsRepo::get_or_create(&state.pool, analysis.user_id)
        .await?
        .features();

    let detector = state.detector.clone();
    let detected = tokio::task::spawn_blocking(move || detector.detect(&bytes, &features))
        .await
        .map_err(|e| AppError::InternalError(format!("Detection task failed: {e}")))?;

    let result = match detected {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(analysis_id = analysis.id, image_id = image.id, error = %e, "Detection failed");
            AnalysisImageRepo::mark_failed(&state.pool, image.id).await?;
            return Err(CoreError::from(e).into());
        }
    };

    let output = result.to_output(&GeoFrame::new(analysis.latitude, analysis.longitude));
    let image = AnalysisImageRepo::record_detection(&state.pool, image.id, &output)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "AnalysisImage",
            id: image.id,
        }))?;

    tracing::info!(
        analysis_id = analysis.id,
        image_id = image.id,
        runway = image.runway_detected,
        aircraft = image.aircraft_count,
        houses = image.house_count,
        "Detection recorded"
    );
    Ok(image)
}

async fn respond(
    state: &AppState,
    analysis: Analysis,
    image: AnalysisImage,
    message: &'static str,
) -> AppResult<Json<ProcessResponse>> {
    let latest_image = AnalysisImageRepo::find_latest(&state.pool, analysis.id).await?;
    Ok(Json(ProcessResponse {
        message,
        image,
        analysis: AnalysisDetail {
            analysis,
            latest_image,
        },
    }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/process/recent
///
/// Fetch the most recent image for the analysis' coordinates and process it.
pub async fn recent(
    auth: AuthUser,
    State(state): State<AppState>,
    AppForm(form): AppForm<RecentForm>,
) -> AppResult<Json<ProcessResponse>> {
    let id = parse_analysis_id(form.analysis_id.as_deref())?;
    let analysis = load_owned_analysis(&state, &auth.identity, id).await?;

    let imagery = state.imagery.clone();
    let (lat, lon) = (analysis.latitude, analysis.longitude);
    let fetched = tokio::task::spawn_blocking(move || imagery.fetch(lat, lon))
        .await
        .map_err(|e| AppError::InternalError(format!("Imagery task failed: {e}")))?
        .map_err(CoreError::from)?;

    let file_name = format!(
        "analysis_{id}_{}.{}",
        fetched.image_date.format("%Y%m%d%H%M%S"),
        fetched.extension
    );
    let path = save_artifact(&state.config.upload_dir, &file_name, &fetched.bytes).await?;

    let image =
        begin_processing_or_discard(&state.pool, id, SOURCE_API, path, fetched.image_date).await?;
    let image = detect_into(&state, &analysis, &image, Bytes::from(fetched.bytes)).await?;

    respond(&state, analysis, image, "Image processed successfully").await
}

/// POST /api/process/upload
///
/// Multipart fields: `file` (required), `analysis_id` (required),
/// `image_date` (optional, `YYYY-MM-DD`, defaults to now).
pub async fn upload(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ProcessResponse>> {
    let mut file: Option<(String, Bytes)> = None;
    let mut analysis_id: Option<String> = None;
    let mut image_date: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, data));
            }
            "analysis_id" => {
                analysis_id = Some(field.text().await.map_err(multipart_error)?);
            }
            "image_date" => {
                image_date = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| AppError::BadRequest("No file part".into()))?;
    if file_name.trim().is_empty() {
        return Err(AppError::BadRequest("No selected file".into()));
    }

    let id = parse_analysis_id(analysis_id.as_deref())?;
    let analysis = load_owned_analysis(&state, &auth.identity, id).await?;

    if image_extension(&file_name).is_none() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "File type not allowed. Allowed types: {}",
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        ))));
    }

    let image_date: Timestamp = match image_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_image_date(raw)?,
        _ => Utc::now(),
    };

    let path = save_artifact(
        &state.config.upload_dir,
        &stored_image_name(id, &file_name),
        &data,
    )
    .await?;
    tracing::info!(analysis_id = id, path = %path, bytes = data.len(), "Upload stored");

    let image =
        begin_processing_or_discard(&state.pool, id, SOURCE_UPLOAD, path, image_date).await?;
    let image = detect_into(&state, &analysis, &image, data).await?;

    respond(&state, analysis, image, "Image uploaded and processed successfully").await
}

/// POST /api/process/temporal
///
/// Validates the request and access, then reports 501: change detection
/// between two dates is not available.
pub async fn temporal(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<TemporalRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let (Some(id), Some(start), Some(end)) = (
        input.analysis_id,
        input.start_date.as_deref(),
        input.end_date.as_deref(),
    ) else {
        return Err(AppError::Core(CoreError::Validation(
            "Missing required parameters: analysis_id, start_date, end_date".into(),
        )));
    };
    parse_image_date(start)?;
    parse_image_date(end)?;

    load_owned_analysis(&state, &auth.identity, id).await?;

    Err(AppError::Core(CoreError::NotImplemented(
        "Temporal analysis is not implemented yet".into(),
    )))
}
