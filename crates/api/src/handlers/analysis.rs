//! Handlers for the `/analysis` resource and its images.
//!
//! Reading an analysis (or its GeoJSON) backfills demo detection data the
//! first time, so a freshly created analysis already shows results.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use satscan_core::error::CoreError;
use satscan_core::paging::PageRequest;
use satscan_core::placeholder::demo_output;
use satscan_core::status::VALID_SOURCE_TYPES;
use satscan_core::types::DbId;
use satscan_core::validation::{parse_image_date, validate_analysis_name, validate_coordinates};
use satscan_db::models::analysis::{Analysis, AnalysisFilter, CreateAnalysis};
use satscan_db::models::analysis_image::{AnalysisImage, CreateAnalysisImage};
use satscan_db::repositories::{AnalysisImageRepo, AnalysisRepo};

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::load_owned_analysis;
use crate::middleware::auth::AuthUser;
use crate::response::{AnalysisDetail, AnalysisEnvelope, MessageResponse};
use crate::state::AppState;
use crate::storage::remove_artifacts;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /analysis`.
#[derive(Debug, Deserialize)]
pub struct CreateAnalysisRequest {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Query parameters for `GET /analysis`.
///
/// Kept as raw strings so a malformed number is reported in the usual
/// error shape.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisPage {
    pub analyses: Vec<Analysis>,
    pub total: i64,
    pub pages: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Request body for `POST /analysis/{id}/images`.
#[derive(Debug, Default, Deserialize)]
pub struct AddImageRequest {
    /// `YYYY-MM-DD`.
    pub image_date: Option<String>,
    pub source_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageList {
    pub images: Vec<AnalysisImage>,
}

#[derive(Debug, Serialize)]
pub struct ImageEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub image: AnalysisImage,
}

fn parse_positive(name: &str, raw: Option<&str>) -> AppResult<Option<i64>> {
    raw.map(|value| {
        value
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest(format!("{name} must be a positive integer")))
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/analysis
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateAnalysisRequest>,
) -> AppResult<(StatusCode, Json<AnalysisEnvelope>)> {
    validate_analysis_name(&input.name)?;
    validate_coordinates(input.latitude, input.longitude)?;

    let (analysis, image) = AnalysisRepo::create(
        &state.pool,
        &CreateAnalysis {
            user_id: auth.identity.id,
            name: input.name.trim().to_string(),
            latitude: input.latitude,
            longitude: input.longitude,
        },
    )
    .await?;

    tracing::info!(
        analysis_id = analysis.id,
        user_id = auth.identity.id,
        "Analysis created"
    );

    Ok((
        StatusCode::CREATED,
        Json(AnalysisEnvelope {
            message: Some("Analysis created successfully"),
            analysis: AnalysisDetail {
                analysis,
                latest_image: Some(image),
            },
        }),
    ))
}

/// GET /api/analysis?page&per_page&search
///
/// Administrators see every analysis; everyone else only their own.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<AnalysisPage>> {
    let paging = PageRequest::new(
        parse_positive("page", params.page.as_deref())?,
        parse_positive("per_page", params.per_page.as_deref())?,
    )?;
    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let filter = AnalysisFilter {
        owner_id: (!auth.identity.is_admin).then_some(auth.identity.id),
        search,
        limit: paging.per_page,
        offset: paging.offset(),
    };
    let (analyses, total) = AnalysisRepo::list(&state.pool, &filter).await?;

    Ok(Json(AnalysisPage {
        analyses,
        total,
        pages: paging.page_count(total),
        page: paging.page,
        per_page: paging.per_page,
    }))
}

/// GET /api/analysis/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<AnalysisEnvelope>> {
    let analysis = load_owned_analysis(&state, &auth.identity, id).await?;

    let latest_image = AnalysisImageRepo::backfill_detection(
        &state.pool,
        id,
        &demo_output(analysis.latitude, analysis.longitude),
    )
    .await?;

    Ok(Json(AnalysisEnvelope {
        message: None,
        analysis: AnalysisDetail {
            analysis,
            latest_image,
        },
    }))
}

/// DELETE /api/analysis/{id}
///
/// Artifact files go first (best effort), then the row; images cascade.
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    load_owned_analysis(&state, &auth.identity, id).await?;

    let paths = AnalysisRepo::artifact_paths(&state.pool, id).await?;
    remove_artifacts(&paths).await;

    if !AnalysisRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Analysis",
            id,
        }));
    }

    tracing::info!(analysis_id = id, user_id = auth.identity.id, "Analysis deleted");
    Ok(Json(MessageResponse::new("Analysis deleted successfully")))
}

/// GET /api/analysis/{id}/geojson
///
/// Returns the stored geometry verbatim; generates and stores demo
/// geometry only when none exists yet.
pub async fn geojson(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let analysis = load_owned_analysis(&state, &auth.identity, id).await?;

    let image = AnalysisImageRepo::backfill_geometry(
        &state.pool,
        id,
        &demo_output(analysis.latitude, analysis.longitude),
    )
    .await?;

    image
        .and_then(|i| i.geojson_data)
        .map(Json)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Analysis",
            id,
        }))
}

/// GET /api/analysis/{id}/images
pub async fn list_images(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ImageList>> {
    load_owned_analysis(&state, &auth.identity, id).await?;
    let images = AnalysisImageRepo::list_by_analysis(&state.pool, id).await?;
    Ok(Json(ImageList { images }))
}

/// POST /api/analysis/{id}/images
pub async fn add_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<AddImageRequest>,
) -> AppResult<(StatusCode, Json<ImageEnvelope>)> {
    load_owned_analysis(&state, &auth.identity, id).await?;

    let image_date = input
        .image_date
        .as_deref()
        .map(parse_image_date)
        .transpose()?;

    if let Some(source) = input.source_type.as_deref() {
        if !VALID_SOURCE_TYPES.contains(&source) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "source_type must be one of: {}",
                VALID_SOURCE_TYPES.join(", ")
            ))));
        }
    }

    let image = AnalysisImageRepo::create(
        &state.pool,
        &CreateAnalysisImage {
            analysis_id: id,
            image_date,
            source_type: input.source_type,
            ..CreateAnalysisImage::default()
        },
    )
    .await?;

    tracing::info!(analysis_id = id, image_id = image.id, "Image added");

    Ok((
        StatusCode::CREATED,
        Json(ImageEnvelope {
            message: Some("Image added successfully"),
            image,
        }),
    ))
}

/// GET /api/analysis/{id}/images/{image_id}
///
/// 404 when the image belongs to a different analysis.
pub async fn get_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ImageEnvelope>> {
    load_owned_analysis(&state, &auth.identity, id).await?;

    let image = AnalysisImageRepo::find_in_analysis(&state.pool, id, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "AnalysisImage",
            id: image_id,
        }))?;

    Ok(Json(ImageEnvelope {
        message: None,
        image,
    }))
}
