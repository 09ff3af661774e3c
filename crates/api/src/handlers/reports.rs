//! Handlers for `/reports`: downloadable report and its JSON preview.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use satscan_core::error::CoreError;
use satscan_core::report::{
    download_name, render_report, report_file_name, ReportError, ReportPreview, ReportSummary,
    PPTX_CONTENT_TYPE,
};
use satscan_core::types::DbId;
use satscan_db::models::analysis::Analysis;
use satscan_db::models::analysis_image::AnalysisImage;
use satscan_db::repositories::AnalysisImageRepo;

use crate::error::AppResult;
use crate::handlers::load_owned_analysis;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::storage::{artifact_exists, save_artifact};

#[derive(Debug, Serialize)]
pub struct PreviewEnvelope {
    pub preview: ReportPreview,
}

fn build_preview(analysis: &Analysis, latest: Option<&AnalysisImage>) -> ReportPreview {
    let summary = match latest {
        Some(image) => ReportSummary {
            runway_detected: image.runway_detected,
            aircraft_count: image.aircraft_count,
            house_count: image.house_count,
            road_count: image.road_count,
            water_body_count: image.water_body_count,
        },
        None => ReportSummary {
            runway_detected: false,
            aircraft_count: 0,
            house_count: 0,
            road_count: 0,
            water_body_count: 0,
        },
    };
    ReportPreview::new(
        &analysis.name,
        analysis.latitude,
        analysis.longitude,
        latest.and_then(|i| i.image_date),
        summary,
    )
}

/// GET /api/reports/{id}
///
/// Built from the newest image whose file is still on disk; fails when no
/// image of the analysis has one. The report is regenerated on every call
/// and its path recorded on that image.
pub async fn download(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let analysis = load_owned_analysis(&state, &auth.identity, id).await?;

    let mut image = None;
    for candidate in AnalysisImageRepo::list_with_artifacts(&state.pool, id).await? {
        let on_disk = match candidate.image_path.as_deref() {
            Some(path) => artifact_exists(path).await,
            None => false,
        };
        if on_disk {
            image = Some(candidate);
            break;
        }
    }
    let image = image.ok_or(CoreError::from(ReportError::NotProcessed))?;

    let body = render_report(&build_preview(&analysis, Some(&image)));
    let path = save_artifact(&state.config.reports_dir, &report_file_name(id), body.as_bytes())
        .await?;
    AnalysisImageRepo::set_report_path(&state.pool, image.id, &path).await?;

    tracing::info!(analysis_id = id, path = %path, "Report generated");

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download_name(&analysis.name)
    );
    Ok((
        [
            (CONTENT_TYPE, PPTX_CONTENT_TYPE.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// GET /api/reports/{id}/preview
pub async fn preview(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<PreviewEnvelope>> {
    let analysis = load_owned_analysis(&state, &auth.identity, id).await?;
    let latest = AnalysisImageRepo::find_latest(&state.pool, id).await?;
    Ok(Json(PreviewEnvelope {
        preview: build_preview(&analysis, latest.as_ref()),
    }))
}
