//! HTTP-level tests for report download and preview.

mod common;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use common::{
    body_bytes, body_json, build_test_app, create_analysis, create_user, get_auth, post_form_auth,
    post_json_auth,
};
use serde_json::json;
use sqlx::PgPool;
use satscan_core::report::PPTX_CONTENT_TYPE;
use satscan_db::repositories::AnalysisImageRepo;

#[sqlx::test(migrations = "../../db/migrations")]
async fn unprocessed_analysis_has_no_report(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 1.0, 1.0).await;

    // Backfilled demo data does not count as a processed image.
    get_auth(&app, &format!("/api/analysis/{id}"), &token).await;

    let response = get_auth(&app, &format!("/api/reports/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn processed_analysis_downloads_report(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "North Field", 12.97, 77.59).await;
    post_form_auth(&app, "/api/process/recent", &format!("analysis_id={id}"), &token).await;

    let response = get_auth(&app, &format!("/api/reports/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], PPTX_CONTENT_TYPE);
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"Satellite_Analysis_Report_North_Field.pptx\""
    );

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("Satellite Image Analysis: North Field"));
    assert!(body.contains("Aircraft: 3"));

    let latest = AnalysisImageRepo::find_latest(&app.pool, id).await.unwrap().unwrap();
    let ppt_path = latest.ppt_path.expect("report path recorded");
    assert!(ppt_path.starts_with(app.reports_dir().to_str().unwrap()));
    assert!(std::path::Path::new(&ppt_path).exists());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn report_access_is_owner_or_admin(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, owner) = create_user(&app, "owner", false).await;
    let (_, stranger) = create_user(&app, "stranger", false).await;
    let id = create_analysis(&app, &owner, "Test", 1.0, 1.0).await;

    for uri in [format!("/api/reports/{id}"), format!("/api/reports/{id}/preview")] {
        assert_eq!(get_auth(&app, &uri, &stranger).await.status(), StatusCode::FORBIDDEN);
    }
    assert_eq!(
        get_auth(&app, "/api/reports/999999/preview", &owner).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn preview_summarises_latest_image(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Harbour", 12.5, 45.25).await;

    let before = body_json(get_auth(&app, &format!("/api/reports/{id}/preview"), &token).await).await;
    assert_eq!(before["preview"]["title"], "Satellite Image Analysis: Harbour");
    assert_eq!(before["preview"]["coordinates"], "Coordinates: 12.5, 45.25");
    assert_eq!(before["preview"]["date"], "Unknown");
    assert_eq!(before["preview"]["summary"]["aircraft_count"], 0);

    post_form_auth(&app, "/api/process/recent", &format!("analysis_id={id}"), &token).await;

    let after = body_json(get_auth(&app, &format!("/api/reports/{id}/preview"), &token).await).await;
    assert_eq!(after["preview"]["summary"]["runway_detected"], true);
    assert_eq!(after["preview"]["summary"]["aircraft_count"], 3);
    assert_ne!(after["preview"]["date"], "Unknown");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn report_uses_newest_image_with_a_file(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 12.97, 77.59).await;

    let processed = post_form_auth(&app, "/api/process/recent", &format!("analysis_id={id}"), &token).await;
    let processed_id = body_json(processed).await["image"]["id"].as_i64().unwrap();

    post_json_auth(
        &app,
        &format!("/api/analysis/{id}/images"),
        json!({ "image_date": "2999-01-01" }),
        &token,
    )
    .await;

    let response = get_auth(&app, &format!("/api/reports/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("Aircraft: 3"));

    let images = AnalysisImageRepo::list_by_analysis(&app.pool, id).await.unwrap();
    for image in images {
        assert_eq!(image.ppt_path.is_some(), image.id == processed_id, "image {}", image.id);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn report_needs_a_file_still_on_disk(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 1.0, 1.0).await;

    let processed = post_form_auth(&app, "/api/process/recent", &format!("analysis_id={id}"), &token).await;
    let path = body_json(processed).await["image"]["image_path"]
        .as_str()
        .unwrap()
        .to_string();
    std::fs::remove_file(&path).unwrap();

    let response = get_auth(&app, &format!("/api/reports/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
