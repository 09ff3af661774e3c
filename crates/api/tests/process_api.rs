//! HTTP-level tests for `/process`: recent imagery, uploads and temporal.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use chrono::Utc;
use common::{
    body_json, build_test_app, build_test_app_with, create_analysis, create_user, png_bytes,
    post_form_auth, post_json_auth, post_multipart_auth, put_json_auth, Part,
};
use serde_json::json;
use sqlx::PgPool;
use satscan_api::error::AppError;
use satscan_api::handlers::process::begin_processing_or_discard;
use satscan_api::storage::{artifact_exists, save_artifact};
use satscan_core::detection::SeededDetector;
use satscan_core::status::SOURCE_UPLOAD;
use satscan_db::repositories::AnalysisImageRepo;

// ---------------------------------------------------------------------------
// Recent
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn recent_fetches_detects_and_stores(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 12.97, 77.59).await;

    let response = post_form_auth(&app, "/api/process/recent", &format!("analysis_id={id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Image processed successfully");

    let image = &json["image"];
    assert_eq!(image["status"], "completed");
    assert_eq!(image["source_type"], "api");
    assert_eq!(image["runway_detected"], true);
    assert_eq!(image["aircraft_count"], 3);
    assert!(image["runway_length"].as_f64().unwrap() > image["runway_width"].as_f64().unwrap());
    assert_eq!(
        image["geojson_data"]["features"].as_array().unwrap().len(),
        1 + 3 + 2 + 3 + 1
    );

    let path = image["image_path"].as_str().unwrap();
    assert!(path.starts_with(app.upload_dir().to_str().unwrap()));
    assert!(std::path::Path::new(path).exists());

    // The pending placeholder was claimed rather than a second row added.
    let images = AnalysisImageRepo::list_by_analysis(&app.pool, id).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(json["analysis"]["latest_image"]["id"], image["id"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recent_honours_owner_settings(pool: PgPool) {
    let app = build_test_app(pool);
    let (user, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 12.97, 77.59).await;

    put_json_auth(
        &app,
        &format!("/api/users/{}/settings", user.id),
        json!({ "detect_aircraft": false, "detect_runways": false }),
        &token,
    )
    .await;

    let json = body_json(
        post_form_auth(&app, "/api/process/recent", &format!("analysis_id={id}"), &token).await,
    )
    .await;
    assert_eq!(json["image"]["aircraft_count"], 0);
    assert_eq!(json["image"]["runway_detected"], false);
    assert_eq!(json["image"]["house_count"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recent_checks_request_and_access(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, owner) = create_user(&app, "owner", false).await;
    let (_, stranger) = create_user(&app, "stranger", false).await;
    let id = create_analysis(&app, &owner, "Test", 1.0, 1.0).await;

    let missing = post_form_auth(&app, "/api/process/recent", "", &owner).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await["error"], "Analysis ID is required");

    let not_found = post_form_auth(&app, "/api/process/recent", "analysis_id=999999", &owner).await;
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

    let forbidden =
        post_form_auth(&app, "/api/process/recent", &format!("analysis_id={id}"), &stranger).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_stores_file_and_detection(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 12.97, 77.59).await;
    let png = png_bytes();
    let id_text = id.to_string();

    let response = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[
            Part::Text("analysis_id", &id_text),
            Part::Text("image_date", "2024-01-02"),
            Part::File {
                name: "file",
                file_name: "my scene.PNG",
                data: &png,
            },
        ],
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Image uploaded and processed successfully");

    let image = &json["image"];
    assert_eq!(image["source_type"], "upload");
    assert_eq!(image["status"], "completed");
    assert!(image["image_date"].as_str().unwrap().starts_with("2024-01-02"));

    let path = image["image_path"].as_str().unwrap();
    assert!(path.ends_with(&format!("analysis_{id}_my_scene.PNG")));
    assert_eq!(std::fs::read(path).unwrap(), png);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_rejects_bad_requests(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 1.0, 1.0).await;
    let id_text = id.to_string();
    let png = png_bytes();

    let no_file = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[Part::Text("analysis_id", &id_text)],
        &token,
    )
    .await;
    assert_eq!(no_file.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(no_file).await["error"], "No file part");

    let empty_name = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[
            Part::Text("analysis_id", &id_text),
            Part::File { name: "file", file_name: "", data: &png },
        ],
        &token,
    )
    .await;
    assert_eq!(empty_name.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(empty_name).await["error"], "No selected file");

    let no_id = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[Part::File { name: "file", file_name: "a.png", data: &png }],
        &token,
    )
    .await;
    assert_eq!(no_id.status(), StatusCode::BAD_REQUEST);

    let wrong_type = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[
            Part::Text("analysis_id", &id_text),
            Part::File { name: "file", file_name: "notes.txt", data: b"hello" },
        ],
        &token,
    )
    .await;
    assert_eq!(wrong_type.status(), StatusCode::BAD_REQUEST);

    let bad_date = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[
            Part::Text("analysis_id", &id_text),
            Part::Text("image_date", "yesterday"),
            Part::File { name: "file", file_name: "a.png", data: &png },
        ],
        &token,
    )
    .await;
    assert_eq!(bad_date.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_checks_access_before_type(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, owner) = create_user(&app, "owner", false).await;
    let (_, stranger) = create_user(&app, "stranger", false).await;
    let id = create_analysis(&app, &owner, "Test", 1.0, 1.0).await;
    let id_text = id.to_string();

    let response = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[
            Part::Text("analysis_id", &id_text),
            Part::File { name: "file", file_name: "notes.txt", data: b"hello" },
        ],
        &stranger,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unreadable_upload_marks_image_failed(pool: PgPool) {
    let app = build_test_app_with(pool, Arc::new(SeededDetector::default()));
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 1.0, 1.0).await;
    let id_text = id.to_string();

    let response = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[
            Part::Text("analysis_id", &id_text),
            Part::File { name: "file", file_name: "fake.png", data: b"not really a png" },
        ],
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let images = AnalysisImageRepo::list_by_analysis(&app.pool, id).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].status, "failed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn oversized_upload_is_413(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 1.0, 1.0).await;
    let id_text = id.to_string();
    let big = vec![0u8; app.config.max_upload_bytes + 1];

    let response = post_multipart_auth(
        &app,
        "/api/process/upload",
        &[
            Part::Text("analysis_id", &id_text),
            Part::File { name: "file", file_name: "big.png", data: &big },
        ],
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stored_file_is_discarded_when_processing_cannot_start(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let path = save_artifact(dir.path(), "analysis_1_scene.png", &png_bytes())
        .await
        .unwrap();
    pool.close().await;

    let result =
        begin_processing_or_discard(&pool, 1, SOURCE_UPLOAD, path.clone(), Utc::now()).await;
    assert_matches!(result, Err(AppError::Database(_)));
    assert!(!artifact_exists(&path).await);
}

// ---------------------------------------------------------------------------
// Temporal
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn temporal_is_not_implemented(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, token) = create_user(&app, "alice", false).await;
    let id = create_analysis(&app, &token, "Test", 1.0, 1.0).await;

    let response = post_json_auth(
        &app,
        "/api/process/temporal",
        json!({ "analysis_id": id, "start_date": "2024-01-01", "end_date": "2024-06-01" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_IMPLEMENTED");
    assert_eq!(json["error"], "Temporal analysis is not implemented yet");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn temporal_validates_before_answering(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, owner) = create_user(&app, "owner", false).await;
    let (_, stranger) = create_user(&app, "stranger", false).await;
    let id = create_analysis(&app, &owner, "Test", 1.0, 1.0).await;

    let missing = post_json_auth(&app, "/api/process/temporal", json!({ "analysis_id": id }), &owner).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let forbidden = post_json_auth(
        &app,
        "/api/process/temporal",
        json!({ "analysis_id": id, "start_date": "2024-01-01", "end_date": "2024-06-01" }),
        &stranger,
    )
    .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
}
