//! HTTP-level tests for user management and per-user settings.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_analysis, create_user, delete_auth, get_auth, post_json,
    put_json_auth, TEST_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;
use satscan_db::repositories::{AnalysisRepo, UserRepo};

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_admins_list_users(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, admin_token) = create_user(&app, "admin", true).await;
    let (_, user_token) = create_user(&app, "pilot", false).await;

    let response = get_auth(&app, "/api/users", &admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["users"].as_array().unwrap().len(), 2);

    assert_eq!(
        get_auth(&app, "/api/users", &user_token).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn users_see_themselves_but_not_others(pool: PgPool) {
    let app = build_test_app(pool);
    let (alice, alice_token) = create_user(&app, "alice", false).await;
    let (bob, _) = create_user(&app, "bob", false).await;
    let (_, admin_token) = create_user(&app, "admin", true).await;

    let own = get_auth(&app, &format!("/api/users/{}", alice.id), &alice_token).await;
    assert_eq!(own.status(), StatusCode::OK);

    let other = get_auth(&app, &format!("/api/users/{}", bob.id), &alice_token).await;
    assert_eq!(other.status(), StatusCode::FORBIDDEN);

    let by_admin = get_auth(&app, &format!("/api/users/{}", bob.id), &admin_token).await;
    assert_eq!(by_admin.status(), StatusCode::OK);

    let missing = get_auth(&app, "/api/users/999999", &admin_token).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn self_update_changes_email_and_password(pool: PgPool) {
    let app = build_test_app(pool);
    let (alice, token) = create_user(&app, "alice", false).await;

    let response = put_json_auth(
        &app,
        &format!("/api/users/{}", alice.id),
        json!({ "email": "alice@new.example.com", "password": "NewPass99" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"]["email"], "alice@new.example.com");

    let old = post_json(
        &app,
        "/api/auth/login",
        json!({ "username": "alice", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = post_json(
        &app,
        "/api/auth/login",
        json!({ "username": "alice", "password": "NewPass99" }),
    )
    .await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn keeping_own_email_is_not_a_conflict(pool: PgPool) {
    let app = build_test_app(pool);
    let (alice, token) = create_user(&app, "alice", false).await;
    create_user(&app, "bob", false).await;

    let same = put_json_auth(
        &app,
        &format!("/api/users/{}", alice.id),
        json!({ "email": "alice@example.com" }),
        &token,
    )
    .await;
    assert_eq!(same.status(), StatusCode::OK);

    let taken = put_json_auth(
        &app,
        &format!("/api/users/{}", alice.id),
        json!({ "email": "bob@example.com" }),
        &token,
    )
    .await;
    assert_eq!(taken.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_admins_change_admin_flag(pool: PgPool) {
    let app = build_test_app(pool);
    let (alice, alice_token) = create_user(&app, "alice", false).await;
    let (_, admin_token) = create_user(&app, "admin", true).await;
    let uri = format!("/api/users/{}", alice.id);

    let escalate = put_json_auth(&app, &uri, json!({ "is_admin": true }), &alice_token).await;
    assert_eq!(escalate.status(), StatusCode::FORBIDDEN);

    let promote = put_json_auth(&app, &uri, json!({ "is_admin": true }), &admin_token).await;
    assert_eq!(promote.status(), StatusCode::OK);
    assert_eq!(body_json(promote).await["user"]["is_admin"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_rejects_weak_password(pool: PgPool) {
    let app = build_test_app(pool);
    let (alice, token) = create_user(&app, "alice", false).await;

    let response = put_json_auth(
        &app,
        &format!("/api/users/{}", alice.id),
        json!({ "password": "short" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_delete_cascades_and_removes_files(pool: PgPool) {
    let app = build_test_app(pool);
    let (alice, alice_token) = create_user(&app, "alice", false).await;
    let (_, admin_token) = create_user(&app, "admin", true).await;
    let analysis_id = create_analysis(&app, &alice_token, "Field", 10.0, 20.0).await;

    let processed = common::post_form_auth(
        &app,
        "/api/process/recent",
        &format!("analysis_id={analysis_id}"),
        &alice_token,
    )
    .await;
    assert_eq!(processed.status(), StatusCode::OK);
    let paths = AnalysisRepo::artifact_paths_for_user(&app.pool, alice.id).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert!(std::path::Path::new(&paths[0]).exists());

    let forbidden = delete_auth(&app, &format!("/api/users/{}", alice.id), &alice_token).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(&app, &format!("/api/users/{}", alice.id), &admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(UserRepo::find_by_id(&app.pool, alice.id).await.unwrap().is_none());
    assert!(AnalysisRepo::find_by_id(&app.pool, analysis_id).await.unwrap().is_none());
    assert!(!std::path::Path::new(&paths[0]).exists());

    let again = delete_auth(&app, &format!("/api/users/{}", alice.id), &admin_token).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn settings_read_and_partial_update(pool: PgPool) {
    let app = build_test_app(pool);
    let (alice, token) = create_user(&app, "alice", false).await;
    let (bob, _) = create_user(&app, "bob", false).await;
    let uri = format!("/api/users/{}/settings", alice.id);

    let read = get_auth(&app, &uri, &token).await;
    assert_eq!(read.status(), StatusCode::OK);
    let json = body_json(read).await;
    assert_eq!(json["settings"]["detect_houses"], true);

    let update = put_json_auth(&app, &uri, json!({ "detect_houses": false }), &token).await;
    assert_eq!(update.status(), StatusCode::OK);
    let json = body_json(update).await;
    assert_eq!(json["message"], "Settings updated successfully");
    assert_eq!(json["settings"]["detect_houses"], false);
    assert_eq!(json["settings"]["detect_roads"], true);

    let other = get_auth(&app, &format!("/api/users/{}/settings", bob.id), &token).await;
    assert_eq!(other.status(), StatusCode::FORBIDDEN);
}
