#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use satscan_api::auth::jwt::{generate_access_token, JwtConfig};
use satscan_api::auth::password::hash_password;
use satscan_api::config::ServerConfig;
use satscan_api::router::build_app_router;
use satscan_api::state::AppState;
use satscan_core::detection::{Detector, FixedDetector};
use satscan_core::imagery::SyntheticImagery;
use satscan_db::models::user::{CreateUser, User};
use satscan_db::repositories::UserRepo;

/// Password given to every fixture user. Satisfies the strength rules.
pub const TEST_PASSWORD: &str = "Secret123";

/// A router wired to a test database plus throwaway artifact directories.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    _storage: TempDir,
}

impl TestApp {
    pub fn upload_dir(&self) -> &PathBuf {
        &self.config.upload_dir
    }

    pub fn reports_dir(&self) -> &PathBuf {
        &self.config.reports_dir
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should not fail")
    }
}

/// Build a test `ServerConfig` rooted in `storage`.
pub fn test_config(storage: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_secs: 3600,
        },
        upload_dir: storage.path().join("uploads"),
        reports_dir: storage.path().join("reports"),
        max_upload_bytes: 1024 * 1024,
        bootstrap_admin: None,
    }
}

/// Full application with the deterministic [`FixedDetector`].
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, Arc::new(FixedDetector::default()))
}

/// Full application with a caller-chosen detector.
pub fn build_test_app_with(pool: PgPool, detector: Arc<dyn Detector>) -> TestApp {
    let storage = tempfile::tempdir().expect("tempdir");
    let config = Arc::new(test_config(&storage));

    let state = AppState {
        pool: pool.clone(),
        config: Arc::clone(&config),
        detector,
        imagery: Arc::new(SyntheticImagery { size: 64 }),
    };

    TestApp {
        router: build_app_router(state, &config),
        pool,
        config,
        _storage: storage,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user (with default settings) directly and mint a token for them.
pub async fn create_user(app: &TestApp, username: &str, is_admin: bool) -> (User, String) {
    let user = UserRepo::create_with_settings(
        &app.pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
            is_admin,
        },
    )
    .await
    .expect("user creation should succeed");

    let token = generate_access_token(&user.identity(), &app.config.jwt)
        .expect("token generation should succeed");
    (user, token)
}

/// Create an analysis through the API and return its id.
pub async fn create_analysis(app: &TestApp, token: &str, name: &str, lat: f64, lon: f64) -> i64 {
    let body = serde_json::json!({ "name": name, "latitude": lat, "longitude": lon });
    let response = post_json_auth(app, "/api/analysis", body, token).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["analysis"]["id"]
        .as_i64()
        .expect("analysis id")
}

/// A small valid PNG.
pub fn png_bytes() -> Vec<u8> {
    use satscan_core::imagery::ImageSource;
    SyntheticImagery { size: 32 }
        .fetch(10.0, 10.0)
        .expect("render")
        .bytes
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
}

fn json_request(method: Method, uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    builder(method, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    app.send(builder(Method::GET, uri, None).body(Body::empty()).unwrap())
        .await
}

pub async fn get_auth(app: &TestApp, uri: &str, token: &str) -> Response {
    app.send(builder(Method::GET, uri, Some(token)).body(Body::empty()).unwrap())
        .await
}

pub async fn delete_auth(app: &TestApp, uri: &str, token: &str) -> Response {
    app.send(builder(Method::DELETE, uri, Some(token)).body(Body::empty()).unwrap())
        .await
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response {
    app.send(json_request(Method::POST, uri, body, None)).await
}

pub async fn post_json_auth(app: &TestApp, uri: &str, body: serde_json::Value, token: &str) -> Response {
    app.send(json_request(Method::POST, uri, body, Some(token))).await
}

pub async fn put_json_auth(app: &TestApp, uri: &str, body: serde_json::Value, token: &str) -> Response {
    app.send(json_request(Method::PUT, uri, body, Some(token))).await
}

/// POST an `application/x-www-form-urlencoded` body.
pub async fn post_form_auth(app: &TestApp, uri: &str, form: &str, token: &str) -> Response {
    let request = builder(Method::POST, uri, Some(token))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    app.send(request).await
}

/// One part of a multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        data: &'a [u8],
    },
}

const BOUNDARY: &str = "satscan-test-boundary";

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart_auth(app: &TestApp, uri: &str, parts: &[Part<'_>], token: &str) -> Response {
    let request = builder(Method::POST, uri, Some(token))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.send(request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}
