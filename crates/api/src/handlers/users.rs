//! Handlers for the `/users` resource and per-user settings.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use satscan_core::access::ensure_self_or_admin;
use satscan_core::error::CoreError;
use satscan_core::types::DbId;
use satscan_core::validation::{validate_email, validate_password_strength};
use satscan_db::models::settings::{AnalysisSettings, UpdateSettings};
use satscan_db::models::user::{UpdateUser, UserResponse};
use satscan_db::repositories::{AnalysisRepo, SettingsRepo, UserRepo};

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::auth::UserEnvelope;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::MessageResponse;
use crate::state::AppState;
use crate::storage::remove_artifacts;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserResponse>,
}

/// Request body for `PUT /users/{id}`. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct SettingsEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub settings: AnalysisSettings,
}

fn user_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "User", id })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/users
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<UserList>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(UserList {
        users: users.iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/users/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserEnvelope>> {
    ensure_self_or_admin(&auth.identity, id)?;
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from(&user),
    }))
}

/// PUT /api/users/{id}
///
/// Only administrators may change `is_admin`. A new email must be free
/// (the user's own current address is fine).
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdateUserRequest>,
) -> AppResult<Json<UpdateUserResponse>> {
    ensure_self_or_admin(&auth.identity, id)?;
    if input.is_admin.is_some() && !auth.identity.is_admin {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only administrators can change admin status".into(),
        )));
    }

    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    let email = match input.email.as_deref().map(str::trim) {
        Some(email) => {
            validate_email(email)?;
            if let Some(other) = UserRepo::find_by_email(&state.pool, email).await? {
                if other.id != id {
                    return Err(AppError::Core(CoreError::Conflict(
                        "Email already registered".into(),
                    )));
                }
            }
            Some(email.to_string())
        }
        None => None,
    };

    let password_hash = match input.password.as_deref() {
        Some(password) => {
            validate_password_strength(password)?;
            Some(
                hash_password(password)
                    .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?,
            )
        }
        None => None,
    };

    let user = UserRepo::update(
        &state.pool,
        id,
        &UpdateUser {
            email,
            password_hash,
            is_admin: input.is_admin,
        },
    )
    .await?
    .ok_or_else(|| user_not_found(id))?;

    tracing::info!(user_id = id, updated_by = auth.identity.id, "User updated");

    Ok(Json(UpdateUserResponse {
        message: "User updated successfully",
        user: UserResponse::from(&user),
    }))
}

/// DELETE /api/users/{id}
///
/// Removes the files of every analysis the user owns, then the user row;
/// settings, analyses and images cascade.
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    let paths = AnalysisRepo::artifact_paths_for_user(&state.pool, id).await?;
    remove_artifacts(&paths).await;

    if !UserRepo::delete(&state.pool, id).await? {
        return Err(user_not_found(id));
    }

    tracing::info!(user_id = id, deleted_by = admin.identity.id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// GET /api/users/{id}/settings
pub async fn get_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<SettingsEnvelope>> {
    ensure_self_or_admin(&auth.identity, id)?;
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    let settings = SettingsRepo::get_or_create(&state.pool, id).await?;
    Ok(Json(SettingsEnvelope {
        message: None,
        settings,
    }))
}

/// PUT /api/users/{id}/settings
pub async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdateSettings>,
) -> AppResult<Json<SettingsEnvelope>> {
    ensure_self_or_admin(&auth.identity, id)?;
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    let settings = SettingsRepo::upsert(&state.pool, id, &input).await?;
    tracing::info!(user_id = id, "Settings updated");

    Ok(Json(SettingsEnvelope {
        message: Some("Settings updated successfully"),
        settings,
    }))
}
