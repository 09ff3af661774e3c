//! First-run administrator.
//!
//! Registration is admin-only, so an empty deployment needs one account
//! created out of band. When configured, it is created at startup unless the
//! username already exists. An existing account is never modified.

use satscan_core::validation::{validate_email, validate_password_strength};
use satscan_db::models::user::CreateUser;
use satscan_db::repositories::UserRepo;
use satscan_db::DbPool;

use crate::auth::password::hash_password;
use crate::config::BootstrapAdmin;
use crate::error::{AppError, AppResult};

/// Create the configured admin if absent. Returns `true` if one was created.
pub async fn ensure_admin(pool: &DbPool, admin: &BootstrapAdmin) -> AppResult<bool> {
    if UserRepo::find_by_username(pool, &admin.username).await?.is_some() {
        tracing::debug!(username = %admin.username, "Bootstrap admin already exists");
        return Ok(false);
    }
    validate_email(&admin.email)?;
    validate_password_strength(&admin.password)?;

    let password_hash = hash_password(&admin.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?;

    let user = UserRepo::create_with_settings(
        pool,
        &CreateUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            is_admin: true,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
    Ok(true)
}
