//! Request handlers.
//!
//! Each submodule serves one resource. Handlers check access with
//! `satscan_core::access`, delegate persistence to the `satscan_db`
//! repositories and map errors via [`AppError`](crate::error::AppError).

pub mod analysis;
pub mod auth;
pub mod process;
pub mod reports;
pub mod users;

use satscan_core::access::ensure_owner_or_admin;
use satscan_core::error::CoreError;
use satscan_core::identity::Identity;
use satscan_core::types::DbId;
use satscan_db::models::analysis::Analysis;
use satscan_db::repositories::AnalysisRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Load an analysis the caller may act on: 404 if absent, 403 if the caller
/// is neither its owner nor an administrator.
pub(crate) async fn load_owned_analysis(
    state: &AppState,
    identity: &Identity,
    id: DbId,
) -> AppResult<Analysis> {
    let analysis = AnalysisRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Analysis",
            id,
        }))?;
    ensure_owner_or_admin(identity, analysis.user_id)?;
    Ok(analysis)
}
