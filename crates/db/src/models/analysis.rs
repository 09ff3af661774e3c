//! Analysis entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use satscan_core::types::{DbId, Timestamp};

/// A row from the `analyses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Analysis {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new analysis. Coordinates must already be validated.
#[derive(Debug, Deserialize)]
pub struct CreateAnalysis {
    pub user_id: DbId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Filters for listing analyses.
#[derive(Debug, Default)]
pub struct AnalysisFilter<'a> {
    /// Restrict to analyses owned by this user; `None` lists everyone's.
    pub owner_id: Option<DbId>,
    /// Case-insensitive substring match on `name`.
    pub search: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}
