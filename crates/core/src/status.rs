//! Lifecycle status and provenance constants for analysis images.
//!
//! These must match the CHECK constraints in `20250101000004_create_analysis_images.sql`.

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

pub const SOURCE_UPLOAD: &str = "upload";
pub const SOURCE_API: &str = "api";
pub const SOURCE_HISTORICAL: &str = "historical";

/// Valid `source_type` values.
pub const VALID_SOURCE_TYPES: &[&str] = &[SOURCE_UPLOAD, SOURCE_API, SOURCE_HISTORICAL];
