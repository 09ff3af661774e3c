//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod analysis_image_repo;
pub mod analysis_repo;
pub mod settings_repo;
pub mod user_repo;

pub use analysis_image_repo::AnalysisImageRepo;
pub use analysis_repo::AnalysisRepo;
pub use settings_repo::SettingsRepo;
pub use user_repo::UserRepo;
