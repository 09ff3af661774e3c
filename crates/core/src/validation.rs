//! Input validation shared by the HTTP handlers.
//!
//! Every validator returns `CoreError::Validation` with a message that is
//! safe to show to the caller.

use chrono::{NaiveDate, TimeZone, Utc};
use validator::ValidateEmail;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length of an analysis name.
pub const MAX_ANALYSIS_NAME_LENGTH: usize = 100;

/// Validate a latitude/longitude pair.
///
/// Bounds are inclusive: latitude in `[-90, 90]`, longitude in `[-180, 180]`.
/// Non-finite values are rejected.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), CoreError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(CoreError::Validation(format!(
            "latitude must be between -90 and 90, got {latitude}"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(CoreError::Validation(format!(
            "longitude must be between -180 and 180, got {longitude}"
        )));
    }
    Ok(())
}

/// Validate the shape of an email address.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(CoreError::Validation("Invalid email format".into()))
    }
}

/// Validate password strength: at least [`MIN_PASSWORD_LENGTH`] characters,
/// one uppercase letter, one lowercase letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), CoreError> {
    let mut missing = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        missing.push(format!("at least {MIN_PASSWORD_LENGTH} characters"));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        missing.push("an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        missing.push("a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Password not strong enough: needs {}",
            missing.join(", ")
        )))
    }
}

/// Validate an analysis name: non-blank and at most [`MAX_ANALYSIS_NAME_LENGTH`] characters.
pub fn validate_analysis_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("name must not be empty".into()));
    }
    if name.chars().count() > MAX_ANALYSIS_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "name must be at most {MAX_ANALYSIS_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date into a UTC midnight timestamp.
pub fn parse_image_date(value: &str) -> Result<Timestamp, CoreError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        CoreError::Validation(format!("Invalid image_date '{value}'. Expected YYYY-MM-DD"))
    })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CoreError::Validation(format!("Invalid image_date '{value}'")))?;
    Ok(Utc.from_utc_datetime(&midnight))
}
