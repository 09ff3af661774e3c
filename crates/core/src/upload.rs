//! Rules for accepting uploaded image files.

use crate::types::DbId;

/// Extensions accepted by the upload endpoint (lower-case, no dot).
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

/// The lower-cased extension of `filename` if it is an accepted image type.
pub fn image_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    ALLOWED_IMAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Directory parts are dropped, whitespace becomes `_`, and anything other
/// than ASCII alphanumerics, `.`, `-` and `_` is removed. Leading dots are
/// stripped so the result can never be hidden or relative.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Name under which an uploaded file is stored for an analysis.
pub fn stored_image_name(analysis_id: DbId, filename: &str) -> String {
    format!("analysis_{analysis_id}_{}", sanitize_filename(filename))
}
