//! Placeholder report rendering.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// MIME type the report download is served with.
pub const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Analysis has not been processed yet")]
    NotProcessed,
}

impl From<ReportError> for CoreError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::NotProcessed => CoreError::Validation(
                "Analysis has no processed image. Process an image before generating a report"
                    .into(),
            ),
        }
    }
}

/// Detection counts shown on a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub runway_detected: bool,
    pub aircraft_count: i32,
    pub house_count: i32,
    pub road_count: i32,
    pub water_body_count: i32,
}

/// What the preview endpoint returns and the report file contains.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPreview {
    pub title: String,
    pub coordinates: String,
    pub date: String,
    pub summary: ReportSummary,
}

impl ReportPreview {
    pub fn new(
        analysis_name: &str,
        latitude: f64,
        longitude: f64,
        image_date: Option<Timestamp>,
        summary: ReportSummary,
    ) -> Self {
        Self {
            title: format!("Satellite Image Analysis: {analysis_name}"),
            coordinates: format!("Coordinates: {latitude}, {longitude}"),
            date: image_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            summary,
        }
    }
}

/// Plain-text body written to the report file.
pub fn render_report(preview: &ReportPreview) -> String {
    let s = &preview.summary;
    let runway = if s.runway_detected { "Yes" } else { "No" };
    format!(
        "{title}\n{coordinates}\nImage date: {date}\n\n\
         Detection summary\n\
         Runway detected: {runway}\n\
         Aircraft: {aircraft}\n\
         Houses: {houses}\n\
         Roads: {roads}\n\
         Water bodies: {water}\n",
        title = preview.title,
        coordinates = preview.coordinates,
        date = preview.date,
        aircraft = s.aircraft_count,
        houses = s.house_count,
        roads = s.road_count,
        water = s.water_body_count,
    )
}

/// File name of the stored report for an analysis.
pub fn report_file_name(analysis_id: DbId) -> String {
    format!("report_{analysis_id}.pptx")
}

/// Suggested download file name. Characters unsafe in a header value
/// become `_`.
pub fn download_name(analysis_name: &str) -> String {
    let safe: String = analysis_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("Satellite_Analysis_Report_{safe}.pptx")
}
