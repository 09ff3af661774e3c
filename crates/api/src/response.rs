//! Response envelopes shared by several handlers.

use serde::Serialize;
use satscan_db::models::analysis::Analysis;
use satscan_db::models::analysis_image::AnalysisImage;

/// `{ "message": "..." }` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An analysis together with its current latest image.
#[derive(Debug, Serialize)]
pub struct AnalysisDetail {
    #[serde(flatten)]
    pub analysis: Analysis,
    pub latest_image: Option<AnalysisImage>,
}

/// `{ "analysis": {...} }`
#[derive(Debug, Serialize)]
pub struct AnalysisEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub analysis: AnalysisDetail,
}
