//! Wire types for the captioning API.

use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

/// Success body for `POST /caption-image/`.
///
/// `caption` is the raw English caption as generated; the tag fields are
/// flat comma-joined strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionResponse {
    pub caption: String,
    pub caption_fr: String,
    pub tags_en: String,
    pub tags_fr: String,
}

/// Failure body: every pipeline error surfaces as `{"error": <message>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn make_error(status: StatusCode, msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
}
