//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use tokio::sync::oneshot;
use tracing::info;

use legende_core::text::{derive_tags, join_tags};
use legende_core::translate::{Translation, TRANSLATION_FAILED};
use legende_core::utils::image_utils;

use crate::api::{make_error, CaptionResponse, ErrorResponse};
use crate::engine::EngineRequest;
use crate::AppState;

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// `POST /caption-image/`
///
/// Multipart image upload in; `{caption, caption_fr, tags_en, tags_fr}`
/// out. Upload, decode, and captioning failures all collapse to a 500 with
/// an `{"error": ...}` body; translation failures never do — they degrade
/// to a sentinel caption instead.
pub async fn caption_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<CaptionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let bytes = read_upload(multipart).await.map_err(|e| internal(&e))?;

    let image = image_utils::decode_image(&bytes).map_err(|e| internal(&format!("{:#}", e)))?;

    let caption = {
        let (tx, rx) = oneshot::channel();
        state
            .engine
            .send(EngineRequest::Caption { image, tx })
            .map_err(|_| internal("Inference engine is not running"))?;
        rx.await
            .map_err(|_| internal("Caption request dropped"))?
            .map_err(|e| internal(&e))?
    };

    let caption_fr = {
        let (tx, rx) = oneshot::channel();
        let translation = match state.engine.send(EngineRequest::Translate {
            text: caption.clone(),
            tx,
        }) {
            Ok(()) => rx
                .await
                .unwrap_or(Translation::Fallback(TRANSLATION_FAILED)),
            Err(_) => Translation::Fallback(TRANSLATION_FAILED),
        };
        translation.into_string()
    };
    info!("French translation: {}", caption_fr);

    let tags_en = join_tags(&derive_tags(&caption));
    let tags_fr = join_tags(&derive_tags(&caption_fr));

    info!("Caption request served: {:?} / {:?}", caption, caption_fr);

    Ok(Json(CaptionResponse {
        caption,
        caption_fr,
        tags_en,
        tags_fr,
    }))
}

/// Pull the uploaded file out of the multipart body.
///
/// A field named `file` wins regardless of position (that is what the
/// legacy clients send, possibly after other form fields). Failing that,
/// the first field carrying a filename, then the first non-empty field.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, String> {
    let mut with_filename: Option<Vec<u8>> = None;
    let mut first_non_empty: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed multipart upload: {}", e))?
    {
        let is_named_file = field.name() == Some("file");
        let has_filename = field.file_name().is_some();
        let data = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read upload: {}", e))?;

        if is_named_file {
            return Ok(data.to_vec());
        }
        if has_filename {
            with_filename.get_or_insert_with(|| data.to_vec());
        } else if !data.is_empty() {
            first_non_empty.get_or_insert_with(|| data.to_vec());
        }
    }

    with_filename
        .or(first_non_empty)
        .ok_or_else(|| "No file in upload".to_string())
}

fn internal(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    make_error(StatusCode::INTERNAL_SERVER_ERROR, msg)
}
