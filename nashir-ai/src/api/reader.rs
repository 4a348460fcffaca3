//! Public reader endpoints
//!
//! These never call a model: recommendations, read-aloud chunking and
//! voice command matching are deterministic, so they stay available to
//! anonymous readers regardless of provider configuration.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::session::request_locale;
use crate::error::{ApiError, Result};
use crate::services::{read_aloud, recommender, voice};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    pub limit: Option<i64>,
}

/// GET /api/articles/:slug/ai-recommendations - related articles
pub async fn recommendations(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<RecommendationsQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    let cards = recommender::recommend(&state.db, locale, &slug, query.limit).await?;
    Ok(Json(json!({
        "total": cards.len(),
        "recommendations": cards,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ReadAloudRequest {
    pub text: Option<String>,
    pub slug: Option<String>,
}

/// POST /api/ai/read-aloud - chunk text for speech synthesis
///
/// Accepts raw text or a published article slug; with a slug the
/// narration covers title, summary and body in order.
pub async fn read_aloud(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReadAloudRequest>,
) -> Result<Json<read_aloud::ReadAloudPlan>> {
    let locale = request_locale(&headers);
    let text = match (&request.text, &request.slug) {
        (Some(text), _) if !text.trim().is_empty() => text.clone(),
        (_, Some(slug)) if !slug.trim().is_empty() => {
            read_aloud::article_text(&state.db, locale, slug.trim()).await?
        }
        _ => {
            return Err(ApiError::BadRequest(
                "text or slug is required".to_string(),
            ))
        }
    };
    let plan = read_aloud::plan(&state.db, &text).await?;
    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
pub struct VoiceCommandRequest {
    pub transcript: String,
}

/// POST /api/ai/voice-command - resolve a speech transcript
///
/// Unrecognized speech is a normal outcome, not an error.
pub async fn voice_command(Json(request): Json<VoiceCommandRequest>) -> Json<Value> {
    match voice::match_command(&request.transcript) {
        Some(matched) => Json(json!({
            "matched": true,
            "command": matched.command,
            "action": matched.action,
            "phrase": matched.phrase,
        })),
        None => Json(json!({ "matched": false })),
    }
}
