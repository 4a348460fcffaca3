//! Staff assistant endpoints
//!
//! Everything here costs a model call, so the routes sit behind the
//! session middleware and reject non-staff roles. Validation messages
//! are plain English; these are newsroom tools, not reader surfaces.

use axum::{extract::State, http::HeaderMap, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::session::{request_locale, require_staff, CurrentUser};
use crate::error::{ApiError, Result};
use crate::providers::{ChatTurn, CompletionRequest};
use crate::services::{classifier, headlines, provider_error, smart_links};
use crate::AppState;

const CHAT_SYSTEM_PROMPT: &str =
    "You are the newsroom assistant for Nashir, a bilingual Arabic/English news \
     platform. You help editors and authors with drafting, fact-structure, tone \
     and translation questions. Answer in the language the user writes in. Be \
     concise and concrete; never invent facts or sources.";

/// Older turns beyond this are dropped before the provider call
const CHAT_MAX_TURNS: usize = 20;

// ========================================
// Assistant Chat
// ========================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
}

/// POST /api/ai/chat - multi-turn assistant chat (staff)
pub async fn chat(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if request.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }
    for turn in &request.messages {
        if turn.role != "user" && turn.role != "assistant" {
            return Err(ApiError::BadRequest(format!("invalid role: {}", turn.role)));
        }
        if turn.content.trim().is_empty() {
            return Err(ApiError::BadRequest("message content must not be empty".to_string()));
        }
    }
    if request.messages.last().map(|turn| turn.role.as_str()) != Some("user") {
        return Err(ApiError::BadRequest("last message must be from the user".to_string()));
    }

    let mut messages = request.messages;
    if messages.len() > CHAT_MAX_TURNS {
        messages.drain(..messages.len() - CHAT_MAX_TURNS);
    }

    let client = state.acquire_llm(locale).await?;
    let reply = client
        .complete(&CompletionRequest {
            system: CHAT_SYSTEM_PROMPT.to_string(),
            messages,
        })
        .await
        .map_err(|e| provider_error(e, locale))?;

    Ok(Json(json!({ "reply": reply })))
}

// ========================================
// Classification
// ========================================

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub body: String,
}

/// POST /api/ai/classify - suggest sections for a draft (staff)
pub async fn classify(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<classifier::Classification>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if request.title.trim().is_empty() || request.body.trim().is_empty() {
        return Err(ApiError::BadRequest("title and body are required".to_string()));
    }

    let client = state.acquire_llm(locale).await?;
    let classification = classifier::classify(
        &state.db,
        &client,
        locale,
        &request.title,
        &request.summary,
        &request.body,
    )
    .await?;
    Ok(Json(classification))
}

// ========================================
// Headlines
// ========================================

#[derive(Debug, Deserialize)]
pub struct HeadlinesRequest {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub body: String,
    pub count: Option<i64>,
}

/// POST /api/ai/headlines - alternative headlines for a draft (staff)
pub async fn generate_headlines(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(request): Json<HeadlinesRequest>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if request.title.trim().is_empty() || request.body.trim().is_empty() {
        return Err(ApiError::BadRequest("title and body are required".to_string()));
    }

    let client = state.acquire_llm(locale).await?;
    let generated = headlines::generate(
        &client,
        locale,
        &request.title,
        &request.summary,
        &request.body,
        request.count,
    )
    .await?;
    Ok(Json(json!({ "headlines": generated })))
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub context: String,
}

/// POST /api/ai/headlines/compare - judge an A/B headline pair (staff)
pub async fn compare_headlines(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(request): Json<CompareRequest>,
) -> Result<Json<headlines::Comparison>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if request.a.trim().is_empty() || request.b.trim().is_empty() {
        return Err(ApiError::BadRequest("both candidates are required".to_string()));
    }

    let client = state.acquire_llm(locale).await?;
    let comparison =
        headlines::compare(&client, locale, &request.a, &request.b, &request.context).await?;
    Ok(Json(comparison))
}

// ========================================
// Smart Links
// ========================================

#[derive(Debug, Deserialize)]
pub struct SmartLinksRequest {
    pub body: String,
}

/// POST /api/ai/smart-links - dictionary link suggestions (staff)
pub async fn smart_links(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(request): Json<SmartLinksRequest>,
) -> Result<Json<smart_links::SmartLinkReport>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if request.body.trim().is_empty() {
        return Err(ApiError::BadRequest("body must not be empty".to_string()));
    }

    let client = state.acquire_llm(locale).await?;
    let report = smart_links::analyze(&state.db, &client, locale, &request.body).await?;
    Ok(Json(report))
}
