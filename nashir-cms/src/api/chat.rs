//! Newsroom chat
//!
//! Channel-based staff chat. Message pages are fetched newest-page
//! first, but each page is returned oldest-first so clients append in
//! render order. Posting emits ChatMessagePosted for live delivery
//! over the event stream.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::Utc;
use nashir_common::config::get_setting_i64;
use nashir_common::events::NashirEvent;
use nashir_common::locale::Message;
use nashir_common::pagination::calculate_pagination;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::session::{not_found, request_locale, require_admin, require_staff, CurrentUser};
use crate::error::{ApiError, Result};
use crate::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatChannel {
    pub guid: String,
    pub name: String,
    pub topic: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub guid: String,
    pub channel_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub sent_at: String,
}

#[derive(Debug, Serialize)]
pub struct MessagePageResponse {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub messages: Vec<ChatMessage>,
}

/// GET /api/chat/channels (staff)
pub async fn list_channels(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatChannel>>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let channels = sqlx::query_as::<_, ChatChannel>("SELECT * FROM chat_channels ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(channels))
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    pub topic: Option<String>,
}

/// POST /api/chat/channels (admin)
pub async fn create_channel(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateChannelRequest>,
) -> Result<Json<ChatChannel>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_channels WHERE name = ?")
        .bind(name)
        .fetch_one(&state.db)
        .await?;
    if taken > 0 {
        return Err(ApiError::Conflict(format!("channel already exists: {}", name)));
    }

    let guid = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO chat_channels (guid, name, topic) VALUES (?, ?, ?)")
        .bind(&guid)
        .bind(name)
        .bind(&req.topic)
        .execute(&state.db)
        .await?;

    let channel = sqlx::query_as::<_, ChatChannel>("SELECT * FROM chat_channels WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(channel))
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct MessagePageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

/// GET /api/chat/channels/:id/messages (staff)
///
/// Page 1 is the newest slice; messages inside a page run oldest-first.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<MessagePageQuery>,
) -> Result<Json<MessagePageResponse>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let channel_known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_channels WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    if channel_known == 0 {
        return Err(not_found(locale));
    }

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE channel_id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    let page_size = get_setting_i64(&state.db, "chat_page_size", 50).await?;
    let pagination = calculate_pagination(total, query.page, page_size);

    let mut messages = sqlx::query_as::<_, ChatMessage>(
        r#"
        SELECT m.guid, m.channel_id, m.sender_id, u.display_name AS sender_name,
               m.body, m.sent_at
        FROM chat_messages m
        JOIN users u ON u.guid = m.sender_id
        WHERE m.channel_id = ?
        ORDER BY m.sent_at DESC, m.guid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&id)
    .bind(pagination.page_size)
    .bind(pagination.offset)
    .fetch_all(&state.db)
    .await?;
    messages.reverse();

    Ok(Json(MessagePageResponse {
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages,
        messages,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

/// POST /api/chat/channels/:id/messages (staff)
pub async fn post_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<ChatMessage>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let channel_known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_channels WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    if channel_known == 0 {
        return Err(not_found(locale));
    }

    let length = req.body.chars().count() as i64;
    if length == 0 {
        return Err(ApiError::BadRequest("message body is required".to_string()));
    }
    let max_chars = get_setting_i64(&state.db, "chat_max_message_chars", 2000).await?;
    if length > max_chars {
        return Err(ApiError::BadRequest(
            Message::MessageTooLong.text(locale).to_string(),
        ));
    }

    let guid = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO chat_messages (guid, channel_id, sender_id, body) VALUES (?, ?, ?, ?)")
        .bind(&guid)
        .bind(&id)
        .bind(&user.guid)
        .bind(&req.body)
        .execute(&state.db)
        .await?;

    state.events.emit_lossy(NashirEvent::ChatMessagePosted {
        message_id: guid.clone(),
        channel_id: id.clone(),
        sender_id: user.guid.clone(),
        sender_name: user.display_name.clone(),
        body: req.body.clone(),
        timestamp: Utc::now(),
    });

    let message = sqlx::query_as::<_, ChatMessage>(
        r#"
        SELECT m.guid, m.channel_id, m.sender_id, u.display_name AS sender_name,
               m.body, m.sent_at
        FROM chat_messages m
        JOIN users u ON u.guid = m.sender_id
        WHERE m.guid = ?
        "#,
    )
    .bind(&guid)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(message))
}
