//! Smart blocks
//!
//! Keyword-driven homepage widgets. Each enabled block hydrates itself
//! with the newest published articles whose title, summary or tags
//! match its keyword.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use nashir_common::db::models::Article;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::articles::ArticleCard;
use crate::api::session::{not_found, request_locale, require_admin, CurrentUser};
use crate::error::{ApiError, Result};
use crate::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SmartBlock {
    pub guid: String,
    pub title: String,
    pub layout: String,
    pub keyword: String,
    pub max_items: i64,
    pub position: i64,
    pub enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct HydratedBlock {
    pub block: SmartBlock,
    pub articles: Vec<ArticleCard>,
}

fn valid_layout(layout: &str) -> bool {
    matches!(layout, "grid" | "list" | "featured")
}

/// GET /api/smart-blocks
///
/// Enabled blocks in display order, hydrated with matching articles.
pub async fn list_smart_blocks(State(state): State<AppState>) -> Result<Json<Vec<HydratedBlock>>> {
    let blocks = sqlx::query_as::<_, SmartBlock>(
        "SELECT * FROM smart_blocks WHERE enabled = 1 ORDER BY position, created_at",
    )
    .fetch_all(&state.db)
    .await?;

    let mut hydrated = Vec::with_capacity(blocks.len());
    for block in blocks {
        let articles = sqlx::query_as::<_, Article>(
            r#"
            SELECT * FROM articles
            WHERE status = 'published'
              AND (title LIKE '%' || ? || '%'
                   OR summary LIKE '%' || ? || '%'
                   OR tags LIKE '%' || ? || '%')
            ORDER BY published_at DESC, guid DESC
            LIMIT ?
            "#,
        )
        .bind(&block.keyword)
        .bind(&block.keyword)
        .bind(&block.keyword)
        .bind(block.max_items)
        .fetch_all(&state.db)
        .await?;

        hydrated.push(HydratedBlock {
            articles: articles.iter().map(ArticleCard::from).collect(),
            block,
        });
    }

    Ok(Json(hydrated))
}

#[derive(Debug, Deserialize)]
pub struct CreateSmartBlockRequest {
    pub title: String,
    pub layout: Option<String>,
    pub keyword: String,
    pub max_items: Option<i64>,
    pub position: Option<i64>,
}

/// POST /api/smart-blocks (admin)
pub async fn create_smart_block(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateSmartBlockRequest>,
) -> Result<Json<SmartBlock>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    if req.title.trim().is_empty() || req.keyword.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "title and keyword are required".to_string(),
        ));
    }

    let layout = req.layout.unwrap_or_else(|| "list".to_string());
    if !valid_layout(&layout) {
        return Err(ApiError::BadRequest(format!("invalid layout: {}", layout)));
    }

    let max_items = req.max_items.unwrap_or(6);
    if !(1..=20).contains(&max_items) {
        return Err(ApiError::BadRequest(
            "max_items must be between 1 and 20".to_string(),
        ));
    }

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO smart_blocks (guid, title, layout, keyword, max_items, position)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(req.title.trim())
    .bind(&layout)
    .bind(req.keyword.trim())
    .bind(max_items)
    .bind(req.position.unwrap_or(100))
    .execute(&state.db)
    .await?;

    let block = sqlx::query_as::<_, SmartBlock>("SELECT * FROM smart_blocks WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(block))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSmartBlockRequest {
    pub title: Option<String>,
    pub layout: Option<String>,
    pub keyword: Option<String>,
    pub max_items: Option<i64>,
    pub position: Option<i64>,
    pub enabled: Option<bool>,
}

/// PUT /api/smart-blocks/:id (admin)
pub async fn update_smart_block(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateSmartBlockRequest>,
) -> Result<Json<SmartBlock>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let existing = sqlx::query_as::<_, SmartBlock>("SELECT * FROM smart_blocks WHERE guid = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let title = req.title.unwrap_or(existing.title);
    let keyword = req.keyword.unwrap_or(existing.keyword);
    if title.trim().is_empty() || keyword.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "title and keyword are required".to_string(),
        ));
    }

    let layout = req.layout.unwrap_or(existing.layout);
    if !valid_layout(&layout) {
        return Err(ApiError::BadRequest(format!("invalid layout: {}", layout)));
    }

    let max_items = req.max_items.unwrap_or(existing.max_items);
    if !(1..=20).contains(&max_items) {
        return Err(ApiError::BadRequest(
            "max_items must be between 1 and 20".to_string(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE smart_blocks
        SET title = ?, layout = ?, keyword = ?, max_items = ?, position = ?,
            enabled = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(title.trim())
    .bind(&layout)
    .bind(keyword.trim())
    .bind(max_items)
    .bind(req.position.unwrap_or(existing.position))
    .bind(req.enabled.unwrap_or(existing.enabled))
    .bind(&id)
    .execute(&state.db)
    .await?;

    let block = sqlx::query_as::<_, SmartBlock>("SELECT * FROM smart_blocks WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(block))
}

/// DELETE /api/smart-blocks/:id (admin)
pub async fn delete_smart_block(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let result = sqlx::query("DELETE FROM smart_blocks WHERE guid = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(locale));
    }

    Ok(Json(json!({ "status": "deleted" })))
}
