//! Editorial angles
//!
//! An angle is a curated collection of articles around one perspective
//! (an election, a war, a season). Readers see enabled angles with
//! their published articles in curator order; admins curate membership.

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
use crate::db::articles::get_article;
use crate::error::{ApiError, Result};
use crate::slug::slugify;
use crate::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Angle {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct AngleDetailResponse {
    pub angle: Angle,
    pub articles: Vec<ArticleCard>,
}

/// GET /api/angles
pub async fn list_angles(State(state): State<AppState>) -> Result<Json<Vec<Angle>>> {
    let angles = sqlx::query_as::<_, Angle>(
        "SELECT * FROM angles WHERE enabled = 1 ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(angles))
}

/// GET /api/angles/:slug
///
/// The angle plus its published articles in curator order.
pub async fn get_angle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<AngleDetailResponse>> {
    let locale = request_locale(&headers);

    let angle = sqlx::query_as::<_, Angle>("SELECT * FROM angles WHERE slug = ? AND enabled = 1")
        .bind(&slug)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let articles = sqlx::query_as::<_, Article>(
        r#"
        SELECT a.* FROM articles a
        JOIN angle_articles aa ON aa.article_id = a.guid
        WHERE aa.angle_id = ? AND a.status = 'published'
        ORDER BY aa.position, a.published_at DESC
        "#,
    )
    .bind(&angle.guid)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(AngleDetailResponse {
        angle,
        articles: articles.iter().map(ArticleCard::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateAngleRequest {
    pub slug: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
}

/// POST /api/angles (admin)
pub async fn create_angle(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateAngleRequest>,
) -> Result<Json<Angle>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let slug = slugify(req.slug.as_deref().unwrap_or(&req.title));
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM angles WHERE slug = ?")
        .bind(&slug)
        .fetch_one(&state.db)
        .await?;
    if taken > 0 {
        return Err(ApiError::Conflict(format!("angle slug already exists: {}", slug)));
    }

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO angles (guid, slug, title, description, cover_image_url)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&slug)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(&req.cover_image_url)
    .execute(&state.db)
    .await?;

    let angle = sqlx::query_as::<_, Angle>("SELECT * FROM angles WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(angle))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAngleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub enabled: Option<bool>,
}

/// PUT /api/angles/:id (admin)
///
/// The slug never changes once created; published links stay valid.
pub async fn update_angle(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateAngleRequest>,
) -> Result<Json<Angle>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let existing = sqlx::query_as::<_, Angle>("SELECT * FROM angles WHERE guid = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let title = req.title.unwrap_or(existing.title);
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    sqlx::query(
        r#"
        UPDATE angles
        SET title = ?, description = ?, cover_image_url = ?, enabled = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(title.trim())
    .bind(req.description.or(existing.description))
    .bind(req.cover_image_url.or(existing.cover_image_url))
    .bind(req.enabled.unwrap_or(existing.enabled))
    .bind(&id)
    .execute(&state.db)
    .await?;

    let angle = sqlx::query_as::<_, Angle>("SELECT * FROM angles WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(angle))
}

#[derive(Debug, Deserialize)]
pub struct AttachArticleRequest {
    pub article_id: String,
    pub position: Option<i64>,
}

/// POST /api/angles/:id/articles (admin)
///
/// Attach an article at a position. Re-attaching moves it.
pub async fn attach_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<AttachArticleRequest>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let angle_known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM angles WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    if angle_known == 0 {
        return Err(not_found(locale));
    }

    let article = get_article(&state.db, &req.article_id)
        .await?
        .ok_or_else(|| not_found(locale))?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO angle_articles (angle_id, article_id, position)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&article.guid)
    .bind(req.position.unwrap_or(100))
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "status": "attached" })))
}

/// DELETE /api/angles/:id/articles/:article_id (admin)
pub async fn detach_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path((id, article_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let result = sqlx::query("DELETE FROM angle_articles WHERE angle_id = ? AND article_id = ?")
        .bind(&id)
        .bind(&article_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(locale));
    }

    Ok(Json(json!({ "status": "detached" })))
}
