//! Article endpoints
//!
//! Public listing/detail/view recording plus the staff authoring
//! endpoints. Lifecycle changes (publish, archive, feature) live in
//! `admin.rs`.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use nashir_common::config::get_setting_i64;
use nashir_common::db::models::Article;
use nashir_common::locale::{Locale, Message};
use nashir_common::pagination::calculate_pagination;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::api::session::{
    not_found, request_locale, require_admin, require_staff, staff_session, CurrentUser,
};
use crate::db::articles::{
    count_published, get_article, get_article_by_slug, insert_article, list_published,
    record_view, update_article_content, ArticleFilter, NewArticle,
};
use crate::error::{ApiError, Result};
use crate::tags::{normalize_tags, TagError};
use crate::AppState;

// ========================================
// Response Shapes
// ========================================

/// Condensed article for list responses
#[derive(Debug, Serialize)]
pub struct ArticleCard {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub summary: String,
    pub language: String,
    pub kind: String,
    pub status: String,
    pub featured: bool,
    pub category_id: String,
    pub tags: Vec<String>,
    pub hero_image_url: Option<String>,
    pub published_at: Option<String>,
}

impl From<&Article> for ArticleCard {
    fn from(article: &Article) -> Self {
        ArticleCard {
            guid: article.guid.clone(),
            slug: article.slug.clone(),
            title: article.title.clone(),
            subtitle: article.subtitle.clone(),
            summary: article.summary.clone(),
            language: article.language.clone(),
            kind: article.kind.clone(),
            status: article.status.clone(),
            featured: article.featured,
            category_id: article.category_id.clone(),
            tags: article.tag_list(),
            hero_image_url: article.hero_image_url.clone(),
            published_at: article.published_at.clone(),
        }
    }
}

/// Full article for detail responses
#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub summary: String,
    pub body: String,
    pub language: String,
    pub kind: String,
    pub status: String,
    pub featured: bool,
    pub category_id: String,
    pub author_id: String,
    pub tags: Vec<String>,
    pub hero_image_url: Option<String>,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Article> for ArticleDetail {
    fn from(article: Article) -> Self {
        let tags = article.tag_list();
        ArticleDetail {
            guid: article.guid,
            slug: article.slug,
            title: article.title,
            subtitle: article.subtitle,
            summary: article.summary,
            body: article.body,
            language: article.language,
            kind: article.kind,
            status: article.status,
            featured: article.featured,
            category_id: article.category_id,
            author_id: article.author_id,
            tags,
            hero_image_url: article.hero_image_url,
            published_at: article.published_at,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub articles: Vec<ArticleCard>,
}

// ========================================
// Shared Validation
// ========================================

pub(crate) fn valid_language(language: &str) -> bool {
    matches!(language, "ar" | "en")
}

pub(crate) fn valid_kind(kind: &str) -> bool {
    matches!(kind, "news" | "opinion" | "analysis" | "digest")
}

pub(crate) async fn category_exists(db: &SqlitePool, guid: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE guid = ?")
        .bind(guid)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

pub(crate) fn tag_error(locale: Locale, err: TagError) -> ApiError {
    match err {
        TagError::Empty => ApiError::BadRequest(Message::InvalidTag.text(locale).to_string()),
        TagError::TooMany { .. } => {
            ApiError::BadRequest(Message::TooManyTags.text(locale).to_string())
        }
    }
}

// ========================================
// Public Endpoints
// ========================================

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    pub category: Option<String>,
    pub language: Option<String>,
    pub kind: Option<String>,
    pub tag: Option<String>,
    pub q: Option<String>,
}

/// GET /api/articles
///
/// Paginated published articles, newest first. Filterable by category
/// slug, language, kind, tag and a title/summary substring.
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ArticleListResponse>> {
    let filter = ArticleFilter {
        category_slug: query.category,
        language: query.language,
        kind: query.kind,
        tag: query.tag,
        q: query.q,
    };

    let page_size = get_setting_i64(&state.db, "feed_page_size", 20).await?;
    let total = count_published(&state.db, &filter).await?;
    let pagination = calculate_pagination(total, query.page, page_size);
    let articles = list_published(&state.db, &filter, pagination.page_size, pagination.offset).await?;

    Ok(Json(ArticleListResponse {
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages,
        articles: articles.iter().map(ArticleCard::from).collect(),
    }))
}

/// GET /api/articles/:slug
///
/// Published articles are public. Anything else answers 404 unless the
/// caller holds a staff session, so unpublished slugs stay invisible.
pub async fn get_article_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<ArticleDetail>> {
    let locale = request_locale(&headers);

    let article = get_article_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| not_found(locale))?;

    if article.status != "published" && staff_session(&state, &headers).await?.is_none() {
        return Err(not_found(locale));
    }

    Ok(Json(ArticleDetail::from(article)))
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub session_key: String,
}

/// POST /api/articles/:slug/view
///
/// Records a reader view. Repeat views from the same session_key inside
/// the `view_dedup_minutes` window do not count again.
pub async fn record_article_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(req): Json<ViewRequest>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);

    if req.session_key.trim().is_empty() {
        return Err(ApiError::BadRequest("session_key is required".to_string()));
    }

    let article = get_article_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| not_found(locale))?;

    if article.status != "published" {
        return Err(not_found(locale));
    }

    let dedup_minutes = get_setting_i64(&state.db, "view_dedup_minutes", 30).await?;
    let counted = record_view(&state.db, &article.guid, &req.session_key, dedup_minutes).await?;

    Ok(Json(json!({ "counted": counted })))
}

// ========================================
// Staff Authoring Endpoints
// ========================================

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub slug: Option<String>,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub body: String,
    pub language: Option<String>,
    pub kind: Option<String>,
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub hero_image_url: Option<String>,
}

/// POST /api/articles
///
/// Creates a draft owned by the calling author. Slug derives from the
/// title (or the provided slug) and is uniquified with a numeric suffix.
pub async fn create_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateArticleRequest>,
) -> Result<Json<ArticleDetail>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let language = req.language.unwrap_or_else(|| "ar".to_string());
    if !valid_language(&language) {
        return Err(ApiError::BadRequest(format!("invalid language: {}", language)));
    }

    let kind = req.kind.unwrap_or_else(|| "news".to_string());
    if !valid_kind(&kind) {
        return Err(ApiError::BadRequest(format!("invalid kind: {}", kind)));
    }

    if !category_exists(&state.db, &req.category_id).await? {
        return Err(ApiError::BadRequest(
            Message::UnknownCategory.text(locale).to_string(),
        ));
    }

    let max_tags = get_setting_i64(&state.db, "max_article_tags", 10).await? as usize;
    let tags = normalize_tags(&req.tags, max_tags).map_err(|e| tag_error(locale, e))?;

    let article = insert_article(
        &state.db,
        NewArticle {
            slug: req.slug,
            title: req.title.trim().to_string(),
            subtitle: req.subtitle,
            summary: req.summary,
            body: req.body,
            language,
            kind,
            category_id: req.category_id,
            author_id: user.guid.clone(),
            tags,
            hero_image_url: req.hero_image_url,
        },
    )
    .await?;

    Ok(Json(ArticleDetail::from(article)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub language: Option<String>,
    pub kind: Option<String>,
    pub category_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub hero_image_url: Option<String>,
}

/// PUT /api/articles/:id
///
/// Partial update of an article still in draft or review. Authors may
/// only edit their own drafts; editors and admins may edit any.
pub async fn update_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateArticleRequest>,
) -> Result<Json<ArticleDetail>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let article = get_article(&state.db, &id)
        .await?
        .ok_or_else(|| not_found(locale))?;

    if !user.can_edit_any_article() && article.author_id != user.guid {
        return Err(ApiError::Forbidden(
            Message::Forbidden.text(locale).to_string(),
        ));
    }

    if article.status != "draft" && article.status != "review" {
        return Err(ApiError::Conflict(
            "only draft or review articles can be edited".to_string(),
        ));
    }

    let existing_tags = article.tag_list();

    let title = req.title.unwrap_or(article.title);
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let language = req.language.unwrap_or(article.language);
    if !valid_language(&language) {
        return Err(ApiError::BadRequest(format!("invalid language: {}", language)));
    }

    let kind = req.kind.unwrap_or(article.kind);
    if !valid_kind(&kind) {
        return Err(ApiError::BadRequest(format!("invalid kind: {}", kind)));
    }

    let category_id = req.category_id.unwrap_or(article.category_id);
    if !category_exists(&state.db, &category_id).await? {
        return Err(ApiError::BadRequest(
            Message::UnknownCategory.text(locale).to_string(),
        ));
    }

    let tags = match req.tags {
        Some(raw) => {
            let max_tags = get_setting_i64(&state.db, "max_article_tags", 10).await? as usize;
            normalize_tags(&raw, max_tags).map_err(|e| tag_error(locale, e))?
        }
        None => existing_tags,
    };

    let subtitle = req.subtitle.or(article.subtitle);
    let summary = req.summary.unwrap_or(article.summary);
    let body = req.body.unwrap_or(article.body);
    let hero_image_url = req.hero_image_url.or(article.hero_image_url);

    let updated = update_article_content(
        &state.db,
        &article.guid,
        title.trim(),
        subtitle.as_deref(),
        &summary,
        &body,
        &language,
        &kind,
        &category_id,
        &tags,
        hero_image_url.as_deref(),
    )
    .await?;

    Ok(Json(ArticleDetail::from(updated)))
}

/// DELETE /api/articles/:id
///
/// Admin only, and only for archived articles. Views and angle
/// attachments cascade away with the row.
pub async fn delete_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let article = get_article(&state.db, &id)
        .await?
        .ok_or_else(|| not_found(locale))?;

    if article.status != "archived" {
        return Err(ApiError::Conflict(
            "only archived articles can be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM articles WHERE guid = ?")
        .bind(&article.guid)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "status": "deleted" })))
}
