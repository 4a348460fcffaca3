//! Article lifecycle endpoints
//!
//! Publish, archive and feature transitions plus the staff listing.
//! Restricted to editors and admins; transitions that do not apply to
//! the article's current state answer 409.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::Utc;
use nashir_common::config::get_setting_i64;
use nashir_common::db::models::Article;
use nashir_common::events::NashirEvent;
use nashir_common::pagination::calculate_pagination;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::api::articles::{ArticleCard, ArticleDetail, ArticleListResponse};
use crate::api::session::{not_found, request_locale, require_editor, CurrentUser};
use crate::db::articles::get_article;
use crate::error::{ApiError, Result};
use crate::AppState;

async fn fetch_for_transition(
    db: &SqlitePool,
    guid: &str,
    locale: nashir_common::locale::Locale,
) -> Result<Article> {
    get_article(db, guid).await?.ok_or_else(|| not_found(locale))
}

/// POST /api/admin/articles/:id/publish
///
/// draft/review -> published. Sets published_at and emits
/// ArticlePublished. Publishing twice is a 409.
pub async fn publish_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ArticleDetail>> {
    let locale = request_locale(&headers);
    require_editor(&user, locale)?;

    let article = fetch_for_transition(&state.db, &id, locale).await?;
    match article.status.as_str() {
        "published" => {
            return Err(ApiError::Conflict("article is already published".to_string()))
        }
        "archived" => {
            return Err(ApiError::Conflict(
                "archived articles cannot be published".to_string(),
            ))
        }
        _ => {}
    }

    let published_at = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        UPDATE articles
        SET status = 'published', published_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&published_at)
    .bind(&article.guid)
    .execute(&state.db)
    .await?;

    info!("Article {} published by {}", article.slug, user.username);
    state.events.emit_lossy(NashirEvent::ArticlePublished {
        article_id: article.guid.clone(),
        slug: article.slug.clone(),
        title: article.title.clone(),
        language: article.language.clone(),
        timestamp: Utc::now(),
    });

    let updated = fetch_for_transition(&state.db, &article.guid, locale).await?;
    Ok(Json(ArticleDetail::from(updated)))
}

/// POST /api/admin/articles/:id/archive
///
/// published -> archived. Emits ArticleArchived.
pub async fn archive_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ArticleDetail>> {
    let locale = request_locale(&headers);
    require_editor(&user, locale)?;

    let article = fetch_for_transition(&state.db, &id, locale).await?;
    if article.status != "published" {
        return Err(ApiError::Conflict(
            "only published articles can be archived".to_string(),
        ));
    }

    sqlx::query(
        "UPDATE articles SET status = 'archived', featured = 0, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(&article.guid)
    .execute(&state.db)
    .await?;

    info!("Article {} archived by {}", article.slug, user.username);
    state.events.emit_lossy(NashirEvent::ArticleArchived {
        article_id: article.guid.clone(),
        slug: article.slug.clone(),
        timestamp: Utc::now(),
    });

    let updated = fetch_for_transition(&state.db, &article.guid, locale).await?;
    Ok(Json(ArticleDetail::from(updated)))
}

async fn set_featured(
    state: &AppState,
    user: &nashir_common::db::models::User,
    headers: &HeaderMap,
    id: &str,
    featured: bool,
) -> Result<Json<ArticleDetail>> {
    let locale = request_locale(headers);
    require_editor(user, locale)?;

    let article = fetch_for_transition(&state.db, id, locale).await?;
    if article.status != "published" {
        return Err(ApiError::Conflict(
            "only published articles can be featured".to_string(),
        ));
    }

    sqlx::query("UPDATE articles SET featured = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(featured)
        .bind(&article.guid)
        .execute(&state.db)
        .await?;

    state.events.emit_lossy(NashirEvent::ArticleFeatured {
        article_id: article.guid.clone(),
        featured,
        timestamp: Utc::now(),
    });

    let updated = fetch_for_transition(&state.db, &article.guid, locale).await?;
    Ok(Json(ArticleDetail::from(updated)))
}

/// POST /api/admin/articles/:id/feature
pub async fn feature_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ArticleDetail>> {
    set_featured(&state, &user, &headers, &id, true).await
}

/// POST /api/admin/articles/:id/unfeature
pub async fn unfeature_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ArticleDetail>> {
    set_featured(&state, &user, &headers, &id, false).await
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    pub status: Option<String>,
}

/// GET /api/admin/articles
///
/// Editorial listing across all statuses, newest first by creation.
pub async fn list_articles_admin(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<ArticleListResponse>> {
    let locale = request_locale(&headers);
    require_editor(&user, locale)?;

    let (filter_sql, status_bind) = match &query.status {
        Some(status) => (" WHERE status = ?", Some(status.clone())),
        None => ("", None),
    };

    let count_sql = format!("SELECT COUNT(*) FROM articles{}", filter_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(status) = &status_bind {
        count_query = count_query.bind(status);
    }
    let total = count_query.fetch_one(&state.db).await?;

    let page_size = get_setting_i64(&state.db, "admin_page_size", 50).await?;
    let pagination = calculate_pagination(total, query.page, page_size);

    let list_sql = format!(
        "SELECT * FROM articles{} ORDER BY created_at DESC, guid DESC LIMIT ? OFFSET ?",
        filter_sql
    );
    let mut list_query = sqlx::query_as::<_, Article>(&list_sql);
    if let Some(status) = &status_bind {
        list_query = list_query.bind(status);
    }
    let articles = list_query
        .bind(pagination.page_size)
        .bind(pagination.offset)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(ArticleListResponse {
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages,
        articles: articles.iter().map(ArticleCard::from).collect(),
    }))
}
