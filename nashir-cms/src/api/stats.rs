//! Editorial analytics
//!
//! Aggregates over articles, views, users and tasks for the dashboard.
//! View windows compare against `datetime('now', ...)` because view
//! rows are stamped by SQLite itself.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use nashir_common::db::init::ANONYMOUS_USER_GUID;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::session::{not_found, request_locale, require_editor, CurrentUser};
use crate::db::articles::get_article;
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TopArticle {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub views: i64,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub articles_by_status: Value,
    pub views_last_7_days: i64,
    pub top_articles: Vec<TopArticle>,
    pub total_users: i64,
    pub open_tasks: i64,
}

/// GET /api/admin/stats/overview (admin/editor)
pub async fn overview(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Json<OverviewResponse>> {
    let locale = request_locale(&headers);
    require_editor(&user, locale)?;

    let status_rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM articles GROUP BY status")
            .fetch_all(&state.db)
            .await?;
    let mut articles_by_status = Map::new();
    for (status, count) in status_rows {
        articles_by_status.insert(status, Value::from(count));
    }

    let views_last_7_days: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM article_views WHERE viewed_at > datetime('now', '-7 days')",
    )
    .fetch_one(&state.db)
    .await?;

    let top_rows: Vec<(String, String, String, i64)> = sqlx::query_as(
        r#"
        SELECT a.guid, a.slug, a.title, COUNT(v.id) AS views
        FROM articles a
        JOIN article_views v ON v.article_id = a.guid
        WHERE a.status = 'published' AND v.viewed_at > datetime('now', '-7 days')
        GROUP BY a.guid
        ORDER BY views DESC, a.published_at DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    let top_articles = top_rows
        .into_iter()
        .map(|(guid, slug, title, views)| TopArticle { guid, slug, title, views })
        .collect();

    // The Anonymous placeholder account is not a real user
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE guid != ?")
        .bind(ANONYMOUS_USER_GUID)
        .fetch_one(&state.db)
        .await?;

    let open_tasks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status != 'done'")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(OverviewResponse {
        articles_by_status: Value::Object(articles_by_status),
        views_last_7_days,
        top_articles,
        total_users,
        open_tasks,
    }))
}

#[derive(Debug, Serialize)]
pub struct DayCount {
    pub day: String,
    pub views: i64,
}

#[derive(Debug, Serialize)]
pub struct ArticleStatsResponse {
    pub article_id: String,
    pub slug: String,
    pub title: String,
    pub total_views: i64,
    pub views_last_30_days: i64,
    pub per_day: Vec<DayCount>,
}

/// GET /api/admin/stats/articles/:id (admin/editor)
///
/// Per-day view counts for the last 30 days. Days without views are
/// absent rather than zero-filled.
pub async fn article_stats(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ArticleStatsResponse>> {
    let locale = request_locale(&headers);
    require_editor(&user, locale)?;

    let article = get_article(&state.db, &id)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let total_views: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM article_views WHERE article_id = ?")
            .bind(&article.guid)
            .fetch_one(&state.db)
            .await?;

    let day_rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT date(viewed_at) AS day, COUNT(*) AS views
        FROM article_views
        WHERE article_id = ? AND viewed_at > datetime('now', '-30 days')
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(&article.guid)
    .fetch_all(&state.db)
    .await?;

    let views_last_30_days = day_rows.iter().map(|(_, views)| views).sum();
    let per_day = day_rows
        .into_iter()
        .map(|(day, views)| DayCount { day, views })
        .collect();

    Ok(Json(ArticleStatsResponse {
        article_id: article.guid,
        slug: article.slug,
        title: article.title,
        total_views,
        views_last_30_days,
        per_day,
    }))
}
