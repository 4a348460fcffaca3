//! Reader feed endpoints
//!
//! The main feed, the featured strip, per-category feeds, the latest
//! digest, and the lite vertical feed [REQ-FEED-030]. The lite feed
//! uses keyset pagination so its order stays stable while new articles
//! publish between page fetches.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use nashir_common::config::get_setting_i64;
use nashir_common::db::models::{Article, Category};
use nashir_common::locale::Locale;
use nashir_common::pagination::calculate_pagination;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::api::articles::{ArticleCard, ArticleListResponse};
use crate::api::session::{not_found, request_locale};
use crate::db::articles::{
    count_published, encode_cursor, list_lite_page, list_published, parse_cursor, ArticleFilter,
};
use crate::error::{ApiError, Result};
use crate::AppState;

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    pub language: Option<String>,
}

/// GET /api/feed
///
/// Latest published articles, newest first, optionally per language.
pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<ArticleListResponse>> {
    let filter = ArticleFilter {
        language: query.language,
        ..Default::default()
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

#[derive(Debug, Serialize)]
pub struct FeaturedResponse {
    pub articles: Vec<ArticleCard>,
}

/// GET /api/feed/featured
///
/// The editorial featured strip: up to 10 featured published articles.
pub async fn featured(State(state): State<AppState>) -> Result<Json<FeaturedResponse>> {
    let articles = sqlx::query_as::<_, Article>(
        r#"
        SELECT * FROM articles
        WHERE status = 'published' AND featured = 1
        ORDER BY published_at DESC, guid DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(FeaturedResponse {
        articles: articles.iter().map(ArticleCard::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CategoryFeedQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

/// GET /api/categories/:slug/articles
pub async fn category_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<CategoryFeedQuery>,
) -> Result<Json<ArticleListResponse>> {
    let locale = request_locale(&headers);

    let known: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE slug = ? AND active = 1")
            .bind(&slug)
            .fetch_one(&state.db)
            .await?;
    if known == 0 {
        return Err(not_found(locale));
    }

    let filter = ArticleFilter {
        category_slug: Some(slug),
        ..Default::default()
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

#[derive(Debug, Deserialize)]
pub struct DigestQuery {
    pub language: Option<String>,
}

/// GET /api/digest/latest
///
/// Newest published digest article; 404 while none has been published.
pub async fn latest_digest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DigestQuery>,
) -> Result<Json<crate::api::articles::ArticleDetail>> {
    let locale = request_locale(&headers);

    let mut sql = String::from(
        "SELECT * FROM articles WHERE status = 'published' AND kind = 'digest'",
    );
    let mut binds: Vec<String> = Vec::new();
    if let Some(language) = query.language {
        sql.push_str(" AND language = ?");
        binds.push(language);
    }
    sql.push_str(" ORDER BY published_at DESC, guid DESC LIMIT 1");

    let mut digest_query = sqlx::query_as::<_, Article>(&sql);
    for value in &binds {
        digest_query = digest_query.bind(value);
    }
    let article = digest_query
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    Ok(Json(crate::api::articles::ArticleDetail::from(article)))
}

// ========================================
// Lite Feed
// ========================================

/// Condensed card for the lite vertical feed
#[derive(Debug, Serialize)]
pub struct LiteCard {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub hero_image_url: Option<String>,
    pub category_name: String,
    pub published_at: String,
}

#[derive(Debug, Serialize)]
pub struct LiteFeedResponse {
    pub cards: Vec<LiteCard>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LiteFeedQuery {
    pub cursor: Option<String>,
    pub language: Option<String>,
}

async fn category_names(db: &SqlitePool) -> Result<HashMap<String, Category>> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories")
        .fetch_all(db)
        .await?;
    Ok(categories
        .into_iter()
        .map(|category| (category.guid.clone(), category))
        .collect())
}

/// GET /api/lite/feed
///
/// Swipeable card feed. The cursor is the `published_at|guid` of the
/// last card of the previous page; pages never repeat or skip articles
/// even while new ones publish.
pub async fn lite_feed(
    State(state): State<AppState>,
    Query(query): Query<LiteFeedQuery>,
) -> Result<Json<LiteFeedResponse>> {
    let cursor = match &query.cursor {
        Some(raw) => Some(
            parse_cursor(raw)
                .ok_or_else(|| ApiError::BadRequest("invalid cursor".to_string()))?,
        ),
        None => None,
    };

    let page_size = get_setting_i64(&state.db, "lite_feed_page_size", 8).await?;
    let articles = list_lite_page(
        &state.db,
        query.language.as_deref(),
        cursor.as_ref(),
        page_size,
    )
    .await?;

    let next_cursor = if articles.len() as i64 == page_size {
        articles.last().and_then(encode_cursor)
    } else {
        None
    };

    let categories = category_names(&state.db).await?;
    let cards = articles
        .iter()
        .map(|article| {
            let card_locale = Locale::from_tag(&article.language).unwrap_or(Locale::Ar);
            let category_name = categories
                .get(&article.category_id)
                .map(|category| category.name_for(card_locale).to_string())
                .unwrap_or_default();
            LiteCard {
                slug: article.slug.clone(),
                title: article.title.clone(),
                summary: article.summary.clone(),
                hero_image_url: article.hero_image_url.clone(),
                category_name,
                published_at: article.published_at.clone().unwrap_or_default(),
            }
        })
        .collect();

    Ok(Json(LiteFeedResponse { cards, next_cursor }))
}
