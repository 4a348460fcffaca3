//! Article database queries
//!
//! Shared by the public feed endpoints, the staff editing endpoints and
//! the stats endpoints. All article timestamps that participate in
//! ordering (published_at) are RFC3339 strings written by the
//! application, so string comparison orders them correctly.

use crate::error::{ApiError, Result};
use crate::slug::slugify;
use nashir_common::db::models::{encode_tags, Article};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Fields for a new draft article
///
/// Tags must already be validated and deduplicated. When `slug` is
/// given it is still normalized and uniquified; otherwise the slug
/// derives from the title.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub slug: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub summary: String,
    pub body: String,
    pub language: String,
    pub kind: String,
    pub category_id: String,
    pub author_id: String,
    pub tags: Vec<String>,
    pub hero_image_url: Option<String>,
}

/// Filters for published-article listings
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub category_slug: Option<String>,
    pub language: Option<String>,
    pub kind: Option<String>,
    pub tag: Option<String>,
    pub q: Option<String>,
}

impl ArticleFilter {
    fn where_clause(&self, sql: &mut String, binds: &mut Vec<String>) {
        if let Some(slug) = &self.category_slug {
            sql.push_str(" AND category_id = (SELECT guid FROM categories WHERE slug = ?)");
            binds.push(slug.clone());
        }
        if let Some(language) = &self.language {
            sql.push_str(" AND language = ?");
            binds.push(language.clone());
        }
        if let Some(kind) = &self.kind {
            sql.push_str(" AND kind = ?");
            binds.push(kind.clone());
        }
        if let Some(tag) = &self.tag {
            // Tags are stored as a JSON array, so match the quoted element
            sql.push_str(" AND tags LIKE '%\"' || ? || '\"%'");
            binds.push(tag.clone());
        }
        if let Some(q) = &self.q {
            sql.push_str(" AND (title LIKE '%' || ? || '%' OR summary LIKE '%' || ? || '%')");
            binds.push(q.clone());
            binds.push(q.clone());
        }
    }
}

/// Get an article by guid
pub async fn get_article(db: &SqlitePool, guid: &str) -> Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE guid = ?")
        .bind(guid)
        .fetch_optional(db)
        .await?;
    Ok(article)
}

/// Get an article by slug
pub async fn get_article_by_slug(db: &SqlitePool, slug: &str) -> Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE slug = ?")
        .bind(slug)
        .fetch_optional(db)
        .await?;
    Ok(article)
}

/// Derive a slug from the title that no existing article uses
///
/// Appends -2, -3, ... until the slug is free.
pub async fn unique_slug(db: &SqlitePool, title: &str) -> Result<String> {
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut suffix = 2u32;

    loop {
        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE slug = ?")
            .bind(&candidate)
            .fetch_one(db)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}

/// Insert a new article in draft status
pub async fn insert_article(db: &SqlitePool, new: NewArticle) -> Result<Article> {
    let guid = Uuid::new_v4().to_string();
    let slug_source = new.slug.as_deref().unwrap_or(&new.title);
    let slug = unique_slug(db, slug_source).await?;
    let tags = encode_tags(&new.tags);

    sqlx::query(
        r#"
        INSERT INTO articles (guid, slug, title, subtitle, summary, body,
                              language, kind, status, category_id, author_id,
                              tags, hero_image_url)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'draft', ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&slug)
    .bind(&new.title)
    .bind(&new.subtitle)
    .bind(&new.summary)
    .bind(&new.body)
    .bind(&new.language)
    .bind(&new.kind)
    .bind(&new.category_id)
    .bind(&new.author_id)
    .bind(&tags)
    .bind(&new.hero_image_url)
    .execute(db)
    .await?;

    get_article(db, &guid)
        .await?
        .ok_or_else(|| ApiError::Internal("article vanished after insert".to_string()))
}

/// Update an article's editable content fields
///
/// Status and featured are changed through the admin lifecycle
/// endpoints, never here.
#[allow(clippy::too_many_arguments)]
pub async fn update_article_content(
    db: &SqlitePool,
    guid: &str,
    title: &str,
    subtitle: Option<&str>,
    summary: &str,
    body: &str,
    language: &str,
    kind: &str,
    category_id: &str,
    tags: &[String],
    hero_image_url: Option<&str>,
) -> Result<Article> {
    let tags = encode_tags(tags);

    let result = sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, subtitle = ?, summary = ?, body = ?, language = ?,
            kind = ?, category_id = ?, tags = ?, hero_image_url = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(title)
    .bind(subtitle)
    .bind(summary)
    .bind(body)
    .bind(language)
    .bind(kind)
    .bind(category_id)
    .bind(&tags)
    .bind(hero_image_url)
    .bind(guid)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("article not found".to_string()));
    }

    get_article(db, guid)
        .await?
        .ok_or_else(|| ApiError::Internal("article vanished after update".to_string()))
}

/// List published articles matching the filter, newest first
pub async fn list_published(
    db: &SqlitePool,
    filter: &ArticleFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Article>> {
    let mut sql = String::from("SELECT * FROM articles WHERE status = 'published'");
    let mut binds: Vec<String> = Vec::new();
    filter.where_clause(&mut sql, &mut binds);
    sql.push_str(" ORDER BY published_at DESC, guid DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query_as::<_, Article>(&sql);
    for value in &binds {
        query = query.bind(value);
    }
    let articles = query.bind(limit).bind(offset).fetch_all(db).await?;
    Ok(articles)
}

/// Count published articles matching the filter
pub async fn count_published(db: &SqlitePool, filter: &ArticleFilter) -> Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM articles WHERE status = 'published'");
    let mut binds: Vec<String> = Vec::new();
    filter.where_clause(&mut sql, &mut binds);

    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for value in &binds {
        query = query.bind(value);
    }
    let total = query.fetch_one(db).await?;
    Ok(total)
}

// ========================================
// Lite feed cursor pagination
// ========================================

/// Encode an article's lite-feed cursor
///
/// The cursor is `published_at|guid`. Both parts are compared as
/// strings, matching the `ORDER BY published_at DESC, guid DESC` the
/// lite feed uses.
pub fn encode_cursor(article: &Article) -> Option<String> {
    article
        .published_at
        .as_ref()
        .map(|ts| format!("{}|{}", ts, article.guid))
}

/// Split a lite-feed cursor into (published_at, guid)
pub fn parse_cursor(cursor: &str) -> Option<(String, String)> {
    let (ts, guid) = cursor.split_once('|')?;
    if ts.is_empty() || guid.is_empty() {
        return None;
    }
    Some((ts.to_string(), guid.to_string()))
}

/// Fetch one lite-feed page after the cursor position
///
/// Keyset pagination: strictly older than the cursor row, or the same
/// timestamp with a smaller guid. No cursor means start from the newest.
pub async fn list_lite_page(
    db: &SqlitePool,
    language: Option<&str>,
    cursor: Option<&(String, String)>,
    limit: i64,
) -> Result<Vec<Article>> {
    let mut sql = String::from(
        "SELECT * FROM articles WHERE status = 'published' AND published_at IS NOT NULL",
    );
    let mut binds: Vec<String> = Vec::new();

    if let Some(language) = language {
        sql.push_str(" AND language = ?");
        binds.push(language.to_string());
    }
    if let Some((ts, guid)) = cursor {
        sql.push_str(" AND (published_at < ? OR (published_at = ? AND guid < ?))");
        binds.push(ts.clone());
        binds.push(ts.clone());
        binds.push(guid.clone());
    }
    sql.push_str(" ORDER BY published_at DESC, guid DESC LIMIT ?");

    let mut query = sqlx::query_as::<_, Article>(&sql);
    for value in &binds {
        query = query.bind(value);
    }
    let articles = query.bind(limit).fetch_all(db).await?;
    Ok(articles)
}

// ========================================
// View tracking
// ========================================

/// Record a reader view, deduplicated per session
///
/// A view only counts when the same session_key has not viewed the
/// article within the dedup window. Returns whether the view counted.
pub async fn record_view(
    db: &SqlitePool,
    article_id: &str,
    session_key: &str,
    dedup_minutes: i64,
) -> Result<bool> {
    let recent: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM article_views
        WHERE article_id = ? AND session_key = ?
          AND viewed_at > datetime('now', ?)
        "#,
    )
    .bind(article_id)
    .bind(session_key)
    .bind(format!("-{} minutes", dedup_minutes))
    .fetch_one(db)
    .await?;

    if recent > 0 {
        return Ok(false);
    }

    sqlx::query("INSERT INTO article_views (article_id, session_key) VALUES (?, ?)")
        .bind(article_id)
        .bind(session_key)
        .execute(db)
        .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_with(published_at: Option<&str>, guid: &str) -> Article {
        Article {
            guid: guid.to_string(),
            slug: "s".to_string(),
            title: "t".to_string(),
            subtitle: None,
            summary: String::new(),
            body: String::new(),
            language: "ar".to_string(),
            kind: "news".to_string(),
            status: "published".to_string(),
            featured: false,
            category_id: "c".to_string(),
            author_id: "a".to_string(),
            tags: "[]".to_string(),
            hero_image_url: None,
            published_at: published_at.map(|s| s.to_string()),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_cursor_round_trip() {
        let article = article_with(Some("2026-03-01T10:00:00+00:00"), "abc-123");
        let cursor = encode_cursor(&article).unwrap();
        assert_eq!(cursor, "2026-03-01T10:00:00+00:00|abc-123");
        let (ts, guid) = parse_cursor(&cursor).unwrap();
        assert_eq!(ts, "2026-03-01T10:00:00+00:00");
        assert_eq!(guid, "abc-123");
    }

    #[test]
    fn test_cursor_requires_published_at() {
        let article = article_with(None, "abc");
        assert!(encode_cursor(&article).is_none());
    }

    #[test]
    fn test_parse_cursor_rejects_garbage() {
        assert!(parse_cursor("").is_none());
        assert!(parse_cursor("no-separator").is_none());
        assert!(parse_cursor("|guid-only").is_none());
        assert!(parse_cursor("ts-only|").is_none());
    }

    #[test]
    fn test_filter_builds_conditions_in_bind_order() {
        let filter = ArticleFilter {
            category_slug: Some("economy".to_string()),
            language: Some("ar".to_string()),
            kind: None,
            tag: Some("نفط".to_string()),
            q: Some("oil".to_string()),
        };
        let mut sql = String::new();
        let mut binds = Vec::new();
        filter.where_clause(&mut sql, &mut binds);

        assert!(sql.contains("category_id ="));
        assert!(sql.contains("language = ?"));
        assert!(!sql.contains("kind = ?"));
        assert!(sql.contains("tags LIKE"));
        assert_eq!(binds, vec!["economy", "ar", "نفط", "oil", "oil"]);
    }
}
