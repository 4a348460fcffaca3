//! Deterministic related-article recommendations
//!
//! No model call here: candidates are scored by section and tag
//! overlap plus shared title words, so the widget keeps working when
//! the provider is down and the ranking is reproducible in tests.
//!
//! Scoring per candidate:
//!   +3 same section
//!   +2 per shared tag (case-insensitive)
//!   +1 per shared title token (3+ chars, case-insensitive)
//! Ties break newest-first on publish time.

use serde::Serialize;
use sqlx::SqlitePool;

use nashir_common::config::get_setting_i64;
use nashir_common::db::models::{Article, Category};
use nashir_common::locale::Locale;

use crate::error::{ApiError, Result};

const MAX_RECOMMENDATIONS: i64 = 10;

/// A recommendation as shown in the reader widget
#[derive(Debug, Serialize)]
pub struct RecommendationCard {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub summary: String,
    pub language: String,
    pub kind: String,
    pub category_slug: String,
    pub category_name: String,
    pub hero_image_url: Option<String>,
    pub published_at: Option<String>,
    pub score: i64,
}

/// Distinct lowercase title words of 3+ chars
pub fn title_tokens(title: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in title.split(|c: char| !c.is_alphanumeric()) {
        if word.chars().count() < 3 {
            continue;
        }
        let token = word.to_lowercase();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Relatedness score between the anchor article and a candidate
pub fn score(base: &Article, candidate: &Article) -> i64 {
    let mut total = 0;

    if candidate.category_id == base.category_id {
        total += 3;
    }

    let base_tags: Vec<String> = base.tag_list().iter().map(|t| t.to_lowercase()).collect();
    for tag in candidate.tag_list() {
        if base_tags.contains(&tag.to_lowercase()) {
            total += 2;
        }
    }

    let base_tokens = title_tokens(&base.title);
    for token in title_tokens(&candidate.title) {
        if base_tokens.contains(&token) {
            total += 1;
        }
    }

    total
}

/// Rank published articles related to the one at `slug`
///
/// Unknown or unpublished slugs read as missing. The limit clamps to
/// 1..=10, defaulting from the `ai_recommendation_limit` setting.
pub async fn recommend(
    db: &SqlitePool,
    locale: Locale,
    slug: &str,
    limit: Option<i64>,
) -> Result<Vec<RecommendationCard>> {
    let base: Option<Article> =
        sqlx::query_as("SELECT * FROM articles WHERE slug = ? AND status = 'published'")
            .bind(slug)
            .fetch_optional(db)
            .await?;
    let Some(base) = base else {
        return Err(ApiError::NotFound(
            nashir_common::locale::Message::NotFound.text(locale).to_string(),
        ));
    };

    let default_limit = get_setting_i64(db, "ai_recommendation_limit", 5).await?;
    let limit = limit.unwrap_or(default_limit).clamp(1, MAX_RECOMMENDATIONS) as usize;

    let candidates: Vec<Article> =
        sqlx::query_as("SELECT * FROM articles WHERE status = 'published' AND guid != ?")
            .bind(&base.guid)
            .fetch_all(db)
            .await?;
    let categories: Vec<Category> =
        sqlx::query_as("SELECT * FROM categories").fetch_all(db).await?;

    let mut scored: Vec<(i64, Article)> = candidates
        .into_iter()
        .map(|candidate| (score(&base, &candidate), candidate))
        .collect();
    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.published_at.cmp(&a.1.published_at))
    });

    let cards = scored
        .into_iter()
        .take(limit)
        .map(|(score, article)| {
            let category = categories.iter().find(|c| c.guid == article.category_id);
            RecommendationCard {
                guid: article.guid,
                slug: article.slug,
                title: article.title,
                subtitle: article.subtitle,
                summary: article.summary,
                language: article.language,
                kind: article.kind,
                category_slug: category.map(|c| c.slug.clone()).unwrap_or_default(),
                category_name: category
                    .map(|c| c.name_for(locale).to_string())
                    .unwrap_or_default(),
                hero_image_url: article.hero_image_url,
                published_at: article.published_at,
                score,
            }
        })
        .collect();

    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, category_id: &str, tags: &[&str]) -> Article {
        Article {
            guid: format!("guid-{title}"),
            slug: title.to_lowercase().replace(' ', "-"),
            title: title.to_string(),
            subtitle: None,
            summary: String::new(),
            body: String::new(),
            language: "ar".to_string(),
            kind: "news".to_string(),
            status: "published".to_string(),
            featured: false,
            category_id: category_id.to_string(),
            author_id: "author".to_string(),
            tags: serde_json::to_string(tags).unwrap(),
            hero_image_url: None,
            published_at: Some("2026-02-01T08:00:00+00:00".to_string()),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_title_tokens_drop_short_words_and_dedup() {
        let tokens = title_tokens("Oil up as oil demand UP");
        assert_eq!(tokens, vec!["oil".to_string(), "demand".to_string()]);
    }

    #[test]
    fn test_title_tokens_handle_arabic() {
        let tokens = title_tokens("ارتفاع أسعار النفط في الأسواق");
        assert!(tokens.contains(&"النفط".to_string()));
        assert!(!tokens.contains(&"في".to_string()));
    }

    #[test]
    fn test_same_category_scores_three() {
        let base = article("Base", "cat-1", &[]);
        let other = article("Other", "cat-1", &[]);
        assert_eq!(score(&base, &other), 3);
    }

    #[test]
    fn test_shared_tags_score_two_each_case_insensitive() {
        let base = article("Base", "cat-1", &["Energy", "Oil"]);
        let other = article("Other", "cat-2", &["energy", "OIL", "gas"]);
        assert_eq!(score(&base, &other), 4);
    }

    #[test]
    fn test_title_overlap_scores_one_per_token() {
        let base = article("Oil prices rise sharply", "cat-1", &[]);
        let other = article("Oil prices fall", "cat-2", &[]);
        assert_eq!(score(&base, &other), 2);
    }

    #[test]
    fn test_combined_scoring_adds_up() {
        let base = article("Oil prices rise", "cat-1", &["energy"]);
        let other = article("Oil market report", "cat-1", &["Energy"]);
        // section +3, tag +2, "oil" +1
        assert_eq!(score(&base, &other), 6);
    }
}
