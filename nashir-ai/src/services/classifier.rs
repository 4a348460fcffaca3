//! LLM-assisted section classification
//!
//! Sends the draft's text plus the live section list to the model and
//! asks for a primary section and up to three secondary suggestions,
//! all named by slug. The model only ever picks from the list; answers
//! naming unknown primary slugs are rejected outright, unknown
//! suggestions are dropped quietly.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use nashir_common::db::models::Category;
use nashir_common::locale::{Locale, Message};

use crate::error::{ApiError, Result};
use crate::providers::{parse_json_answer, CompletionRequest, LlmClient};
use crate::services::{provider_error, truncate_chars};

/// Body text sent to the model is capped at this many chars
const BODY_PROMPT_CHARS: usize = 4000;

/// A section as shown in a classification answer
#[derive(Debug, Clone, Serialize)]
pub struct SectionRef {
    pub guid: String,
    pub slug: String,
    pub name: String,
}

/// Classifier result: one primary section, zero or more suggestions
#[derive(Debug, Serialize)]
pub struct Classification {
    pub primary: SectionRef,
    pub suggested: Vec<SectionRef>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    primary_category: String,
    #[serde(default)]
    suggested_categories: Vec<String>,
}

fn section_ref(category: &Category, locale: Locale) -> SectionRef {
    SectionRef {
        guid: category.guid.clone(),
        slug: category.slug.clone(),
        name: category.name_for(locale).to_string(),
    }
}

fn build_prompt(title: &str, summary: &str, body: &str, categories: &[Category]) -> CompletionRequest {
    let system = "You are a news desk assistant for a bilingual Arabic/English \
                  publication. Classify articles into exactly one primary section \
                  and up to three secondary sections. Answer with pure JSON only: \
                  {\"primary_category\": \"<slug>\", \"suggested_categories\": [\"<slug>\", ...]}. \
                  Use only slugs from the provided list.";

    let mut user = String::from("Sections:\n");
    for category in categories {
        user.push_str(&format!(
            "- {} ({} / {})\n",
            category.slug, category.name_ar, category.name_en
        ));
    }
    user.push_str(&format!("\nTitle: {title}\n"));
    if !summary.is_empty() {
        user.push_str(&format!("Summary: {summary}\n"));
    }
    user.push_str(&format!("\nBody:\n{}\n", truncate_chars(body, BODY_PROMPT_CHARS)));

    CompletionRequest::single(system, user)
}

/// Classify an article draft against the active sections
pub async fn classify(
    db: &SqlitePool,
    client: &LlmClient,
    locale: Locale,
    title: &str,
    summary: &str,
    body: &str,
) -> Result<Classification> {
    let categories: Vec<Category> = sqlx::query_as(
        "SELECT * FROM categories WHERE active = 1 ORDER BY position, slug",
    )
    .fetch_all(db)
    .await?;

    if categories.is_empty() {
        return Err(ApiError::Upstream(
            Message::UnknownCategory.text(locale).to_string(),
        ));
    }

    let request = build_prompt(title, summary, body, &categories);
    let answer = client
        .complete(&request)
        .await
        .map_err(|e| provider_error(e, locale))?;

    let raw: RawClassification =
        parse_json_answer(&answer).map_err(|e| provider_error(e, locale))?;

    let Some(primary) = categories.iter().find(|c| c.slug == raw.primary_category) else {
        info!(slug = %raw.primary_category, "classifier answered with unknown primary section");
        return Err(ApiError::Upstream(
            Message::UnknownCategory.text(locale).to_string(),
        ));
    };

    // Unknown or duplicate suggestions are dropped, the primary never
    // repeats in the suggestion list
    let mut suggested: Vec<SectionRef> = Vec::new();
    for slug in &raw.suggested_categories {
        if slug == &primary.slug || suggested.iter().any(|s| &s.slug == slug) {
            continue;
        }
        if let Some(category) = categories.iter().find(|c| &c.slug == slug) {
            suggested.push(section_ref(category, locale));
        }
    }

    info!(
        primary = %primary.slug,
        suggested = suggested.len(),
        "article classified"
    );

    Ok(Classification {
        primary: section_ref(primary, locale),
        suggested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(slug: &str) -> Category {
        Category {
            guid: format!("guid-{slug}"),
            slug: slug.to_string(),
            name_ar: format!("قسم {slug}"),
            name_en: slug.to_string(),
            description: None,
            position: 10,
            active: true,
        }
    }

    #[test]
    fn test_prompt_lists_every_section_slug() {
        let categories = vec![category("local"), category("sports")];
        let request = build_prompt("عنوان", "", "نص الخبر", &categories);
        let user = &request.messages[0].content;
        assert!(user.contains("- local"));
        assert!(user.contains("- sports"));
        assert!(user.contains("عنوان"));
    }

    #[test]
    fn test_prompt_truncates_long_bodies() {
        let categories = vec![category("local")];
        let body = "x".repeat(BODY_PROMPT_CHARS * 2);
        let request = build_prompt("t", "", &body, &categories);
        assert!(request.messages[0].content.len() < body.len());
    }

    #[test]
    fn test_raw_classification_tolerates_missing_suggestions() {
        let raw: RawClassification =
            serde_json::from_str(r#"{"primary_category": "local"}"#).unwrap();
        assert_eq!(raw.primary_category, "local");
        assert!(raw.suggested_categories.is_empty());
    }
}
