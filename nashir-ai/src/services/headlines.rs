//! Headline generation and A/B comparison

use serde::{Deserialize, Serialize};
use tracing::info;

use nashir_common::locale::Locale;

use crate::error::Result;
use crate::providers::{parse_json_answer, CompletionRequest, LlmClient};
use crate::services::{provider_error, truncate_chars};

const MAX_HEADLINES: i64 = 5;
const DEFAULT_HEADLINES: i64 = 3;
const BODY_PROMPT_CHARS: usize = 3000;

#[derive(Debug, Deserialize)]
struct RawHeadlines {
    headlines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawComparison {
    winner: String,
    scores: RawScores,
    #[serde(default)]
    rationale: String,
}

#[derive(Debug, Deserialize)]
struct RawScores {
    a: i64,
    b: i64,
}

/// Verdict of a headline A/B comparison
#[derive(Debug, Serialize)]
pub struct Comparison {
    pub winner: String,
    pub scores: ComparisonScores,
    pub rationale: String,
}

#[derive(Debug, Serialize)]
pub struct ComparisonScores {
    pub a: i64,
    pub b: i64,
}

/// Clamp a requested headline count into the supported range
pub fn clamp_count(count: Option<i64>) -> i64 {
    count.unwrap_or(DEFAULT_HEADLINES).clamp(1, MAX_HEADLINES)
}

/// Generate alternative headlines for a draft
pub async fn generate(
    client: &LlmClient,
    locale: Locale,
    title: &str,
    summary: &str,
    body: &str,
    count: Option<i64>,
) -> Result<Vec<String>> {
    let count = clamp_count(count);
    let system = format!(
        "You are a headline editor for a bilingual Arabic/English news site. \
         Write {count} alternative headlines in the same language as the article. \
         Keep them under 90 characters, factual, no clickbait. \
         Answer with pure JSON only: {{\"headlines\": [\"...\"]}}"
    );
    let mut user = format!("Current title: {title}\n");
    if !summary.is_empty() {
        user.push_str(&format!("Summary: {summary}\n"));
    }
    user.push_str(&format!("\nBody:\n{}\n", truncate_chars(body, BODY_PROMPT_CHARS)));

    let answer = client
        .complete(&CompletionRequest::single(system, user))
        .await
        .map_err(|e| provider_error(e, locale))?;

    let raw: RawHeadlines = parse_json_answer(&answer).map_err(|e| provider_error(e, locale))?;

    let headlines: Vec<String> = raw
        .headlines
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .take(count as usize)
        .collect();

    if headlines.is_empty() {
        return Err(provider_error(
            crate::providers::ProviderError::Parse("empty headline list".to_string()),
            locale,
        ));
    }

    info!(count = headlines.len(), "headlines generated");
    Ok(headlines)
}

/// Compare two headline candidates and pick a winner
pub async fn compare(
    client: &LlmClient,
    locale: Locale,
    a: &str,
    b: &str,
    context: &str,
) -> Result<Comparison> {
    let system = "You are a headline editor judging an A/B test for a news site. \
                  Score each candidate 0-100 for clarity, accuracy and pull, then \
                  pick the better one. Answer with pure JSON only: \
                  {\"winner\": \"a\"|\"b\", \"scores\": {\"a\": 0, \"b\": 0}, \"rationale\": \"...\"}";
    let mut user = format!("Candidate a: {a}\nCandidate b: {b}\n");
    if !context.is_empty() {
        user.push_str(&format!(
            "\nArticle context:\n{}\n",
            truncate_chars(context, BODY_PROMPT_CHARS)
        ));
    }

    let answer = client
        .complete(&CompletionRequest::single(system, user))
        .await
        .map_err(|e| provider_error(e, locale))?;

    let raw: RawComparison = parse_json_answer(&answer).map_err(|e| provider_error(e, locale))?;

    if raw.winner != "a" && raw.winner != "b" {
        return Err(provider_error(
            crate::providers::ProviderError::Parse(format!("invalid winner: {}", raw.winner)),
            locale,
        ));
    }

    info!(winner = %raw.winner, "headline comparison decided");
    Ok(Comparison {
        winner: raw.winner,
        scores: ComparisonScores {
            a: raw.scores.a.clamp(0, 100),
            b: raw.scores.b.clamp(0, 100),
        },
        rationale: raw.rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_count_bounds() {
        assert_eq!(clamp_count(None), 3);
        assert_eq!(clamp_count(Some(0)), 1);
        assert_eq!(clamp_count(Some(12)), 5);
        assert_eq!(clamp_count(Some(4)), 4);
    }

    #[test]
    fn test_raw_comparison_parses() {
        let raw: RawComparison = serde_json::from_str(
            r#"{"winner": "b", "scores": {"a": 61, "b": 78}, "rationale": "tighter"}"#,
        )
        .unwrap();
        assert_eq!(raw.winner, "b");
        assert_eq!(raw.scores.b, 78);
    }

    #[test]
    fn test_raw_comparison_rationale_optional() {
        let raw: RawComparison =
            serde_json::from_str(r#"{"winner": "a", "scores": {"a": 9, "b": 1}}"#).unwrap();
        assert!(raw.rationale.is_empty());
    }
}
