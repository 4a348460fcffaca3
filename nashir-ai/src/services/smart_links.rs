//! Smart-link extraction
//!
//! The model reads the article body and lists the named entities and
//! technical terms it sees. Those candidate mentions are then matched
//! against the editorial dictionary on the server: exact name first,
//! then trimmed case-insensitive, then Jaro-Winkler similarity on the
//! normalized forms. Matches come back with a context snippet around
//! the first occurrence in the body; candidates with no dictionary hit
//! are reported as plain strings and never written anywhere.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use nashir_common::config::get_setting_i64;
use nashir_common::db::models::{SmartEntity, SmartTerm};
use nashir_common::locale::Locale;

use crate::error::Result;
use crate::providers::{parse_json_answer, CompletionRequest, LlmClient};
use crate::services::{provider_error, truncate_chars};

/// Minimum Jaro-Winkler similarity for a fuzzy dictionary hit
const SIMILARITY_THRESHOLD: f64 = 0.92;
const BODY_PROMPT_CHARS: usize = 6000;

#[derive(Debug, Deserialize)]
struct RawMentions {
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    terms: Vec<String>,
}

/// A dictionary entity as shown in a smart-link report
#[derive(Debug, Serialize)]
pub struct EntityRef {
    pub guid: String,
    pub name: String,
    pub entity_type: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
}

/// A glossary term as shown in a smart-link report
#[derive(Debug, Serialize)]
pub struct TermRef {
    pub guid: String,
    pub term: String,
    pub definition: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EntityLink {
    /// The mention as the model reported it
    pub text: String,
    pub entity: EntityRef,
    /// Snippet around the first occurrence; absent when the mention
    /// does not literally appear in the body
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TermLink {
    pub text: String,
    pub term: TermRef,
    pub context: Option<String>,
}

/// Full smart-link report for one article body
#[derive(Debug, Serialize)]
pub struct SmartLinkReport {
    pub entities: Vec<EntityLink>,
    pub terms: Vec<TermLink>,
    pub new_entities: Vec<String>,
    pub new_terms: Vec<String>,
}

/// Lowercase per char, keeping char indices stable for snippets
fn lower_chars(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// Char index of the first case-insensitive occurrence of `needle`
fn find_mention(body_lower: &[char], needle: &str) -> Option<(usize, usize)> {
    let needle_lower = lower_chars(needle.trim());
    if needle_lower.is_empty() || needle_lower.len() > body_lower.len() {
        return None;
    }
    body_lower
        .windows(needle_lower.len())
        .position(|window| window == needle_lower.as_slice())
        .map(|start| (start, needle_lower.len()))
}

/// Snippet of `window` chars either side of the mention, aligned to
/// char boundaries by construction
fn context_snippet(body_chars: &[char], start: usize, len: usize, window: usize) -> String {
    let from = start.saturating_sub(window);
    let to = (start + len + window).min(body_chars.len());
    body_chars[from..to].iter().collect()
}

/// True when a candidate mention names this dictionary form
fn name_matches(candidate: &str, name: &str) -> bool {
    if candidate == name {
        return true;
    }
    let candidate_norm = candidate.trim().to_lowercase();
    let name_norm = name.trim().to_lowercase();
    if candidate_norm == name_norm {
        return true;
    }
    strsim::jaro_winkler(&candidate_norm, &name_norm) >= SIMILARITY_THRESHOLD
}

fn match_entity<'a>(candidate: &str, entities: &'a [SmartEntity]) -> Option<&'a SmartEntity> {
    entities.iter().find(|entity| {
        name_matches(candidate, &entity.name)
            || entity.alias_list().iter().any(|alias| name_matches(candidate, alias))
    })
}

fn match_term<'a>(candidate: &str, terms: &'a [SmartTerm]) -> Option<&'a SmartTerm> {
    terms.iter().find(|term| {
        name_matches(candidate, &term.term)
            || term.alias_list().iter().any(|alias| name_matches(candidate, alias))
    })
}

fn dedup_candidates(candidates: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for candidate in candidates {
        let candidate = candidate.trim().to_string();
        if candidate.is_empty() {
            continue;
        }
        let key = candidate.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(candidate);
    }
    out
}

fn build_prompt(body: &str) -> CompletionRequest {
    let system = "You extract linkable references from news articles written in \
                  Arabic or English. List named entities (people, organizations, \
                  places, events) and technical or jargon terms exactly as they \
                  appear in the text. Answer with pure JSON only: \
                  {\"entities\": [\"...\"], \"terms\": [\"...\"]}. \
                  At most 10 of each.";
    CompletionRequest::single(system, truncate_chars(body, BODY_PROMPT_CHARS).to_string())
}

/// Extract mentions from a body and match them against the dictionary
pub async fn analyze(
    db: &SqlitePool,
    client: &LlmClient,
    locale: Locale,
    body: &str,
) -> Result<SmartLinkReport> {
    let entities: Vec<SmartEntity> =
        sqlx::query_as("SELECT * FROM smart_entities ORDER BY name").fetch_all(db).await?;
    let terms: Vec<SmartTerm> =
        sqlx::query_as("SELECT * FROM smart_terms ORDER BY term").fetch_all(db).await?;
    let window = get_setting_i64(db, "ai_context_window_chars", 80).await?.max(0) as usize;

    let answer = client
        .complete(&build_prompt(body))
        .await
        .map_err(|e| provider_error(e, locale))?;
    let raw: RawMentions = parse_json_answer(&answer).map_err(|e| provider_error(e, locale))?;

    let body_chars: Vec<char> = body.chars().collect();
    let body_lower = lower_chars(body);

    let mut report = SmartLinkReport {
        entities: Vec::new(),
        terms: Vec::new(),
        new_entities: Vec::new(),
        new_terms: Vec::new(),
    };

    for candidate in dedup_candidates(raw.entities) {
        match match_entity(&candidate, &entities) {
            Some(entity) => {
                // One link per dictionary record even when the model
                // reports the same entity under two spellings
                if report.entities.iter().any(|l| l.entity.guid == entity.guid) {
                    continue;
                }
                let context = find_mention(&body_lower, &candidate)
                    .map(|(start, len)| context_snippet(&body_chars, start, len, window));
                report.entities.push(EntityLink {
                    text: candidate,
                    entity: EntityRef {
                        guid: entity.guid.clone(),
                        name: entity.name.clone(),
                        entity_type: entity.entity_type.clone(),
                        description: entity.description.clone(),
                        aliases: entity.alias_list(),
                    },
                    context,
                });
            }
            None => report.new_entities.push(candidate),
        }
    }

    for candidate in dedup_candidates(raw.terms) {
        match match_term(&candidate, &terms) {
            Some(term) => {
                if report.terms.iter().any(|l| l.term.guid == term.guid) {
                    continue;
                }
                let context = find_mention(&body_lower, &candidate)
                    .map(|(start, len)| context_snippet(&body_chars, start, len, window));
                report.terms.push(TermLink {
                    text: candidate,
                    term: TermRef {
                        guid: term.guid.clone(),
                        term: term.term.clone(),
                        definition: term.definition.clone(),
                        aliases: term.alias_list(),
                    },
                    context,
                });
            }
            None => report.new_terms.push(candidate),
        }
    }

    info!(
        entities = report.entities.len(),
        terms = report.terms.len(),
        new_entities = report.new_entities.len(),
        new_terms = report.new_terms.len(),
        "smart links extracted"
    );
    Ok(report)
}
