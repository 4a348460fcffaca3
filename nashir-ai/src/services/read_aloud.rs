//! Read-aloud chunking for the on-page narrator
//!
//! Browser speech synthesis stalls on long utterances, so article text
//! is cut into chunks the client queues one at a time. Cuts happen at
//! sentence boundaries (Arabic and Latin terminators plus newlines);
//! a sentence longer than the limit falls back to word boundaries.
//!
//! Whitespace is normalized to single spaces first. After that the
//! chunking is lossless: joining the chunks with single spaces gives
//! back the normalized text, except when a single word exceeds the
//! limit and has to be split outright.

use serde::Serialize;
use sqlx::SqlitePool;

use nashir_common::config::get_setting_i64;
use nashir_common::db::models::Article;
use nashir_common::locale::{Locale, Message};

use crate::error::{ApiError, Result};

/// Sentence-ending marks for Arabic and Latin scripts
const TERMINATORS: [char; 6] = ['.', '!', '?', '؟', '۔', '…'];

/// One utterance for the client speech queue
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Chunked plan for one read-aloud request
#[derive(Debug, Serialize)]
pub struct ReadAloudPlan {
    pub chunks: Vec<Chunk>,
    pub total_chars: usize,
}

/// Split a whitespace-normalized line into sentences
///
/// A terminator run only ends a sentence when followed by whitespace
/// or the end of the line, so decimals and abbreviations stay whole.
fn split_sentences(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        if !TERMINATORS.contains(&chars[i]) {
            i += 1;
            continue;
        }
        let mut end = i + 1;
        while end < chars.len() && TERMINATORS.contains(&chars[end]) {
            end += 1;
        }
        if end < chars.len() && !chars[end].is_whitespace() {
            i = end;
            continue;
        }
        let sentence: String = chars[start..end].iter().collect();
        let sentence = sentence.trim().to_string();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        let mut next = end;
        while next < chars.len() && chars[next].is_whitespace() {
            next += 1;
        }
        start = next;
        i = next;
    }
    if start < chars.len() {
        let tail: String = chars[start..].iter().collect();
        let tail = tail.trim().to_string();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }
    sentences
}

/// Break an oversized sentence at word boundaries
fn split_long_sentence(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let word_chars: Vec<char> = word.chars().collect();
            for piece in word_chars.chunks(max_chars) {
                pieces.push(piece.iter().collect());
            }
            continue;
        }
        if current.is_empty() {
            current = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            pieces.push(std::mem::take(&mut current));
            current = word.to_string();
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Chunk text for sequential speech playback
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);

    let mut units: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let normalized = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            continue;
        }
        for sentence in split_sentences(&normalized) {
            if sentence.chars().count() > max_chars {
                units.extend(split_long_sentence(&sentence, max_chars));
            } else {
                units.push(sentence);
            }
        }
    }

    let mut texts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for unit in units {
        let unit_len = unit.chars().count();
        if current.is_empty() {
            current = unit;
            current_len = unit_len;
        } else if current_len + 1 + unit_len <= max_chars {
            current.push(' ');
            current.push_str(&unit);
            current_len += 1 + unit_len;
        } else {
            texts.push(std::mem::take(&mut current));
            current = unit;
            current_len = unit_len;
        }
    }
    if !current.is_empty() {
        texts.push(current);
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect()
}

/// Build a plan using the configured chunk size
pub async fn plan(db: &SqlitePool, text: &str) -> Result<ReadAloudPlan> {
    let max_chars = get_setting_i64(db, "read_aloud_max_chars", 280).await?.max(1) as usize;
    let chunks = chunk_text(text, max_chars);
    let total_chars = chunks.iter().map(|c| c.text.chars().count()).sum();
    Ok(ReadAloudPlan { chunks, total_chars })
}

/// Spoken text for a published article: title, summary, then body
///
/// The newline joins keep each part on its own chunk boundary.
pub async fn article_text(db: &SqlitePool, locale: Locale, slug: &str) -> Result<String> {
    let article: Option<Article> =
        sqlx::query_as("SELECT * FROM articles WHERE slug = ? AND status = 'published'")
            .bind(slug)
            .fetch_optional(db)
            .await?;
    let Some(article) = article else {
        return Err(ApiError::NotFound(Message::NotFound.text(locale).to_string()));
    };
    let parts = [article.title, article.summary, article.body];
    Ok(parts
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_text("", 280).is_empty());
        assert!(chunk_text("   \n\n  ", 280).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("خبر عاجل من العاصمة.", 280);
        assert_eq!(texts(&chunks), vec!["خبر عاجل من العاصمة."]);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_sentences_pack_greedily() {
        let chunks = chunk_text("One two. Three four. Five six.", 22);
        // "One two. Three four." is 20 chars; adding " Five six." overflows
        assert_eq!(texts(&chunks), vec!["One two. Three four.", "Five six."]);
    }

    #[test]
    fn test_arabic_terminators_split() {
        let chunks = chunk_text("ماذا حدث؟ انتهى الأمر۔ تابعونا…", 12);
        assert_eq!(texts(&chunks), vec!["ماذا حدث؟", "انتهى الأمر۔", "تابعونا…"]);
    }

    #[test]
    fn test_terminator_runs_stay_attached() {
        let chunks = chunk_text("Really?! Yes.", 9);
        assert_eq!(texts(&chunks), vec!["Really?!", "Yes."]);
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        let chunks = chunk_text("النمو بلغ 3.5 بالمئة. وتستمر الزيادة.", 25);
        assert_eq!(chunks[0].text, "النمو بلغ 3.5 بالمئة.");
    }

    #[test]
    fn test_newline_acts_as_boundary() {
        let chunks = chunk_text("سطر أول بلا نقطة\nسطر ثان", 12);
        assert_eq!(texts(&chunks), vec!["سطر أول بلا", "نقطة سطر ثان"]);
    }

    #[test]
    fn test_newline_keeps_sentences_apart_when_oversized() {
        let chunks = chunk_text("first line without stop\nsecond line", 23);
        assert_eq!(chunks[0].text, "first line without stop");
    }

    #[test]
    fn test_long_sentence_splits_at_word_boundaries() {
        let chunks = chunk_text("كلمة أخرى كلمة أخرى كلمة أخرى كلمة أخرى", 10);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 10);
            assert!(!chunk.text.starts_with(' '));
            assert!(!chunk.text.ends_with(' '));
        }
    }

    #[test]
    fn test_giant_word_hard_splits() {
        let word = "ا".repeat(25);
        let chunks = chunk_text(&word, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.chars().count(), 10);
        assert_eq!(chunks[2].text.chars().count(), 5);
    }

    #[test]
    fn test_indices_are_sequential_from_zero() {
        let chunks = chunk_text("One. Two. Three. Four. Five.", 6);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_join_reproduces_normalized_text() {
        let text = "خبر  عاجل.\nتفاصيل   أكثر لاحقاً؟ نعم.";
        let chunks = chunk_text(text, 16);
        let joined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, "خبر عاجل. تفاصيل أكثر لاحقاً؟ نعم.");
    }

    #[test]
    fn test_whitespace_collapses_inside_chunks() {
        let chunks = chunk_text("كلمة\t\tأخرى.", 280);
        assert_eq!(chunks[0].text, "كلمة أخرى.");
    }
}
