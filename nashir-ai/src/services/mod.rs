//! Assistant services
//!
//! Each submodule owns one assistant capability. The LLM-backed ones
//! (classifier, headlines, smart links) build prompts and validate
//! model answers; the deterministic ones (recommender, read aloud,
//! voice) never leave the process.

pub mod classifier;
pub mod headlines;
pub mod read_aloud;
pub mod recommender;
pub mod smart_links;
pub mod voice;

use tracing::warn;

use nashir_common::locale::{Locale, Message};

use crate::error::ApiError;
use crate::providers::ProviderError;

/// Map a provider failure to the localized 502 the reader sees
///
/// The provider detail goes to the log only; clients get a stable
/// translated message.
pub(crate) fn provider_error(err: ProviderError, locale: Locale) -> ApiError {
    if err.is_missing_key() {
        warn!("LLM request refused: {err}");
        ApiError::Upstream(Message::AiKeyMissing.text(locale).to_string())
    } else {
        warn!("LLM request failed: {err}");
        ApiError::Upstream(Message::AiUnavailable.text(locale).to_string())
    }
}

/// Truncate to a character count without splitting a code point
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
