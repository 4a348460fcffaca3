//! Article tag validation
//!
//! Tags are free-form strings entered by authors. Rules:
//! - whitespace trimmed, empty entries rejected
//! - case-insensitive duplicates dropped, first occurrence's casing kept
//! - at most `max_tags` entries after dedup

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// A tag was empty after trimming
    Empty,
    /// More distinct tags than the configured limit
    TooMany { limit: usize },
}

/// Validate and normalize an incoming tag list
pub fn normalize_tags(raw: &[String], max_tags: usize) -> Result<Vec<String>, TagError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut tags: Vec<String> = Vec::new();

    for tag in raw {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(TagError::Empty);
        }

        // Arabic has no letter case; lowercasing only affects Latin tags
        let folded = trimmed.to_lowercase();
        if seen.insert(folded) {
            tags.push(trimmed.to_string());
        }
    }

    if tags.len() > max_tags {
        return Err(TagError::TooMany { limit: max_tags });
    }

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tags_trimmed_and_kept_in_order() {
        let tags = normalize_tags(&strings(&[" اقتصاد ", "Oil", "نفط"]), 10).unwrap();
        assert_eq!(tags, vec!["اقتصاد", "Oil", "نفط"]);
    }

    #[test]
    fn test_case_insensitive_dedup_keeps_first_casing() {
        let tags = normalize_tags(&strings(&["Energy", "energy", "ENERGY", "oil"]), 10).unwrap();
        assert_eq!(tags, vec!["Energy", "oil"]);
    }

    #[test]
    fn test_arabic_duplicates_dropped() {
        let tags = normalize_tags(&strings(&["رياضة", "رياضة"]), 10).unwrap();
        assert_eq!(tags, vec!["رياضة"]);
    }

    #[test]
    fn test_empty_tag_rejected() {
        assert_eq!(normalize_tags(&strings(&["ok", "  "]), 10), Err(TagError::Empty));
    }

    #[test]
    fn test_limit_enforced_after_dedup() {
        // Three distinct entries collapse to two, which fits the limit
        let tags = normalize_tags(&strings(&["a", "A", "b"]), 2).unwrap();
        assert_eq!(tags.len(), 2);

        let err = normalize_tags(&strings(&["a", "b", "c"]), 2);
        assert_eq!(err, Err(TagError::TooMany { limit: 2 }));
    }
}
