//! URL slug derivation
//!
//! Slugs keep Unicode letters and digits so Arabic titles remain readable
//! in links. Runs of whitespace and punctuation collapse to single hyphens.

/// Derive a slug from an article title
///
/// Returns "article" when nothing usable remains so callers always get a
/// non-empty base to uniquify against.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;

    for ch in title.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}
