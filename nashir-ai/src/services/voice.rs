//! Voice command matching
//!
//! Speech recognition output is noisy, so matching is deliberately
//! loose: the transcript is normalized (Arabic diacritics and tatweel
//! stripped, case folded, whitespace collapsed) and checked for
//! registered phrases by substring containment. When several phrases
//! hit, the longest one wins so "اقرأ المقال" beats a bare "اقرأ".

/// A registered spoken command
pub struct VoiceCommand {
    pub name: &'static str,
    /// Client-side effect: `navigate:<path>`, `tts:<verb>` or `step:<dir>`
    pub action: &'static str,
    pub phrases: &'static [&'static str],
}

/// The command a transcript resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceMatch {
    pub command: &'static str,
    pub action: &'static str,
    /// The registered phrase that matched, as listed
    pub phrase: &'static str,
}

pub const COMMANDS: &[VoiceCommand] = &[
    VoiceCommand {
        name: "open_home",
        action: "navigate:/",
        phrases: &["الصفحة الرئيسية", "الرئيسية", "home page", "go home", "home"],
    },
    VoiceCommand {
        name: "open_latest",
        action: "navigate:/latest",
        phrases: &["آخر الأخبار", "أحدث الأخبار", "latest news", "latest"],
    },
    VoiceCommand {
        name: "open_lite",
        action: "navigate:/lite",
        phrases: &["الموجز السريع", "الأخبار السريعة", "الموجز", "lite feed", "quick news", "lite"],
    },
    VoiceCommand {
        name: "open_categories",
        action: "navigate:/categories",
        phrases: &["الأقسام", "التصنيفات", "categories", "sections"],
    },
    VoiceCommand {
        name: "open_search",
        action: "navigate:/search",
        phrases: &["ابحث عن", "ابحث", "بحث", "search for", "search"],
    },
    VoiceCommand {
        name: "read_article",
        action: "tts:read",
        phrases: &["اقرأ المقال", "اقرأ لي", "اقرأ", "read the article", "read aloud", "read"],
    },
    VoiceCommand {
        name: "stop_reading",
        action: "tts:stop",
        phrases: &["توقف عن القراءة", "توقف", "قف", "stop reading", "stop"],
    },
    VoiceCommand {
        name: "next_item",
        action: "step:next",
        phrases: &["الخبر التالي", "التالي", "next story", "next"],
    },
    VoiceCommand {
        name: "previous_item",
        action: "step:previous",
        phrases: &["الخبر السابق", "السابق", "previous story", "previous", "go back"],
    },
];

/// Chars removed before matching: Arabic diacritics and tatweel
fn is_stripped_mark(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}')
}

/// Normalize a transcript or phrase for comparison
pub fn normalize(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| !is_stripped_mark(*c)).collect();
    cleaned
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve a transcript to a command, longest matching phrase first
pub fn match_command(transcript: &str) -> Option<VoiceMatch> {
    let normalized = normalize(transcript);
    if normalized.is_empty() {
        return None;
    }

    let mut best: Option<(usize, VoiceMatch)> = None;
    for command in COMMANDS {
        for phrase in command.phrases {
            let phrase_norm = normalize(phrase);
            if !normalized.contains(&phrase_norm) {
                continue;
            }
            let length = phrase_norm.chars().count();
            let better = best.as_ref().map_or(true, |(current, _)| length > *current);
            if better {
                best = Some((
                    length,
                    VoiceMatch {
                        command: command.name,
                        action: command.action,
                        phrase,
                    },
                ));
            }
        }
    }
    best.map(|(_, matched)| matched)
}
