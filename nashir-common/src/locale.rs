//! Reader locale handling
//!
//! The platform is Arabic-first with English and Urdu support. Error
//! messages that reach readers are served in the negotiated locale;
//! log lines stay in English.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ar,
    En,
    Ur,
}

impl Default for Locale {
    fn default() -> Self {
        Locale::Ar
    }
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ar => "ar",
            Locale::En => "en",
            Locale::Ur => "ur",
        }
    }

    /// Match a BCP 47 tag by its primary subtag ("ar-SA" -> Ar)
    pub fn from_tag(tag: &str) -> Option<Locale> {
        let primary = tag.split(['-', '_']).next().unwrap_or(tag);
        match primary.trim().to_ascii_lowercase().as_str() {
            "ar" => Some(Locale::Ar),
            "en" => Some(Locale::En),
            "ur" => Some(Locale::Ur),
            _ => None,
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Locale::Ar | Locale::Ur)
    }
}

impl std::str::FromStr for Locale {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_tag(s).ok_or(())
    }
}

/// Pick a locale from an Accept-Language header value
///
/// Supported languages are ranked by their q-values; unsupported tags
/// are skipped. Absent or unusable headers fall back to Arabic.
pub fn negotiate(header: Option<&str>) -> Locale {
    let Some(header) = header else {
        return Locale::default();
    };

    let mut candidates: Vec<(f32, Locale)> = Vec::new();
    for part in header.split(',') {
        let mut pieces = part.trim().split(';');
        let tag = pieces.next().unwrap_or("").trim();
        let q = pieces
            .find_map(|p| p.trim().strip_prefix("q="))
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(1.0);
        if let Some(locale) = Locale::from_tag(tag) {
            candidates.push((q, locale));
        }
    }

    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.first().map(|(_, l)| *l).unwrap_or_default()
}

/// Reader-facing error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    InvalidCredentials,
    SessionRequired,
    Forbidden,
    NotFound,
    PasswordTooShort,
    PasswordMismatch,
    MessageTooLong,
    ResetTokenInvalid,
    InvalidTag,
    TooManyTags,
    UnknownPreference,
    UnknownCategory,
    AiUnavailable,
    AiKeyMissing,
}

impl Message {
    pub fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Message::InvalidCredentials, Locale::Ar) => {
                "اسم المستخدم أو كلمة المرور غير صحيحة"
            }
            (Message::InvalidCredentials, Locale::En) => "Invalid username or password",
            (Message::InvalidCredentials, Locale::Ur) => "صارف نام یا پاس ورڈ غلط ہے",

            (Message::SessionRequired, Locale::Ar) => "يجب تسجيل الدخول أولاً",
            (Message::SessionRequired, Locale::En) => "Sign in required",
            (Message::SessionRequired, Locale::Ur) => "پہلے سائن ان کریں",

            (Message::Forbidden, Locale::Ar) => "ليست لديك صلاحية لهذا الإجراء",
            (Message::Forbidden, Locale::En) => "You do not have permission for this action",
            (Message::Forbidden, Locale::Ur) => "آپ کو اس کارروائی کی اجازت نہیں ہے",

            (Message::NotFound, Locale::Ar) => "المورد المطلوب غير موجود",
            (Message::NotFound, Locale::En) => "The requested resource was not found",
            (Message::NotFound, Locale::Ur) => "مطلوبہ وسیلہ نہیں ملا",

            (Message::PasswordTooShort, Locale::Ar) => "كلمة المرور قصيرة جداً",
            (Message::PasswordTooShort, Locale::En) => "Password is too short",
            (Message::PasswordTooShort, Locale::Ur) => "پاس ورڈ بہت چھوٹا ہے",

            (Message::PasswordMismatch, Locale::Ar) => "كلمتا المرور غير متطابقتين",
            (Message::PasswordMismatch, Locale::En) => "Passwords do not match",
            (Message::PasswordMismatch, Locale::Ur) => "پاس ورڈ آپس میں مطابقت نہیں رکھتے",

            (Message::MessageTooLong, Locale::Ar) => "الرسالة أطول من الحد المسموح",
            (Message::MessageTooLong, Locale::En) => "Message exceeds the allowed length",
            (Message::MessageTooLong, Locale::Ur) => "پیغام مقررہ حد سے لمبا ہے",

            (Message::ResetTokenInvalid, Locale::Ar) => {
                "رمز الاستعادة غير صالح أو منتهي الصلاحية"
            }
            (Message::ResetTokenInvalid, Locale::En) => "Reset token is invalid or expired",
            (Message::ResetTokenInvalid, Locale::Ur) => "ری سیٹ ٹوکن غلط یا زائد المیعاد ہے",

            (Message::InvalidTag, Locale::Ar) => "وسم غير صالح",
            (Message::InvalidTag, Locale::En) => "Invalid tag",
            (Message::InvalidTag, Locale::Ur) => "غلط ٹیگ",

            (Message::TooManyTags, Locale::Ar) => "عدد الوسوم يتجاوز الحد المسموح",
            (Message::TooManyTags, Locale::En) => "Too many tags",
            (Message::TooManyTags, Locale::Ur) => "ٹیگز کی تعداد حد سے زیادہ ہے",

            (Message::UnknownPreference, Locale::Ar) => "تفضيل غير معروف",
            (Message::UnknownPreference, Locale::En) => "Unknown preference key",
            (Message::UnknownPreference, Locale::Ur) => "نامعلوم ترجیحی کلید",

            (Message::UnknownCategory, Locale::Ar) => "تعذر تحديد تصنيف معروف للمقال",
            (Message::UnknownCategory, Locale::En) => {
                "Could not map the article to a known section"
            }
            (Message::UnknownCategory, Locale::Ur) => {
                "مضمون کے لیے معروف زمرہ متعین نہیں ہو سکا"
            }

            (Message::AiUnavailable, Locale::Ar) => "خدمة المساعد الذكي غير متاحة حالياً",
            (Message::AiUnavailable, Locale::En) => "The AI assistant is currently unavailable",
            (Message::AiUnavailable, Locale::Ur) => "اے آئی معاون فی الحال دستیاب نہیں ہے",

            (Message::AiKeyMissing, Locale::Ar) => "لم يتم ضبط مفتاح خدمة الذكاء الاصطناعي",
            (Message::AiKeyMissing, Locale::En) => "No AI provider key is configured",
            (Message::AiKeyMissing, Locale::Ur) => "اے آئی سروس کی کلید ترتیب نہیں دی گئی",
        }
    }
}
