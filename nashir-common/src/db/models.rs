//! Database models shared by more than one service

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting {
    pub key: String,
    pub value: Option<String>,
}

/// A registered account. Roles gate the editorial surface:
/// admin > editor > author > reader.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub guid: String,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub display_name: String,
    pub role: String,
    pub locale: String,
    pub active: bool,
    pub created_at: String,
}

impl User {
    pub fn is_staff(&self) -> bool {
        matches!(self.role.as_str(), "admin" | "editor" | "author")
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Editors and admins may change any article; authors only their own
    pub fn can_edit_any_article(&self) -> bool {
        matches!(self.role.as_str(), "admin" | "editor")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
    pub last_seen_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub guid: String,
    pub slug: String,
    pub name_ar: String,
    pub name_en: String,
    pub description: Option<String>,
    pub position: i64,
    pub active: bool,
}

impl Category {
    /// Section name in the requested locale (Urdu readers get Arabic)
    pub fn name_for(&self, locale: crate::Locale) -> &str {
        match locale {
            crate::Locale::En => &self.name_en,
            _ => &self.name_ar,
        }
    }
}

/// An article row as stored. Tags are a JSON array encoded in TEXT;
/// `published_at` is an RFC 3339 string written at publish time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub summary: String,
    pub body: String,
    pub language: String,
    pub kind: String,
    pub status: String,
    pub featured: bool,
    pub category_id: String,
    pub author_id: String,
    pub tags: String,
    pub hero_image_url: Option<String>,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Article {
    /// Decode the JSON tag list; malformed stored values read as empty
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }

    pub fn is_published(&self) -> bool {
        self.status == "published"
    }
}

/// Encode a tag list for storage
pub fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// A named entity in the editorial dictionary (person, organization,
/// place...). Aliases are a JSON array of alternative spellings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SmartEntity {
    pub guid: String,
    pub name: String,
    pub entity_type: String,
    pub description: Option<String>,
    pub aliases: String,
}

impl SmartEntity {
    pub fn alias_list(&self) -> Vec<String> {
        serde_json::from_str(&self.aliases).unwrap_or_default()
    }
}

/// A glossary term with a reader-facing definition
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SmartTerm {
    pub guid: String,
    pub term: String,
    pub definition: String,
    pub aliases: String,
}

impl SmartTerm {
    pub fn alias_list(&self) -> Vec<String> {
        serde_json::from_str(&self.aliases).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_list_decodes_json_array() {
        let article = Article {
            guid: "g".into(),
            slug: "s".into(),
            title: "t".into(),
            subtitle: None,
            summary: String::new(),
            body: String::new(),
            language: "ar".into(),
            kind: "news".into(),
            status: "draft".into(),
            featured: false,
            category_id: "c".into(),
            author_id: "a".into(),
            tags: r#"["اقتصاد","oil"]"#.into(),
            hero_image_url: None,
            published_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(article.tag_list(), vec!["اقتصاد".to_string(), "oil".to_string()]);
    }

    #[test]
    fn tag_list_tolerates_malformed_storage() {
        let mut article = Article {
            guid: "g".into(),
            slug: "s".into(),
            title: "t".into(),
            subtitle: None,
            summary: String::new(),
            body: String::new(),
            language: "ar".into(),
            kind: "news".into(),
            status: "draft".into(),
            featured: false,
            category_id: "c".into(),
            author_id: "a".into(),
            tags: "not json".into(),
            hero_image_url: None,
            published_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(article.tag_list().is_empty());
        article.tags = encode_tags(&["x".to_string()]);
        assert_eq!(article.tag_list(), vec!["x".to_string()]);
    }

    #[test]
    fn role_checks() {
        let mut user = User {
            guid: "g".into(),
            username: "u".into(),
            email: None,
            password_hash: String::new(),
            password_salt: String::new(),
            display_name: String::new(),
            role: "author".into(),
            locale: "ar".into(),
            active: true,
            created_at: String::new(),
        };
        assert!(user.is_staff());
        assert!(!user.can_edit_any_article());
        user.role = "editor".into();
        assert!(user.can_edit_any_article());
        user.role = "reader".into();
        assert!(!user.is_staff());
    }
}
