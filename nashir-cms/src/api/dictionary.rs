//! Editorial dictionary
//!
//! Smart entities (people, organizations, places) and smart terms
//! (jargon with definitions) that drive smart-link extraction in the
//! AI service. Staff maintain both; names and terms are unique and
//! aliases are JSON string arrays.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use nashir_common::db::models::{encode_tags, SmartEntity, SmartTerm};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::session::{not_found, request_locale, require_staff, CurrentUser};
use crate::error::{ApiError, Result};
use crate::AppState;

fn valid_entity_type(entity_type: &str) -> bool {
    matches!(
        entity_type,
        "person" | "organization" | "place" | "event" | "other"
    )
}

fn clean_aliases(raw: &[String]) -> Vec<String> {
    let mut aliases: Vec<String> = Vec::new();
    for alias in raw {
        let trimmed = alias.trim();
        if !trimmed.is_empty() && !aliases.iter().any(|a| a == trimmed) {
            aliases.push(trimmed.to_string());
        }
    }
    aliases
}

// ========================================
// Smart Entities
// ========================================

/// GET /api/smart/entities (staff)
pub async fn list_entities(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Json<Vec<SmartEntity>>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let entities =
        sqlx::query_as::<_, SmartEntity>("SELECT * FROM smart_entities ORDER BY name")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(entities))
}

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub name: String,
    pub entity_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// POST /api/smart/entities (staff)
pub async fn create_entity(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateEntityRequest>,
) -> Result<Json<SmartEntity>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let entity_type = req.entity_type.unwrap_or_else(|| "other".to_string());
    if !valid_entity_type(&entity_type) {
        return Err(ApiError::BadRequest(format!("invalid entity_type: {}", entity_type)));
    }

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM smart_entities WHERE name = ?")
        .bind(name)
        .fetch_one(&state.db)
        .await?;
    if taken > 0 {
        return Err(ApiError::Conflict(format!("entity already exists: {}", name)));
    }

    let guid = Uuid::new_v4().to_string();
    let aliases = encode_tags(&clean_aliases(&req.aliases));
    sqlx::query(
        r#"
        INSERT INTO smart_entities (guid, name, entity_type, description, aliases)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(name)
    .bind(&entity_type)
    .bind(&req.description)
    .bind(&aliases)
    .execute(&state.db)
    .await?;

    let entity = sqlx::query_as::<_, SmartEntity>("SELECT * FROM smart_entities WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(entity))
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntityRequest {
    pub name: Option<String>,
    pub entity_type: Option<String>,
    pub description: Option<String>,
    pub aliases: Option<Vec<String>>,
}

/// PUT /api/smart/entities/:id (staff)
pub async fn update_entity(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateEntityRequest>,
) -> Result<Json<SmartEntity>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let existing = sqlx::query_as::<_, SmartEntity>("SELECT * FROM smart_entities WHERE guid = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let name = req.name.unwrap_or(existing.name);
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let entity_type = req.entity_type.unwrap_or(existing.entity_type);
    if !valid_entity_type(&entity_type) {
        return Err(ApiError::BadRequest(format!("invalid entity_type: {}", entity_type)));
    }

    // Renaming onto another entity's name is a conflict
    let clash: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM smart_entities WHERE name = ? AND guid != ?")
            .bind(&name)
            .bind(&id)
            .fetch_one(&state.db)
            .await?;
    if clash > 0 {
        return Err(ApiError::Conflict(format!("entity already exists: {}", name)));
    }

    let aliases = match req.aliases {
        Some(raw) => encode_tags(&clean_aliases(&raw)),
        None => existing.aliases,
    };

    sqlx::query(
        r#"
        UPDATE smart_entities
        SET name = ?, entity_type = ?, description = ?, aliases = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&name)
    .bind(&entity_type)
    .bind(req.description.or(existing.description))
    .bind(&aliases)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let entity = sqlx::query_as::<_, SmartEntity>("SELECT * FROM smart_entities WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(entity))
}

/// DELETE /api/smart/entities/:id (staff)
pub async fn delete_entity(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let result = sqlx::query("DELETE FROM smart_entities WHERE guid = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(locale));
    }
    Ok(Json(json!({ "status": "deleted" })))
}

// ========================================
// Smart Terms
// ========================================

/// GET /api/smart/terms (staff)
pub async fn list_terms(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Json<Vec<SmartTerm>>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let terms = sqlx::query_as::<_, SmartTerm>("SELECT * FROM smart_terms ORDER BY term")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(terms))
}

#[derive(Debug, Deserialize)]
pub struct CreateTermRequest {
    pub term: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// POST /api/smart/terms (staff)
pub async fn create_term(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateTermRequest>,
) -> Result<Json<SmartTerm>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let term = req.term.trim();
    if term.is_empty() {
        return Err(ApiError::BadRequest("term is required".to_string()));
    }

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM smart_terms WHERE term = ?")
        .bind(term)
        .fetch_one(&state.db)
        .await?;
    if taken > 0 {
        return Err(ApiError::Conflict(format!("term already exists: {}", term)));
    }

    let guid = Uuid::new_v4().to_string();
    let aliases = encode_tags(&clean_aliases(&req.aliases));
    sqlx::query(
        "INSERT INTO smart_terms (guid, term, definition, aliases) VALUES (?, ?, ?, ?)",
    )
    .bind(&guid)
    .bind(term)
    .bind(&req.definition)
    .bind(&aliases)
    .execute(&state.db)
    .await?;

    let created = sqlx::query_as::<_, SmartTerm>("SELECT * FROM smart_terms WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTermRequest {
    pub term: Option<String>,
    pub definition: Option<String>,
    pub aliases: Option<Vec<String>>,
}

/// PUT /api/smart/terms/:id (staff)
pub async fn update_term(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateTermRequest>,
) -> Result<Json<SmartTerm>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let existing = sqlx::query_as::<_, SmartTerm>("SELECT * FROM smart_terms WHERE guid = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let term = req.term.unwrap_or(existing.term);
    let term = term.trim().to_string();
    if term.is_empty() {
        return Err(ApiError::BadRequest("term is required".to_string()));
    }

    let clash: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM smart_terms WHERE term = ? AND guid != ?")
            .bind(&term)
            .bind(&id)
            .fetch_one(&state.db)
            .await?;
    if clash > 0 {
        return Err(ApiError::Conflict(format!("term already exists: {}", term)));
    }

    let aliases = match req.aliases {
        Some(raw) => encode_tags(&clean_aliases(&raw)),
        None => existing.aliases,
    };

    sqlx::query(
        r#"
        UPDATE smart_terms
        SET term = ?, definition = ?, aliases = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&term)
    .bind(req.definition.unwrap_or(existing.definition))
    .bind(&aliases)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let updated = sqlx::query_as::<_, SmartTerm>("SELECT * FROM smart_terms WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(updated))
}

/// DELETE /api/smart/terms/:id (staff)
pub async fn delete_term(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let result = sqlx::query("DELETE FROM smart_terms WHERE guid = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(locale));
    }
    Ok(Json(json!({ "status": "deleted" })))
}
