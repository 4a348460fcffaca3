//! Category endpoints
//!
//! Public listing of active sections plus admin CRUD. A category with
//! articles attached cannot be deleted.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use nashir_common::db::models::Category;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::session::{not_found, request_locale, require_admin, CurrentUser};
use crate::error::{ApiError, Result};
use crate::slug::slugify;
use crate::AppState;

/// GET /api/categories
///
/// Active categories in display order.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE active = 1 ORDER BY position, slug",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub slug: Option<String>,
    pub name_ar: String,
    pub name_en: String,
    pub description: Option<String>,
    pub position: Option<i64>,
}

/// POST /api/categories (admin)
pub async fn create_category(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<Category>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    if req.name_ar.trim().is_empty() || req.name_en.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "name_ar and name_en are required".to_string(),
        ));
    }

    let slug = slugify(req.slug.as_deref().unwrap_or(&req.name_en));
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE slug = ?")
        .bind(&slug)
        .fetch_one(&state.db)
        .await?;
    if taken > 0 {
        return Err(ApiError::Conflict(format!("category slug already exists: {}", slug)));
    }

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO categories (guid, slug, name_ar, name_en, description, position)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&slug)
    .bind(req.name_ar.trim())
    .bind(req.name_en.trim())
    .bind(&req.description)
    .bind(req.position.unwrap_or(100))
    .execute(&state.db)
    .await?;

    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(category))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub description: Option<String>,
    pub position: Option<i64>,
    pub active: Option<bool>,
}

/// PUT /api/categories/:id (admin)
pub async fn update_category(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let existing = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE guid = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let name_ar = req.name_ar.unwrap_or(existing.name_ar);
    let name_en = req.name_en.unwrap_or(existing.name_en);
    if name_ar.trim().is_empty() || name_en.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "name_ar and name_en are required".to_string(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE categories
        SET name_ar = ?, name_en = ?, description = ?, position = ?, active = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(name_ar.trim())
    .bind(name_en.trim())
    .bind(req.description.or(existing.description))
    .bind(req.position.unwrap_or(existing.position))
    .bind(req.active.unwrap_or(existing.active))
    .bind(&id)
    .execute(&state.db)
    .await?;

    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE guid = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(category))
}

/// DELETE /api/categories/:id (admin)
///
/// Refused with 409 while any article still references the category.
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_admin(&user, locale)?;

    let referenced: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE category_id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    if referenced > 0 {
        return Err(ApiError::Conflict(format!(
            "category is referenced by {} article(s)",
            referenced
        )));
    }

    let result = sqlx::query("DELETE FROM categories WHERE guid = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(locale));
    }

    Ok(Json(json!({ "status": "deleted" })))
}
