//! Newsroom task board
//!
//! Simple kanban for the editorial team. Status moves are validated:
//! open and in_progress swap freely, in_progress can complete to done,
//! and done is terminal.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use nashir_common::config::get_setting_i64;
use nashir_common::events::NashirEvent;
use nashir_common::pagination::calculate_pagination;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::session::{not_found, request_locale, require_staff, CurrentUser};
use crate::error::{ApiError, Result};
use crate::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Task {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub assignee_id: Option<String>,
    pub due_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub tasks: Vec<Task>,
}

fn valid_priority(priority: &str) -> bool {
    matches!(priority, "low" | "normal" | "high")
}

fn valid_transition(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("open", "in_progress") | ("in_progress", "open") | ("in_progress", "done")
    )
}

async fn assignee_is_staff(db: &SqlitePool, guid: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE guid = ? AND active = 1 AND role IN ('author', 'editor', 'admin')",
    )
    .bind(guid)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

async fn fetch_task(db: &SqlitePool, guid: &str) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE guid = ?")
        .bind(guid)
        .fetch_optional(db)
        .await?;
    Ok(task)
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    pub status: Option<String>,
    pub assignee: Option<String>,
}

/// GET /api/tasks (staff)
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let mut where_sql = String::new();
    let mut binds: Vec<String> = Vec::new();
    if let Some(status) = &query.status {
        where_sql.push_str(" AND status = ?");
        binds.push(status.clone());
    }
    if let Some(assignee) = &query.assignee {
        where_sql.push_str(" AND assignee_id = ?");
        binds.push(assignee.clone());
    }

    let count_sql = format!("SELECT COUNT(*) FROM tasks WHERE 1 = 1{}", where_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for value in &binds {
        count_query = count_query.bind(value);
    }
    let total = count_query.fetch_one(&state.db).await?;

    let page_size = get_setting_i64(&state.db, "admin_page_size", 50).await?;
    let pagination = calculate_pagination(total, query.page, page_size);

    let list_sql = format!(
        "SELECT * FROM tasks WHERE 1 = 1{} ORDER BY created_at DESC, guid DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let mut list_query = sqlx::query_as::<_, Task>(&list_sql);
    for value in &binds {
        list_query = list_query.bind(value);
    }
    let tasks = list_query
        .bind(pagination.page_size)
        .bind(pagination.offset)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(TaskListResponse {
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages,
        tasks,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<String>,
    pub assignee_id: Option<String>,
    pub due_at: Option<String>,
}

/// POST /api/tasks (staff)
pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let priority = req.priority.unwrap_or_else(|| "normal".to_string());
    if !valid_priority(&priority) {
        return Err(ApiError::BadRequest(format!("invalid priority: {}", priority)));
    }

    if let Some(assignee) = &req.assignee_id {
        if !assignee_is_staff(&state.db, assignee).await? {
            return Err(ApiError::BadRequest("assignee must be an active staff user".to_string()));
        }
    }

    let due_at = match req.due_at.as_deref() {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|_| ApiError::BadRequest(format!("invalid due_at: {}", raw)))?
                .with_timezone(&Utc)
                .to_rfc3339(),
        ),
        None => None,
    };

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO tasks (guid, title, description, priority, assignee_id, due_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(&priority)
    .bind(&req.assignee_id)
    .bind(&due_at)
    .execute(&state.db)
    .await?;

    let task = fetch_task(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::Internal("task vanished after insert".to_string()))?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<String>,
    pub due_at: Option<String>,
}

/// PUT /api/tasks/:id (staff)
///
/// Edits the task fields; status moves go through the status endpoint.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let existing = fetch_task(&state.db, &id)
        .await?
        .ok_or_else(|| not_found(locale))?;

    let title = req.title.unwrap_or(existing.title);
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let priority = req.priority.unwrap_or(existing.priority);
    if !valid_priority(&priority) {
        return Err(ApiError::BadRequest(format!("invalid priority: {}", priority)));
    }

    let assignee_id = req.assignee_id.or(existing.assignee_id);
    if let Some(assignee) = &assignee_id {
        if !assignee_is_staff(&state.db, assignee).await? {
            return Err(ApiError::BadRequest("assignee must be an active staff user".to_string()));
        }
    }

    let due_at = match req.due_at.as_deref() {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|_| ApiError::BadRequest(format!("invalid due_at: {}", raw)))?
                .with_timezone(&Utc)
                .to_rfc3339(),
        ),
        None => existing.due_at,
    };

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?, description = ?, priority = ?, assignee_id = ?, due_at = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(title.trim())
    .bind(req.description.unwrap_or(existing.description))
    .bind(&priority)
    .bind(&assignee_id)
    .bind(&due_at)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let task = fetch_task(&state.db, &id)
        .await?
        .ok_or_else(|| not_found(locale))?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusRequest {
    pub status: String,
}

/// POST /api/tasks/:id/status (staff)
///
/// Validated transition; emits TaskStatusChanged.
pub async fn change_task_status(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<TaskStatusRequest>,
) -> Result<Json<Task>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let task = fetch_task(&state.db, &id)
        .await?
        .ok_or_else(|| not_found(locale))?;

    if !valid_transition(&task.status, &req.status) {
        return Err(ApiError::Conflict(format!(
            "invalid status transition: {} -> {}",
            task.status, req.status
        )));
    }

    sqlx::query("UPDATE tasks SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(&req.status)
        .bind(&id)
        .execute(&state.db)
        .await?;

    state.events.emit_lossy(NashirEvent::TaskStatusChanged {
        task_id: task.guid.clone(),
        old_status: task.status.clone(),
        new_status: req.status.clone(),
        timestamp: Utc::now(),
    });

    let updated = fetch_task(&state.db, &id)
        .await?
        .ok_or_else(|| not_found(locale))?;
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(valid_transition("open", "in_progress"));
        assert!(valid_transition("in_progress", "open"));
        assert!(valid_transition("in_progress", "done"));

        // done is terminal, open cannot jump straight to done
        assert!(!valid_transition("done", "open"));
        assert!(!valid_transition("done", "in_progress"));
        assert!(!valid_transition("open", "done"));
        assert!(!valid_transition("open", "open"));
        assert!(!valid_transition("open", "bogus"));
    }
}
