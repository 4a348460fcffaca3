//! Campaign and creative administration
//!
//! Staff-only management of campaigns, their creatives, and delivery
//! stats. Campaigns move draft -> active -> paused/ended; serving only
//! ever reads active campaigns, so edits here take effect on the next
//! slot request.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::api::session::{not_found, request_locale, require_staff, CurrentUser};
use crate::error::{ApiError, Result};
use crate::models::{AdCampaign, AdCreative};
use crate::AppState;

fn valid_status(status: &str) -> bool {
    matches!(status, "draft" | "active" | "paused" | "ended")
}

fn valid_device(device: &str) -> bool {
    matches!(device, "any" | "desktop" | "mobile")
}

fn valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Parse and normalize an RFC3339 window bound
fn normalize_bound(raw: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|_| ApiError::BadRequest(format!("invalid timestamp: {}", raw)))?;
    Ok(parsed.with_timezone(&Utc).to_rfc3339())
}

/// Window bound on update: absent keeps, empty string clears
fn updated_bound(incoming: Option<String>, existing: Option<String>) -> Result<Option<String>> {
    match incoming {
        None => Ok(existing),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => Ok(Some(normalize_bound(&raw)?)),
    }
}

fn check_window(starts_at: &Option<String>, ends_at: &Option<String>) -> Result<()> {
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        // Normalized UTC RFC3339 strings compare chronologically
        if start > end {
            return Err(ApiError::BadRequest(
                "campaign window ends before it starts".to_string(),
            ));
        }
    }
    Ok(())
}

async fn fetch_campaign(state: &AppState, id: &str) -> Result<Option<AdCampaign>> {
    let campaign = sqlx::query_as::<_, AdCampaign>("SELECT * FROM ad_campaigns WHERE guid = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    Ok(campaign)
}

async fn fetch_creative(state: &AppState, id: &str) -> Result<Option<AdCreative>> {
    let creative = sqlx::query_as::<_, AdCreative>("SELECT * FROM ad_creatives WHERE guid = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    Ok(creative)
}

// ========================================
// Campaigns
// ========================================

/// GET /api/ads/campaigns (staff)
pub async fn list_campaigns(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdCampaign>>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let campaigns =
        sqlx::query_as::<_, AdCampaign>("SELECT * FROM ad_campaigns ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(campaigns))
}

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(default)]
    pub advertiser: String,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub status: Option<String>,
}

/// POST /api/ads/campaigns (staff)
pub async fn create_campaign(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<Json<AdCampaign>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let status = req.status.unwrap_or_else(|| "draft".to_string());
    if !valid_status(&status) {
        return Err(ApiError::BadRequest(format!("invalid status: {}", status)));
    }
    let starts_at = req.starts_at.as_deref().map(normalize_bound).transpose()?;
    let ends_at = req.ends_at.as_deref().map(normalize_bound).transpose()?;
    check_window(&starts_at, &ends_at)?;

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO ad_campaigns (guid, name, advertiser, starts_at, ends_at, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(req.name.trim())
    .bind(req.advertiser.trim())
    .bind(&starts_at)
    .bind(&ends_at)
    .bind(&status)
    .execute(&state.db)
    .await?;

    info!(campaign = %guid, name = %req.name.trim(), "campaign created");

    let campaign = fetch_campaign(&state, &guid)
        .await?
        .ok_or_else(|| ApiError::Internal("campaign vanished after insert".to_string()))?;
    Ok(Json(campaign))
}

/// GET /api/ads/campaigns/:id (staff) - campaign with its creatives
pub async fn get_campaign(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let campaign = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    let creatives = sqlx::query_as::<_, AdCreative>(
        "SELECT * FROM ad_creatives WHERE campaign_id = ? ORDER BY slot, weight DESC, created_at",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "campaign": campaign, "creatives": creatives })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub advertiser: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub status: Option<String>,
}

/// PUT /api/ads/campaigns/:id (staff)
///
/// Window bounds: absent fields keep the stored value, an empty string
/// clears the bound. Status changes here cover the terminal 'ended'
/// state that pause/resume never reach.
pub async fn update_campaign(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<Json<AdCampaign>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let existing = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;

    let name = req.name.unwrap_or_else(|| existing.name.clone());
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let status = req.status.unwrap_or_else(|| existing.status.clone());
    if !valid_status(&status) {
        return Err(ApiError::BadRequest(format!("invalid status: {}", status)));
    }
    let starts_at = updated_bound(req.starts_at, existing.starts_at)?;
    let ends_at = updated_bound(req.ends_at, existing.ends_at)?;
    check_window(&starts_at, &ends_at)?;

    sqlx::query(
        r#"
        UPDATE ad_campaigns
        SET name = ?, advertiser = ?, starts_at = ?, ends_at = ?, status = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(name.trim())
    .bind(req.advertiser.unwrap_or(existing.advertiser).trim())
    .bind(&starts_at)
    .bind(&ends_at)
    .bind(&status)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let campaign = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    Ok(Json(campaign))
}

/// DELETE /api/ads/campaigns/:id (staff)
///
/// Active campaigns must be paused or ended first. Deletion cascades
/// to creatives and their tracking rows.
pub async fn delete_campaign(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let existing = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    if existing.status == "active" {
        return Err(ApiError::Conflict(
            "campaign is active; pause or end it before deleting".to_string(),
        ));
    }

    sqlx::query("DELETE FROM ad_campaigns WHERE guid = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    info!(campaign = %id, "campaign deleted");
    Ok(Json(json!({ "status": "deleted" })))
}

/// POST /api/ads/campaigns/:id/pause (staff)
pub async fn pause_campaign(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AdCampaign>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let existing = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    if existing.status != "active" {
        return Err(ApiError::Conflict(format!(
            "only active campaigns can be paused (status is {})",
            existing.status
        )));
    }

    sqlx::query(
        "UPDATE ad_campaigns SET status = 'paused', updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(&id)
    .execute(&state.db)
    .await?;

    info!(campaign = %id, "campaign paused");
    let campaign = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    Ok(Json(campaign))
}

/// POST /api/ads/campaigns/:id/resume (staff)
///
/// Also serves as the activation step for draft campaigns.
pub async fn resume_campaign(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AdCampaign>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let existing = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    if existing.status != "paused" && existing.status != "draft" {
        return Err(ApiError::Conflict(format!(
            "only draft or paused campaigns can be activated (status is {})",
            existing.status
        )));
    }

    sqlx::query(
        "UPDATE ad_campaigns SET status = 'active', updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(&id)
    .execute(&state.db)
    .await?;

    info!(campaign = %id, "campaign activated");
    let campaign = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    Ok(Json(campaign))
}

// ========================================
// Creatives
// ========================================

#[derive(Debug, Deserialize)]
pub struct CreateCreativeRequest {
    pub slot: String,
    pub title: String,
    pub media_url: String,
    pub destination_url: String,
    pub device: Option<String>,
    pub weight: Option<i64>,
    pub active: Option<bool>,
}

/// POST /api/ads/campaigns/:id/creatives (staff)
pub async fn create_creative(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CreateCreativeRequest>,
) -> Result<Json<AdCreative>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if fetch_campaign(&state, &id).await?.is_none() {
        return Err(not_found(locale));
    }
    if req.slot.trim().is_empty() {
        return Err(ApiError::BadRequest("slot is required".to_string()));
    }
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    if !valid_http_url(req.media_url.trim()) {
        return Err(ApiError::BadRequest("media_url must be an http(s) URL".to_string()));
    }
    if !valid_http_url(req.destination_url.trim()) {
        return Err(ApiError::BadRequest(
            "destination_url must be an http(s) URL".to_string(),
        ));
    }
    let device = req.device.unwrap_or_else(|| "any".to_string());
    if !valid_device(&device) {
        return Err(ApiError::BadRequest(format!("invalid device: {}", device)));
    }
    let weight = req.weight.unwrap_or(1);
    if weight < 1 {
        return Err(ApiError::BadRequest("weight must be at least 1".to_string()));
    }

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO ad_creatives (guid, campaign_id, slot, device, title, media_url, destination_url, weight, active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&id)
    .bind(req.slot.trim())
    .bind(&device)
    .bind(req.title.trim())
    .bind(req.media_url.trim())
    .bind(req.destination_url.trim())
    .bind(weight)
    .bind(req.active.unwrap_or(true))
    .execute(&state.db)
    .await?;

    info!(creative = %guid, campaign = %id, slot = %req.slot.trim(), "creative created");

    let creative = fetch_creative(&state, &guid)
        .await?
        .ok_or_else(|| ApiError::Internal("creative vanished after insert".to_string()))?;
    Ok(Json(creative))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCreativeRequest {
    pub slot: Option<String>,
    pub title: Option<String>,
    pub media_url: Option<String>,
    pub destination_url: Option<String>,
    pub device: Option<String>,
    pub weight: Option<i64>,
    pub active: Option<bool>,
}

/// PUT /api/ads/creatives/:id (staff)
pub async fn update_creative(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateCreativeRequest>,
) -> Result<Json<AdCreative>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let existing = fetch_creative(&state, &id).await?.ok_or_else(|| not_found(locale))?;

    let slot = req.slot.unwrap_or_else(|| existing.slot.clone());
    if slot.trim().is_empty() {
        return Err(ApiError::BadRequest("slot is required".to_string()));
    }
    let title = req.title.unwrap_or_else(|| existing.title.clone());
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    let media_url = req.media_url.unwrap_or_else(|| existing.media_url.clone());
    if !valid_http_url(media_url.trim()) {
        return Err(ApiError::BadRequest("media_url must be an http(s) URL".to_string()));
    }
    let destination_url = req
        .destination_url
        .unwrap_or_else(|| existing.destination_url.clone());
    if !valid_http_url(destination_url.trim()) {
        return Err(ApiError::BadRequest(
            "destination_url must be an http(s) URL".to_string(),
        ));
    }
    let device = req.device.unwrap_or_else(|| existing.device.clone());
    if !valid_device(&device) {
        return Err(ApiError::BadRequest(format!("invalid device: {}", device)));
    }
    let weight = req.weight.unwrap_or(existing.weight);
    if weight < 1 {
        return Err(ApiError::BadRequest("weight must be at least 1".to_string()));
    }

    sqlx::query(
        r#"
        UPDATE ad_creatives
        SET slot = ?, title = ?, media_url = ?, destination_url = ?, device = ?,
            weight = ?, active = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(slot.trim())
    .bind(title.trim())
    .bind(media_url.trim())
    .bind(destination_url.trim())
    .bind(&device)
    .bind(weight)
    .bind(req.active.unwrap_or(existing.active))
    .bind(&id)
    .execute(&state.db)
    .await?;

    let creative = fetch_creative(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    Ok(Json(creative))
}

/// DELETE /api/ads/creatives/:id (staff)
pub async fn delete_creative(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    if fetch_creative(&state, &id).await?.is_none() {
        return Err(not_found(locale));
    }

    sqlx::query("DELETE FROM ad_creatives WHERE guid = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    info!(creative = %id, "creative deleted");
    Ok(Json(json!({ "status": "deleted" })))
}

// ========================================
// Stats
// ========================================

/// GET /api/ads/stats/campaign/:id (staff)
///
/// Per-creative impressions, clicks, and CTR plus campaign totals.
/// CTR is 0 when a creative has no impressions yet.
pub async fn campaign_stats(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let locale = request_locale(&headers);
    require_staff(&user, locale)?;

    let campaign = fetch_campaign(&state, &id).await?.ok_or_else(|| not_found(locale))?;
    let creatives = sqlx::query_as::<_, AdCreative>(
        "SELECT * FROM ad_creatives WHERE campaign_id = ? ORDER BY slot, weight DESC, created_at",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    let impression_rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT i.creative_id, COUNT(*) FROM ad_impressions i
        JOIN ad_creatives c ON c.guid = i.creative_id
        WHERE c.campaign_id = ?
        GROUP BY i.creative_id
        "#,
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;
    let click_rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT k.creative_id, COUNT(*) FROM ad_clicks k
        JOIN ad_creatives c ON c.guid = k.creative_id
        WHERE c.campaign_id = ?
        GROUP BY k.creative_id
        "#,
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    let impressions: HashMap<String, i64> = impression_rows.into_iter().collect();
    let clicks: HashMap<String, i64> = click_rows.into_iter().collect();

    let mut total_impressions = 0i64;
    let mut total_clicks = 0i64;
    let mut rows = Vec::with_capacity(creatives.len());
    for creative in &creatives {
        let seen = impressions.get(&creative.guid).copied().unwrap_or(0);
        let clicked = clicks.get(&creative.guid).copied().unwrap_or(0);
        total_impressions += seen;
        total_clicks += clicked;
        rows.push(json!({
            "guid": creative.guid,
            "title": creative.title,
            "slot": creative.slot,
            "impressions": seen,
            "clicks": clicked,
            "ctr": ctr(seen, clicked),
        }));
    }

    Ok(Json(json!({
        "campaign": campaign,
        "creatives": rows,
        "totals": {
            "impressions": total_impressions,
            "clicks": total_clicks,
            "ctr": ctr(total_impressions, total_clicks),
        },
    })))
}

fn ctr(impressions: i64, clicks: i64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    clicks as f64 / impressions as f64
}
