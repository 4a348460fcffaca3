//! nashir-ads library - ad server
//!
//! Campaign and creative management, slot delivery with round-robin
//! rotation hints, and impression/click tracking over the shared
//! database. Sessions come from the shared database; nashir-cms issues
//! the cookies.

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod error;
pub mod models;
pub mod rotation;

use rotation::RotationCounters;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database connection pool
    pub db: SqlitePool,
    /// Per-slot round-robin counters, in-process only
    pub rotation: RotationCounters,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            rotation: RotationCounters::default(),
        }
    }
}

/// Build application router
///
/// Campaign administration requires a staff session; slot delivery,
/// tracking, the heartbeat stream and the health check are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};
    use tower_http::cors::CorsLayer;

    // Protected routes (session required; staff checked per handler)
    let protected = Router::new()
        .route(
            "/api/ads/campaigns",
            get(api::campaigns::list_campaigns).post(api::campaigns::create_campaign),
        )
        .route(
            "/api/ads/campaigns/:id",
            get(api::campaigns::get_campaign)
                .put(api::campaigns::update_campaign)
                .delete(api::campaigns::delete_campaign),
        )
        .route("/api/ads/campaigns/:id/pause", post(api::campaigns::pause_campaign))
        .route("/api/ads/campaigns/:id/resume", post(api::campaigns::resume_campaign))
        .route(
            "/api/ads/campaigns/:id/creatives",
            post(api::campaigns::create_creative),
        )
        .route(
            "/api/ads/creatives/:id",
            put(api::campaigns::update_creative).delete(api::campaigns::delete_creative),
        )
        .route("/api/ads/stats/campaign/:id", get(api::campaigns::campaign_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    // Public routes
    let public = Router::new()
        .route("/api/ads/slot/:slot_id", get(api::serving::serve_slot))
        .route(
            "/api/ads/track/impression/:creative_id",
            post(api::serving::track_impression),
        )
        .route(
            "/api/ads/track/click/:creative_id",
            post(api::serving::track_click),
        )
        .route("/api/events", get(api::event_stream))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    // Browser clients on other local ports need CORS
    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(CorsLayer::permissive())
}
