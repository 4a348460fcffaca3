//! nashir-ai library - assistant service
//!
//! Editorial AI tools for the Nashir platform: section classification,
//! headline generation and comparison, smart-link extraction and the
//! newsroom chat assistant, plus the deterministic reader aids
//! (recommendations, read-aloud chunking, voice commands). Sessions
//! come from the shared database; nashir-cms issues the cookies.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use governor::{Quota, RateLimiter};
use sqlx::SqlitePool;

pub mod api;
pub mod error;
pub mod providers;
pub mod services;

use error::ApiError;
use nashir_common::locale::Locale;
use providers::LlmClient;

const USER_AGENT: &str = concat!("nashir-ai/", env!("CARGO_PKG_VERSION"));

/// Limiter over all outbound provider calls, shared across handlers
pub type LlmRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database connection pool
    pub db: SqlitePool,
    /// Outbound HTTP client for provider calls
    pub http: reqwest::Client,
    llm_limiter: Arc<LlmRateLimiter>,
}

impl AppState {
    /// Create new application state
    ///
    /// `requests_per_minute` caps outbound provider traffic; it comes
    /// from the `ai_requests_per_minute` setting at startup.
    pub fn new(db: SqlitePool, requests_per_minute: i64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        // clamp guarantees a non-zero quota
        let per_minute = NonZeroU32::new(requests_per_minute.clamp(1, 600) as u32)
            .unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            db,
            http,
            llm_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        })
    }

    /// Wait for rate-limit headroom, then build a provider client from
    /// the current settings and environment
    pub async fn acquire_llm(&self, locale: Locale) -> Result<LlmClient, ApiError> {
        self.llm_limiter.until_ready().await;
        providers::client_from_settings(&self.db, &self.http)
            .await
            .map_err(|e| services::provider_error(e, locale))
    }
}

/// Build application router
///
/// The assistant endpoints require a staff session; the reader aids,
/// heartbeat stream and health check are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;

    // Protected routes (session required; staff checked per handler)
    let protected = Router::new()
        .route("/api/ai/chat", post(api::assist::chat))
        .route("/api/ai/classify", post(api::assist::classify))
        .route("/api/ai/headlines", post(api::assist::generate_headlines))
        .route("/api/ai/headlines/compare", post(api::assist::compare_headlines))
        .route("/api/ai/smart-links", post(api::assist::smart_links))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    // Public routes
    let public = Router::new()
        .route(
            "/api/articles/:slug/ai-recommendations",
            get(api::reader::recommendations),
        )
        .route("/api/ai/read-aloud", post(api::reader::read_aloud))
        .route("/api/ai/voice-command", post(api::reader::voice_command))
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
