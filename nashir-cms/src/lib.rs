//! nashir-cms library - content server
//!
//! Publishing, feeds, curation, newsroom collaboration and analytics
//! for the Nashir platform. The reader-facing surface is public; the
//! editorial surface sits behind the session middleware with role
//! checks in the handlers.

use axum::Router;
use nashir_common::events::EventBus;
use sqlx::SqlitePool;

pub mod api;
pub mod db;
pub mod error;
pub mod slug;
pub mod tags;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database connection pool
    pub db: SqlitePool,
    /// In-process event bus feeding the SSE stream
    pub events: EventBus,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            events: EventBus::new(256),
        }
    }
}

/// Build application router
///
/// Reader endpoints and auth entry points are public; everything else
/// requires a session cookie.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post, put};
    use tower_http::cors::CorsLayer;

    // Protected routes (session required; roles checked per handler)
    let protected = Router::new()
        .route("/api/articles", post(api::articles::create_article))
        .route("/api/articles/:id", put(api::articles::update_article))
        .route("/api/articles/:id", delete(api::articles::delete_article))
        .route("/api/admin/articles", get(api::admin::list_articles_admin))
        .route("/api/admin/articles/:id/publish", post(api::admin::publish_article))
        .route("/api/admin/articles/:id/archive", post(api::admin::archive_article))
        .route("/api/admin/articles/:id/feature", post(api::admin::feature_article))
        .route("/api/admin/articles/:id/unfeature", post(api::admin::unfeature_article))
        .route("/api/admin/stats/overview", get(api::stats::overview))
        .route("/api/admin/stats/articles/:id", get(api::stats::article_stats))
        .route("/api/categories", post(api::categories::create_category))
        .route("/api/categories/:id", put(api::categories::update_category))
        .route("/api/categories/:id", delete(api::categories::delete_category))
        .route("/api/angles", post(api::angles::create_angle))
        .route("/api/angles/:id", put(api::angles::update_angle))
        .route("/api/angles/:id/articles", post(api::angles::attach_article))
        .route(
            "/api/angles/:id/articles/:article_id",
            delete(api::angles::detach_article),
        )
        .route("/api/smart-blocks", post(api::smart_blocks::create_smart_block))
        .route("/api/smart-blocks/:id", put(api::smart_blocks::update_smart_block))
        .route("/api/smart-blocks/:id", delete(api::smart_blocks::delete_smart_block))
        .route("/api/themes", post(api::themes::create_theme))
        .route("/api/themes/:id/activate", post(api::themes::activate_theme))
        .route("/api/announcements", post(api::announcements::create_announcement))
        .route("/api/announcements/:id", put(api::announcements::update_announcement))
        .route("/api/announcements/:id", delete(api::announcements::delete_announcement))
        .route("/api/tasks", get(api::tasks::list_tasks))
        .route("/api/tasks", post(api::tasks::create_task))
        .route("/api/tasks/:id", put(api::tasks::update_task))
        .route("/api/tasks/:id/status", post(api::tasks::change_task_status))
        .route("/api/chat/channels", get(api::chat::list_channels))
        .route("/api/chat/channels", post(api::chat::create_channel))
        .route("/api/chat/channels/:id/messages", get(api::chat::list_messages))
        .route("/api/chat/channels/:id/messages", post(api::chat::post_message))
        .route("/api/prefs", get(api::prefs::get_prefs))
        .route("/api/prefs", put(api::prefs::set_pref))
        .route("/api/smart/entities", get(api::dictionary::list_entities))
        .route("/api/smart/entities", post(api::dictionary::create_entity))
        .route("/api/smart/entities/:id", put(api::dictionary::update_entity))
        .route("/api/smart/entities/:id", delete(api::dictionary::delete_entity))
        .route("/api/smart/terms", get(api::dictionary::list_terms))
        .route("/api/smart/terms", post(api::dictionary::create_term))
        .route("/api/smart/terms/:id", put(api::dictionary::update_term))
        .route("/api/smart/terms/:id", delete(api::dictionary::delete_term))
        .route("/api/events", get(api::event_stream))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    // Public routes (no session)
    let public = Router::new()
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        .route("/api/auth/request-reset", post(api::auth::request_reset))
        .route("/api/auth/reset-password", post(api::auth::reset_password))
        .route("/api/articles", get(api::articles::list_articles))
        .route("/api/articles/:id", get(api::articles::get_article_detail))
        .route("/api/articles/:id/view", post(api::articles::record_article_view))
        .route("/api/feed", get(api::feeds::feed))
        .route("/api/feed/featured", get(api::feeds::featured))
        .route("/api/lite/feed", get(api::feeds::lite_feed))
        .route("/api/digest/latest", get(api::feeds::latest_digest))
        .route("/api/categories", get(api::categories::list_categories))
        .route("/api/categories/:id/articles", get(api::feeds::category_feed))
        .route("/api/angles", get(api::angles::list_angles))
        .route("/api/angles/:id", get(api::angles::get_angle))
        .route("/api/smart-blocks", get(api::smart_blocks::list_smart_blocks))
        .route("/api/themes", get(api::themes::list_themes))
        .route("/api/announcements/active", get(api::announcements::active_announcements))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        // Browser clients on other local ports need CORS
        .layer(CorsLayer::permissive())
}
