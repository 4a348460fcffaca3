//! Database initialization
//!
//! Implements graceful degradation for database initialization:
//! - [REQ-NF-030]: Automatic database creation with default schema
//! - [ARCH-BOOT-010]: Service startup sequence
//! - [ARCH-BOOT-020]: Default value initialization behavior
//!
//! Every service calls [`init_database`] at startup; all steps are
//! idempotent so concurrent first runs are safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Fixed GUID of the seeded Anonymous user
pub const ANONYMOUS_USER_GUID: &str = "00000000-0000-0000-0000-000000000001";

/// Initialize database connection and create tables if needed [REQ-NF-030]
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer, which matters
    // with three services sharing the file
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Provisional busy timeout; re-applied from settings once they exist
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Schema creation (idempotent - safe to call from every service)
    create_schema_version_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_module_config_table(&pool).await?;
    create_users_table(&pool).await?;
    create_sessions_table(&pool).await?;
    create_password_resets_table(&pool).await?;

    // Content tables
    create_categories_table(&pool).await?;
    create_articles_table(&pool).await?;
    create_article_views_table(&pool).await?;
    create_angles_table(&pool).await?;
    create_angle_articles_table(&pool).await?;
    create_smart_blocks_table(&pool).await?;

    // Editorial dictionary (used by nashir-cms for CRUD, nashir-ai for linking)
    create_smart_entities_table(&pool).await?;
    create_smart_terms_table(&pool).await?;

    // Site management tables
    create_themes_table(&pool).await?;
    create_announcements_table(&pool).await?;
    create_tasks_table(&pool).await?;
    create_user_prefs_table(&pool).await?;

    // Newsroom chat tables
    create_chat_channels_table(&pool).await?;
    create_chat_messages_table(&pool).await?;

    // Advertising tables (nashir-ads)
    create_ad_campaigns_table(&pool).await?;
    create_ad_creatives_table(&pool).await?;
    create_ad_impressions_table(&pool).await?;
    create_ad_clicks_table(&pool).await?;

    // Manual migrations for databases created by older builds
    crate::db::migrations::run_migrations(&pool).await?;

    // Initialize default settings [ARCH-BOOT-020]
    init_default_settings(&pool).await?;

    // Seed rows required for first-run operation
    seed_default_categories(&pool).await?;
    seed_default_theme(&pool).await?;
    seed_default_chat_channel(&pool).await?;

    // Apply configurable busy timeout from settings
    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'db_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    info!("Database busy timeout set to {} ms", timeout_ms);

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_module_config_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS module_config (
            module_name TEXT PRIMARY KEY CHECK (module_name IN ('content_server', 'ai_assist', 'ad_server')),
            host TEXT NOT NULL,
            port INTEGER NOT NULL CHECK (port > 0 AND port <= 65535),
            enabled INTEGER NOT NULL DEFAULT 1,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Initialize default service configurations
    let defaults = vec![
        ("content_server", "127.0.0.1", 5860),
        ("ai_assist", "127.0.0.1", 5861),
        ("ad_server", "127.0.0.1", 5862),
    ];

    for (module_name, host, port) in defaults {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO module_config (module_name, host, port, enabled)
            VALUES (?, ?, ?, 1)
            "#,
        )
        .bind(module_name)
        .bind(host)
        .bind(port)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Create the users table
///
/// Roles gate the editorial surface: admin > editor > author > reader.
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            display_name TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL DEFAULT 'reader' CHECK (role IN ('admin', 'editor', 'author', 'reader')),
            locale TEXT NOT NULL DEFAULT 'ar' CHECK (locale IN ('ar', 'en', 'ur')),
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create Anonymous user if it doesn't exist
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (guid, username, password_hash, password_salt, role)
        VALUES (?, 'Anonymous', '', '', 'reader')
        "#,
    )
    .bind(ANONYMOUS_USER_GUID)
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at TIMESTAMP NOT NULL,
            last_seen_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_password_resets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS password_resets (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            expires_at TIMESTAMP NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_password_resets_user ON password_resets(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the categories table
///
/// Bilingual section names; `position` orders the site navigation.
pub async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            guid TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            name_ar TEXT NOT NULL,
            name_en TEXT NOT NULL,
            description TEXT,
            position INTEGER NOT NULL DEFAULT 100,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (position >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_categories_slug ON categories(slug)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the articles table
///
/// Tags are stored as a JSON array of strings; lifecycle is
/// draft -> review -> published -> archived.
pub async fn create_articles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            guid TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            subtitle TEXT,
            summary TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL DEFAULT '',
            language TEXT NOT NULL DEFAULT 'ar' CHECK (language IN ('ar', 'en')),
            kind TEXT NOT NULL DEFAULT 'news' CHECK (kind IN ('news', 'opinion', 'analysis', 'digest')),
            status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'review', 'published', 'archived')),
            featured INTEGER NOT NULL DEFAULT 0,
            category_id TEXT NOT NULL REFERENCES categories(guid),
            author_id TEXT NOT NULL REFERENCES users(guid),
            tags TEXT NOT NULL DEFAULT '[]',
            hero_image_url TEXT,
            published_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (featured IN (0, 1)),
            CHECK (status != 'published' OR published_at IS NOT NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_language ON articles(language)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_featured ON articles(featured)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_article_views_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS article_views (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            article_id TEXT NOT NULL REFERENCES articles(guid) ON DELETE CASCADE,
            session_key TEXT NOT NULL,
            viewed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_article_views_article ON article_views(article_id, viewed_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_article_views_session ON article_views(article_id, session_key, viewed_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the angles table
///
/// Curated editorial "angles": long-form perspective collections.
pub async fn create_angles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS angles (
            guid TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT,
            cover_image_url TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_angle_articles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS angle_articles (
            angle_id TEXT NOT NULL REFERENCES angles(guid) ON DELETE CASCADE,
            article_id TEXT NOT NULL REFERENCES articles(guid) ON DELETE CASCADE,
            position INTEGER NOT NULL DEFAULT 100,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (angle_id, article_id),
            CHECK (position >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_angle_articles_angle ON angle_articles(angle_id, position)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the smart_blocks table
///
/// Keyword-driven reusable content widgets (grid/list/featured layouts).
pub async fn create_smart_blocks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS smart_blocks (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            layout TEXT NOT NULL DEFAULT 'list' CHECK (layout IN ('grid', 'list', 'featured')),
            keyword TEXT NOT NULL,
            max_items INTEGER NOT NULL DEFAULT 6,
            position INTEGER NOT NULL DEFAULT 100,
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (max_items > 0 AND max_items <= 20),
            CHECK (position >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the smart_entities table
///
/// Known people/organizations/places for smart-link extraction.
/// Aliases are a JSON array of alternative spellings.
pub async fn create_smart_entities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS smart_entities (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            entity_type TEXT NOT NULL DEFAULT 'other' CHECK (entity_type IN ('person', 'organization', 'place', 'event', 'other')),
            description TEXT,
            aliases TEXT NOT NULL DEFAULT '[]',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_smart_entities_name ON smart_entities(name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_smart_terms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS smart_terms (
            guid TEXT PRIMARY KEY,
            term TEXT NOT NULL UNIQUE,
            definition TEXT NOT NULL DEFAULT '',
            aliases TEXT NOT NULL DEFAULT '[]',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the themes table
///
/// `tokens` is a JSON object of design tokens (palette, typography).
/// At most one row has active=1; activation is handled transactionally
/// by the content server.
pub async fn create_themes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS themes (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            tokens TEXT NOT NULL DEFAULT '{}',
            active INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (active IN (0, 1))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_announcements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS announcements (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            body TEXT NOT NULL DEFAULT '',
            level TEXT NOT NULL DEFAULT 'info' CHECK (level IN ('info', 'warning', 'critical')),
            starts_at TIMESTAMP,
            ends_at TIMESTAMP,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_announcements_active ON announcements(active, starts_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the tasks table
///
/// Newsroom task board entries assigned to staff users.
pub async fn create_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'in_progress', 'done')),
            priority TEXT NOT NULL DEFAULT 'normal' CHECK (priority IN ('low', 'normal', 'high')),
            assignee_id TEXT REFERENCES users(guid),
            due_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_user_prefs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_prefs (
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (user_id, key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_chat_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_channels (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            topic TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_chat_messages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_messages (
            guid TEXT PRIMARY KEY,
            channel_id TEXT NOT NULL REFERENCES chat_channels(guid) ON DELETE CASCADE,
            sender_id TEXT NOT NULL REFERENCES users(guid),
            body TEXT NOT NULL,
            sent_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chat_messages_channel ON chat_messages(channel_id, sent_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the ad_campaigns table
pub async fn create_ad_campaigns_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ad_campaigns (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            advertiser TEXT NOT NULL DEFAULT '',
            starts_at TIMESTAMP,
            ends_at TIMESTAMP,
            status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'active', 'paused', 'ended')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ad_campaigns_status ON ad_campaigns(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the ad_creatives table
///
/// A creative belongs to a campaign and targets one slot and device class.
pub async fn create_ad_creatives_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ad_creatives (
            guid TEXT PRIMARY KEY,
            campaign_id TEXT NOT NULL REFERENCES ad_campaigns(guid) ON DELETE CASCADE,
            slot TEXT NOT NULL,
            device TEXT NOT NULL DEFAULT 'any' CHECK (device IN ('any', 'desktop', 'mobile')),
            title TEXT NOT NULL,
            media_url TEXT NOT NULL,
            destination_url TEXT NOT NULL,
            weight INTEGER NOT NULL DEFAULT 1,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (weight >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ad_creatives_slot ON ad_creatives(slot, active)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ad_creatives_campaign ON ad_creatives(campaign_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the ad_impressions table
///
/// The composite primary key IS the dedup rule: one impression per
/// creative per viewer session.
pub async fn create_ad_impressions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ad_impressions (
            creative_id TEXT NOT NULL REFERENCES ad_creatives(guid) ON DELETE CASCADE,
            session_key TEXT NOT NULL,
            seen_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (creative_id, session_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ad_impressions_seen ON ad_impressions(creative_id, seen_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_ad_clicks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ad_clicks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            creative_id TEXT NOT NULL REFERENCES ad_creatives(guid) ON DELETE CASCADE,
            session_key TEXT NOT NULL,
            clicked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ad_clicks_creative ON ad_clicks(creative_id, clicked_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize or update default settings [ARCH-BOOT-020]
///
/// This function ensures all required settings exist with default values.
/// It also handles NULL values by resetting them to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Database settings
    ensure_setting(pool, "db_busy_timeout_ms", "5000").await?;

    // Session and authentication settings
    ensure_setting(pool, "session_timeout_seconds", "31536000").await?; // 1 year
    ensure_setting(pool, "reset_token_ttl_minutes", "30").await?;
    ensure_setting(pool, "min_password_chars", "8").await?;

    // Article settings
    ensure_setting(pool, "max_article_tags", "10").await?;
    ensure_setting(pool, "view_dedup_minutes", "30").await?;

    // Feed settings
    ensure_setting(pool, "feed_page_size", "20").await?;
    ensure_setting(pool, "lite_feed_page_size", "8").await?;
    ensure_setting(pool, "admin_page_size", "50").await?;

    // Chat settings
    ensure_setting(pool, "chat_page_size", "50").await?;
    ensure_setting(pool, "chat_max_message_chars", "2000").await?;

    // Advertising settings
    ensure_setting(pool, "ad_rotation_interval_ms", "8000").await?;
    ensure_setting(pool, "ad_slot_max_creatives", "10").await?;

    // AI assist settings (keys come from the environment, never from here)
    ensure_setting(pool, "ai_provider", "anthropic").await?;
    ensure_setting(pool, "ai_anthropic_model", "claude-3-5-sonnet-20241022").await?;
    ensure_setting(pool, "ai_openai_model", "gpt-4o-mini").await?;
    ensure_setting(pool, "ai_max_tokens", "1024").await?;
    ensure_setting(pool, "ai_temperature", "0.3").await?;
    ensure_setting(pool, "ai_requests_per_minute", "30").await?;
    ensure_setting(pool, "ai_context_window_chars", "80").await?;
    ensure_setting(pool, "ai_recommendation_limit", "5").await?;
    ensure_setting(pool, "read_aloud_max_chars", "280").await?;

    // HTTP server settings
    ensure_setting(pool, "http_request_timeout_ms", "30000").await?;
    ensure_setting(pool, "http_max_body_size_bytes", "1048576").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value [ARCH-BOOT-020]
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // Check if setting exists
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // Setting doesn't exist - create it
        // Use INSERT OR IGNORE to handle concurrent initialization race conditions
        // (three services may initialize simultaneously)
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    // Check if value is NULL
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        // Value is NULL - reset to default
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Seed the default bilingual section set on first run
async fn seed_default_categories(pool: &SqlitePool) -> Result<()> {
    let defaults = vec![
        ("local", "محليات", "Local", 10),
        ("world", "العالم", "World", 20),
        ("economy", "اقتصاد", "Economy", 30),
        ("sports", "رياضة", "Sports", 40),
        ("technology", "تقنية", "Technology", 50),
        ("culture", "ثقافة", "Culture", 60),
    ];

    for (slug, name_ar, name_en, position) in defaults {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO categories (guid, slug, name_ar, name_en, position)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(slug)
        .bind(name_ar)
        .bind(name_en)
        .bind(position)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Seed the default theme; it becomes active only when no theme is
/// active yet (fresh database)
async fn seed_default_theme(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM themes")
        .fetch_one(pool)
        .await?;

    if count == 0 {
        let tokens = r##"{"palette":{"primary":"#1a7f5a","accent":"#c8a24b","background":"#ffffff"},"typography":{"base":"Tajawal","headings":"Tajawal"}}"##;
        sqlx::query(
            r#"
            INSERT INTO themes (guid, name, tokens, active)
            VALUES (?, 'Default', ?, 1)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(tokens)
        .execute(pool)
        .await?;

        info!("Seeded default theme");
    }

    Ok(())
}

async fn seed_default_chat_channel(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO chat_channels (guid, name, topic)
        VALUES (?, 'general', 'Newsroom general discussion')
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .execute(pool)
    .await?;

    Ok(())
}
