//! Session and password management
//!
//! Implements [REQ-AUTH-010] through [REQ-AUTH-040]:
//! - Passwords stored as salted SHA-256, never in clear
//! - Browser sessions via an opaque cookie token; only the token hash
//!   is stored server-side
//! - Sliding expiration driven by the `session_timeout_seconds` setting
//! - Password reset tokens with a short TTL (`reset_token_ttl_minutes`)
//!
//! # Pure Functions
//!
//! Hashing and token generation are pure and synchronous; everything
//! touching the database is an async operation over `&SqlitePool`.
//! HTTP framework concerns (cookie extraction, middleware) live in
//! module-specific code.

use crate::config::get_setting_i64;
use crate::db::models::User;
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::warn;

/// Name of the browser session cookie
pub const SESSION_COOKIE: &str = "nashir_session";

const USER_COLUMNS: &str = "guid, username, email, password_hash, password_salt, \
     display_name, role, locale, active, created_at";

// ========================================
// Hashing and Token Generation
// ========================================

/// Hash a password with its salt (SHA-256, 64 hex chars) [REQ-AUTH-020]
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generate a random per-user salt (32 hex chars)
pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Constant shape check then hash comparison
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    !expected_hash.is_empty() && hash_password(password, salt) == expected_hash
}

/// Generate an opaque session or reset token (64 hex chars)
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hash a token for storage; raw tokens never touch the database
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when an RFC 3339 expiry timestamp is in the past.
/// Unparseable values count as expired.
fn is_expired(expires_at: &str) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(t) => t.with_timezone(&Utc) < Utc::now(),
        Err(_) => true,
    }
}

// ========================================
// Sessions
// ========================================

/// Check credentials and return the user on success
///
/// Returns `None` for unknown usernames, wrong passwords, deactivated
/// accounts, and accounts with no password set (the Anonymous user).
/// Callers map `None` to a localized 401.
pub async fn authenticate(
    db: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE username = ? AND active = 1",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(db)
        .await?;

    match user {
        Some(u) if verify_password(password, &u.password_salt, &u.password_hash) => Ok(Some(u)),
        _ => Ok(None),
    }
}

/// Create a session for a user and return the raw cookie token
pub async fn create_session(db: &SqlitePool, user_guid: &str) -> Result<String> {
    let timeout = get_setting_i64(db, "session_timeout_seconds", 31_536_000).await?;
    let token = generate_token();
    let now = Utc::now();
    let expires_at = (now + Duration::seconds(timeout)).to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO sessions (token_hash, user_id, created_at, expires_at, last_seen_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(hash_token(&token))
    .bind(user_guid)
    .bind(now.to_rfc3339())
    .bind(&expires_at)
    .bind(now.to_rfc3339())
    .execute(db)
    .await?;

    Ok(token)
}

/// Resolve a session token to its user
///
/// Expired sessions are deleted on sight. Valid lookups slide the
/// expiration window forward [REQ-AUTH-010].
pub async fn validate_session(db: &SqlitePool, token: &str) -> Result<Option<User>> {
    let token_hash = hash_token(token);

    let row: Option<(String, String)> =
        sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .fetch_optional(db)
            .await?;

    let Some((user_id, expires_at)) = row else {
        return Ok(None);
    };

    if is_expired(&expires_at) {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .execute(db)
            .await?;
        return Ok(None);
    }

    let timeout = get_setting_i64(db, "session_timeout_seconds", 31_536_000).await?;
    let now = Utc::now();
    sqlx::query("UPDATE sessions SET last_seen_at = ?, expires_at = ? WHERE token_hash = ?")
        .bind(now.to_rfc3339())
        .bind((now + Duration::seconds(timeout)).to_rfc3339())
        .bind(&token_hash)
        .execute(db)
        .await?;

    let sql = format!(
        "SELECT {} FROM users WHERE guid = ? AND active = 1",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&user_id)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

/// Remove a session (logout). Unknown tokens are a no-op.
pub async fn destroy_session(db: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(db)
        .await?;

    Ok(())
}

/// Delete all expired sessions; returns the number removed
pub async fn purge_expired_sessions(db: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now().to_rfc3339())
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

// ========================================
// Password Reset
// ========================================

/// Issue a reset token for a username or email [REQ-AUTH-030]
///
/// Returns `None` when no matching active account exists so the caller
/// can respond identically either way and not leak account existence.
pub async fn issue_password_reset(db: &SqlitePool, identifier: &str) -> Result<Option<String>> {
    let user_id: Option<String> = sqlx::query_scalar(
        r#"
        SELECT guid FROM users
        WHERE (username = ?1 OR email = ?1) AND active = 1 AND password_hash != ''
        "#,
    )
    .bind(identifier)
    .fetch_optional(db)
    .await?;

    let Some(user_id) = user_id else {
        return Ok(None);
    };

    let ttl_minutes = get_setting_i64(db, "reset_token_ttl_minutes", 30).await?;
    let token = generate_token();
    let expires_at = (Utc::now() + Duration::minutes(ttl_minutes)).to_rfc3339();

    sqlx::query(
        "INSERT INTO password_resets (token_hash, user_id, expires_at) VALUES (?, ?, ?)",
    )
    .bind(hash_token(&token))
    .bind(&user_id)
    .bind(&expires_at)
    .execute(db)
    .await?;

    Ok(Some(token))
}

/// Consume a reset token and set the new password
///
/// Returns `false` for unknown, expired, or already-used tokens. On
/// success the token is burned and every existing session for the
/// account is revoked.
pub async fn consume_password_reset(
    db: &SqlitePool,
    token: &str,
    new_password: &str,
) -> Result<bool> {
    let token_hash = hash_token(token);

    let row: Option<(String, String, bool)> = sqlx::query_as(
        "SELECT user_id, expires_at, used FROM password_resets WHERE token_hash = ?",
    )
    .bind(&token_hash)
    .fetch_optional(db)
    .await?;

    let Some((user_id, expires_at, used)) = row else {
        return Ok(false);
    };

    if used || is_expired(&expires_at) {
        return Ok(false);
    }

    let salt = generate_salt();
    let password_hash = hash_password(new_password, &salt);

    let mut tx = db.begin().await?;

    sqlx::query("UPDATE password_resets SET used = 1 WHERE token_hash = ?")
        .bind(&token_hash)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?, password_salt = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&password_hash)
    .bind(&salt)
    .bind(&user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(&user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(true)
}

// ========================================
// First-Run Bootstrap
// ========================================

/// Create the initial admin account when no admin exists [REQ-AUTH-040]
///
/// The generated password is logged once at WARN level; there is no
/// other way to retrieve it.
pub async fn ensure_admin_user(db: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(db)
        .await?;

    if count > 0 {
        return Ok(());
    }

    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let salt = generate_salt();
    let password_hash = hash_password(&password, &salt);

    sqlx::query(
        r#"
        INSERT INTO users (guid, username, password_hash, password_salt, display_name, role)
        VALUES (?, 'admin', ?, ?, 'Administrator', 'admin')
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&password_hash)
    .bind(&salt)
    .execute(db)
    .await?;

    warn!("Created initial admin user 'admin' with password: {}", password);
    warn!("Change this password immediately after first login");

    Ok(())
}

// ========================================
// Tests
// ========================================
