//! # Nashir Common Library
//!
//! Shared code for all Nashir services including:
//! - Database schema, models and initialization
//! - Event types (NashirEvent enum) and the EventBus
//! - Session and password-reset primitives
//! - Configuration loading and root folder resolution
//! - Locale handling and localized user-facing messages
//! - SSE and pagination utilities

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod locale;
pub mod pagination;
pub mod sse;

pub use error::{Error, Result};
pub use locale::Locale;
