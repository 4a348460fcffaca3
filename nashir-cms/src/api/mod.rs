//! HTTP API handlers for nashir-cms

pub mod admin;
pub mod angles;
pub mod announcements;
pub mod articles;
pub mod auth;
pub mod buildinfo;
pub mod categories;
pub mod chat;
pub mod dictionary;
pub mod feeds;
pub mod health;
pub mod prefs;
pub mod session;
pub mod smart_blocks;
pub mod sse;
pub mod stats;
pub mod tasks;
pub mod themes;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use session::{session_middleware, CurrentUser};
pub use sse::event_stream;
