//! HTTP API handlers for nashir-ai

pub mod assist;
pub mod buildinfo;
pub mod health;
pub mod reader;
pub mod session;
pub mod sse;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use session::{session_middleware, CurrentUser};
pub use sse::event_stream;
