//! HTTP API handlers for nashir-ads

pub mod buildinfo;
pub mod campaigns;
pub mod health;
pub mod serving;
pub mod session;
pub mod sse;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use session::{session_middleware, CurrentUser};
pub use sse::event_stream;
