//! Database access layer
//!
//! Schema initialization, migrations and shared row models for the
//! `nashir.db` SQLite database used by all services.

pub mod init;
pub mod migrations;
pub mod models;

pub use init::init_database;
