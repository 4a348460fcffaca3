//! Database access layer
//!
//! Article queries shared by the public feeds, the staff endpoints and
//! the stats endpoints live here. One-off queries stay with their handlers.

pub mod articles;
