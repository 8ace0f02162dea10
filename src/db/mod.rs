//! SQLite persistence for engine events.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository for storing and querying emitted events

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{Repository, StoredEvent};
