//! Storage layer - SQLite
//!
//! # Architecture
//!
//! - `database`: the single connection handle and its configuration
//! - `schema`: idempotent table creation
//!
//! # Usage
//!
//! ```ignore
//! use poise_core::storage::{Database, DatabaseConfig};
//!
//! // In-memory database for testing
//! let db = Database::in_memory().await?;
//!
//! // File-backed database
//! let db = Database::new(DatabaseConfig::with_path("poise.db")).await?;
//! ```

pub mod database;
pub mod schema;

pub use database::{Database, DatabaseConfig, default_database_path};
