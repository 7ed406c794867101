//! Poise Core Library
//!
//! Storage and operations for a construction project tracker:
//! - Projects (create, fetch, update, finalize, cascading delete)
//! - Parties: the customer, architect and contractor of each project
//! - Canned listings (incomplete and overdue projects)
//! - SQLite storage and configuration

pub mod commands;
pub mod config;
pub mod error;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::{
        PartyDetails, PartyRepository, PartyRole, ProjectFields, ProjectRepository, QueryCatalog,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::storage::{Database, DatabaseConfig};
}
