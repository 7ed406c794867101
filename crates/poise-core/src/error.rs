//! Error types for Poise

use crate::commands::party::PartyRole;
use thiserror::Error;

/// Result type alias using Poise's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Poise error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Project not found for Project Number: {0}")]
    ProjectNotFound(i64),

    #[error("No {role} is linked to Project Number {project_num}.")]
    PartyNotFound { role: PartyRole, project_num: i64 },

    #[error("Project Number {0} already exists.")]
    ProjectExists(i64),

    // Lifecycle errors (E100-E199)
    #[error("Project {0} is already finalized.")]
    AlreadyFinalized(i64),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("The database returned no generated id for the new {0}.")]
    MissingGeneratedId(PartyRole),

    // User errors (E700-E799)
    #[error("User cancelled operation")]
    UserCancelled,

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "E001",
            Self::PartyNotFound { .. } => "E002",
            Self::ProjectExists(_) => "E003",
            Self::AlreadyFinalized(_) => "E100",
            Self::DatabaseError(_) => "E400",
            Self::MissingGeneratedId(_) => "E401",
            Self::UserCancelled => "E700",
            Self::InvalidInput(_) => "E800",
            Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ProjectNotFound(_) => {
                Some("Use option 5 to list incomplete projects and their numbers".to_string())
            }
            Self::PartyNotFound { role, .. } => Some(format!(
                "Assign a new {} to the project from the edit menu",
                role
            )),
            Self::ProjectExists(_) => Some("Choose an unused project number".to_string()),
            _ => None,
        }
    }
}
