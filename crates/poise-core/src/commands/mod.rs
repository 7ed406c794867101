//! Poise commands
//!
//! Repositories over the project database. Each takes a `&Database` and
//! issues its own statements; none of them hold state between calls.

pub mod party;
pub mod project;
pub mod queries;

pub use party::{Party, PartyDetails, PartyRepository, PartyRole};
pub use project::{
    DeletedProject, PartyChoice, PartyChoices, PartyIds, Project, ProjectDetail, ProjectFields,
    ProjectRepository,
};
pub use queries::{ProjectSummary, QueryCatalog};
