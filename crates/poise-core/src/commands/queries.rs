//! Canned project filters

use crate::Result;
use crate::storage::Database;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One line of a project listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectSummary {
    pub project_num: i64,
    pub name: String,
    pub deadline: NaiveDate,
}

/// Read-only project listings
pub struct QueryCatalog<'a> {
    db: &'a Database,
}

impl<'a> QueryCatalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Projects that have not been finalized
    pub async fn incomplete(&self) -> Result<Vec<ProjectSummary>> {
        let rows = sqlx::query_as::<_, ProjectSummary>(
            r#"
            SELECT project_num, project_name AS name, project_deadline AS deadline
            FROM project
            WHERE finalized IS NULL
            ORDER BY project_num
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }

    /// Projects whose deadline is strictly before `today`.
    ///
    /// Finalized projects are included: a project completed after its
    /// deadline still shows up here.
    pub async fn overdue(&self, today: NaiveDate) -> Result<Vec<ProjectSummary>> {
        let rows = sqlx::query_as::<_, ProjectSummary>(
            r#"
            SELECT project_num, project_name AS name, project_deadline AS deadline
            FROM project
            WHERE project_deadline < ?
            ORDER BY project_num
            "#,
        )
        .bind(today)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }
}
