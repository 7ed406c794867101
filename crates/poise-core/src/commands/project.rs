//! Project management commands
//!
//! CRUD, finalization and cascading delete for construction projects. A
//! project is identified by its caller-assigned `project_num` and points at
//! one customer, one architect and one contractor.

use crate::commands::party::{self, Party, PartyDetails, PartyRole};
use crate::commands::queries::{ProjectSummary, QueryCatalog};
use crate::storage::Database;
use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqliteExecutor, Transaction};

const PROJECT_COLUMNS: &str = "p.project_num, p.project_name, p.building_type, p.physical_address, \
     p.erf_num, p.total_fee, p.total_paid, p.project_deadline, p.finalized, p.completion_date, \
     p.customer_id, p.architect_id, p.contractor_id";

/// The seven mutable project columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFields {
    pub name: String,
    pub building_type: String,
    pub physical_address: String,
    pub erf_num: i64,
    pub total_fee: i64,
    pub total_paid: i64,
    pub deadline: NaiveDate,
}

/// Ids of the three parties a project points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyIds {
    pub customer: i64,
    pub architect: i64,
    pub contractor: i64,
}

impl PartyIds {
    /// Id for a given role
    pub fn get(&self, role: PartyRole) -> i64 {
        match role {
            PartyRole::Customer => self.customer,
            PartyRole::Architect => self.architect,
            PartyRole::Contractor => self.contractor,
        }
    }
}

/// Where a new project's party comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyChoice {
    /// A party already on record
    Existing(i64),
    /// A party created together with the project
    New(PartyDetails),
}

/// Party choices for all three roles of a new project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyChoices {
    pub customer: PartyChoice,
    pub architect: PartyChoice,
    pub contractor: PartyChoice,
}

impl PartyChoices {
    pub fn get(&self, role: PartyRole) -> &PartyChoice {
        match role {
            PartyRole::Customer => &self.customer,
            PartyRole::Architect => &self.architect,
            PartyRole::Contractor => &self.contractor,
        }
    }
}

/// A stored project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_num: i64,
    pub fields: ProjectFields,
    /// Stored as NULL until finalized
    pub finalized: bool,
    pub completion_date: Option<NaiveDate>,
    pub customer_id: i64,
    pub architect_id: i64,
    pub contractor_id: i64,
}

impl Project {
    fn unfinalized(project_num: i64, fields: &ProjectFields, parties: PartyIds) -> Self {
        Self {
            project_num,
            fields: fields.clone(),
            finalized: false,
            completion_date: None,
            customer_id: parties.customer,
            architect_id: parties.architect,
            contractor_id: parties.contractor,
        }
    }

    pub fn party_ids(&self) -> PartyIds {
        PartyIds {
            customer: self.customer_id,
            architect: self.architect_id,
            contractor: self.contractor_id,
        }
    }
}

/// A project joined with its parties.
///
/// A party is `None` when the project's FK points at a row that no longer
/// exists; the project itself is still returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub customer: Option<Party>,
    pub architect: Option<Party>,
    pub contractor: Option<Party>,
}

impl ProjectDetail {
    pub fn party(&self, role: PartyRole) -> Option<&Party> {
        match role {
            PartyRole::Customer => self.customer.as_ref(),
            PartyRole::Architect => self.architect.as_ref(),
            PartyRole::Contractor => self.contractor.as_ref(),
        }
    }
}

/// What a cascading delete removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedProject {
    pub project_num: i64,
    /// Party rows deleted with the project
    pub removed: Vec<(PartyRole, i64)>,
    /// Party rows kept because another project still references them
    pub kept: Vec<(PartyRole, i64)>,
}

/// Project repository for database operations
pub struct ProjectRepository<'a> {
    db: &'a Database,
}

impl<'a> ProjectRepository<'a> {
    /// Create a new project repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new project pointing at existing parties
    pub async fn create(
        &self,
        project_num: i64,
        fields: &ProjectFields,
        parties: PartyIds,
    ) -> Result<Project> {
        if self.exists(project_num).await? {
            return Err(Error::ProjectExists(project_num));
        }

        insert_project(self.db.pool(), project_num, fields, parties).await?;
        tracing::info!(project_num, "project created");

        Ok(Project::unfinalized(project_num, fields, parties))
    }

    /// Insert a new project along with any new parties it needs.
    ///
    /// Existing parties must be on record (`InvalidInput` otherwise). New
    /// parties and the project row are written in one transaction, so a
    /// failure leaves no party behind.
    pub async fn create_with_parties(
        &self,
        project_num: i64,
        fields: &ProjectFields,
        choices: &PartyChoices,
    ) -> Result<Project> {
        let mut tx = self.db.pool().begin().await?;

        match create_cascade(&mut *tx, project_num, fields, choices).await {
            Ok(project) => {
                tx.commit().await?;
                tracing::info!(project_num, "project created with its parties");
                Ok(project)
            }
            Err(e) => {
                roll_back(tx, project_num, "create", &e).await;
                Err(e)
            }
        }
    }

    /// Get the bare project row
    pub async fn get(&self, project_num: i64) -> Result<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM project p WHERE p.project_num = ?");
        let row = sqlx::query(&sql)
            .bind(project_num)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|r| row_to_project(&r)))
    }

    /// Get a project with its customer, architect and contractor
    pub async fn fetch(&self, project_num: i64) -> Result<ProjectDetail> {
        let sql = format!(
            r#"
            SELECT {PROJECT_COLUMNS},
                c.customer_id AS customer_party_id, c.customer_name AS customer_party_name,
                c.customer_cell_num AS customer_party_cell, c.customer_email AS customer_party_email,
                c.customer_address AS customer_party_address,
                a.architect_id AS architect_party_id, a.architect_name AS architect_party_name,
                a.architect_cell_num AS architect_party_cell, a.architect_email AS architect_party_email,
                a.architect_address AS architect_party_address,
                k.contractor_id AS contractor_party_id, k.contractor_name AS contractor_party_name,
                k.contractor_cell_num AS contractor_party_cell, k.contractor_email AS contractor_party_email,
                k.contractor_address AS contractor_party_address
            FROM project p
            LEFT JOIN customer c ON c.customer_id = p.customer_id
            LEFT JOIN architect a ON a.architect_id = p.architect_id
            LEFT JOIN contractor k ON k.contractor_id = p.contractor_id
            WHERE p.project_num = ?
            "#
        );

        let row = sqlx::query(&sql)
            .bind(project_num)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(Error::ProjectNotFound(project_num))?;

        Ok(ProjectDetail {
            project: row_to_project(&row),
            customer: joined_party(&row, PartyRole::Customer),
            architect: joined_party(&row, PartyRole::Architect),
            contractor: joined_party(&row, PartyRole::Contractor),
        })
    }

    /// Check if a project exists
    pub async fn exists(&self, project_num: i64) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM project WHERE project_num = ?")
            .bind(project_num)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.is_some())
    }

    /// Overwrite the seven mutable columns
    pub async fn update(&self, project_num: i64, fields: &ProjectFields) -> Result<()> {
        if !self.exists(project_num).await? {
            return Err(Error::ProjectNotFound(project_num));
        }

        sqlx::query(
            r#"
            UPDATE project
            SET project_name = ?, building_type = ?, physical_address = ?, erf_num = ?,
                total_fee = ?, total_paid = ?, project_deadline = ?
            WHERE project_num = ?
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.building_type)
        .bind(&fields.physical_address)
        .bind(fields.erf_num)
        .bind(fields.total_fee)
        .bind(fields.total_paid)
        .bind(fields.deadline)
        .bind(project_num)
        .execute(self.db.pool())
        .await?;

        tracing::info!(project_num, "project updated");
        Ok(())
    }

    /// Finalize a project with today's local date as completion date
    pub async fn finalize(&self, project_num: i64) -> Result<NaiveDate> {
        let today = Local::now().date_naive();
        self.finalize_on(project_num, today).await?;
        Ok(today)
    }

    /// Finalize a project with the given completion date.
    ///
    /// The existence check, the already-finalized check and the write run in
    /// one transaction.
    pub async fn finalize_on(&self, project_num: i64, completion_date: NaiveDate) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        let row: Option<(Option<bool>,)> =
            sqlx::query_as("SELECT finalized FROM project WHERE project_num = ?")
                .bind(project_num)
                .fetch_optional(&mut *tx)
                .await?;

        match row {
            None => return Err(Error::ProjectNotFound(project_num)),
            Some((Some(true),)) => return Err(Error::AlreadyFinalized(project_num)),
            Some(_) => {}
        }

        sqlx::query(
            "UPDATE project SET finalized = 1, completion_date = ? WHERE project_num = ?",
        )
        .bind(completion_date)
        .bind(project_num)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(project_num, %completion_date, "project finalized");
        Ok(())
    }

    /// Delete a project together with its three parties.
    ///
    /// Parties are resolved from the project's own FK columns. A party still
    /// referenced by another project is kept. Everything happens in one
    /// transaction; on failure nothing is deleted.
    pub async fn delete(&self, project_num: i64) -> Result<DeletedProject> {
        let mut tx = self.db.pool().begin().await?;

        match delete_cascade(&mut *tx, project_num).await {
            Ok(deleted) => {
                tx.commit().await?;
                tracing::info!(
                    project_num,
                    removed = deleted.removed.len(),
                    kept = deleted.kept.len(),
                    "project deleted"
                );
                Ok(deleted)
            }
            Err(e) => {
                roll_back(tx, project_num, "delete", &e).await;
                Err(e)
            }
        }
    }

    /// Projects not yet finalized
    pub async fn list_incomplete(&self) -> Result<Vec<ProjectSummary>> {
        QueryCatalog::new(self.db).incomplete().await
    }

    /// Projects whose deadline is before today, finalized or not
    pub async fn list_overdue(&self) -> Result<Vec<ProjectSummary>> {
        QueryCatalog::new(self.db)
            .overdue(Local::now().date_naive())
            .await
    }
}

/// Roll back after `error`. A failed rollback is logged; the caller keeps
/// returning the original error.
async fn roll_back(tx: Transaction<'_, Sqlite>, project_num: i64, action: &str, error: &Error) {
    tracing::warn!(project_num, %error, "project {action} rolled back");
    if let Err(rollback_error) = tx.rollback().await {
        tracing::error!(
            project_num,
            error = %rollback_error,
            "project {action} rollback failed"
        );
    }
}

async fn insert_project<'e>(
    executor: impl SqliteExecutor<'e>,
    project_num: i64,
    fields: &ProjectFields,
    parties: PartyIds,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO project (
            project_num, project_name, building_type, physical_address, erf_num,
            total_fee, total_paid, project_deadline, architect_id, contractor_id, customer_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(project_num)
    .bind(&fields.name)
    .bind(&fields.building_type)
    .bind(&fields.physical_address)
    .bind(fields.erf_num)
    .bind(fields.total_fee)
    .bind(fields.total_paid)
    .bind(fields.deadline)
    .bind(parties.architect)
    .bind(parties.contractor)
    .bind(parties.customer)
    .execute(executor)
    .await?;

    Ok(())
}

async fn create_cascade(
    conn: &mut SqliteConnection,
    project_num: i64,
    fields: &ProjectFields,
    choices: &PartyChoices,
) -> Result<Project> {
    if party::project_exists(&mut *conn, project_num).await? {
        return Err(Error::ProjectExists(project_num));
    }

    let mut ids = [0_i64; 3];
    for (slot, role) in ids.iter_mut().zip(PartyRole::ALL) {
        *slot = match choices.get(role) {
            PartyChoice::Existing(id) => {
                if party::fetch_party(&mut *conn, role, *id).await?.is_none() {
                    return Err(Error::InvalidInput(format!("no {} with ID {}", role, id)));
                }
                *id
            }
            PartyChoice::New(details) => party::insert_party(&mut *conn, role, details).await?,
        };
    }

    let parties = PartyIds {
        customer: ids[0],
        architect: ids[1],
        contractor: ids[2],
    };
    insert_project(&mut *conn, project_num, fields, parties).await?;

    Ok(Project::unfinalized(project_num, fields, parties))
}

async fn delete_cascade(conn: &mut SqliteConnection, project_num: i64) -> Result<DeletedProject> {
    let ids: Option<(i64, i64, i64)> = sqlx::query_as(
        "SELECT customer_id, architect_id, contractor_id FROM project WHERE project_num = ?",
    )
    .bind(project_num)
    .fetch_optional(&mut *conn)
    .await?;

    let (customer, architect, contractor) = ids.ok_or(Error::ProjectNotFound(project_num))?;
    let ids = PartyIds {
        customer,
        architect,
        contractor,
    };

    sqlx::query("DELETE FROM project WHERE project_num = ?")
        .bind(project_num)
        .execute(&mut *conn)
        .await?;

    let mut deleted = DeletedProject {
        project_num,
        removed: Vec::new(),
        kept: Vec::new(),
    };

    for role in PartyRole::ALL {
        let id = ids.get(role);
        if party::delete_if_unreferenced(&mut *conn, role, id).await? {
            deleted.removed.push((role, id));
        } else {
            tracing::debug!(%role, id, "party kept, still referenced");
            deleted.kept.push((role, id));
        }
    }

    Ok(deleted)
}

fn row_to_project(row: &SqliteRow) -> Project {
    Project {
        project_num: row.get("project_num"),
        fields: ProjectFields {
            name: row.get("project_name"),
            building_type: row.get("building_type"),
            physical_address: row.get("physical_address"),
            erf_num: row.get("erf_num"),
            total_fee: row.get("total_fee"),
            total_paid: row.get("total_paid"),
            deadline: row.get("project_deadline"),
        },
        finalized: row
            .get::<Option<bool>, _>("finalized")
            .unwrap_or(false),
        completion_date: row.get("completion_date"),
        customer_id: row.get("customer_id"),
        architect_id: row.get("architect_id"),
        contractor_id: row.get("contractor_id"),
    }
}

fn joined_party(row: &SqliteRow, role: PartyRole) -> Option<Party> {
    let prefix = role.table();
    let id: Option<i64> = row.get(format!("{prefix}_party_id").as_str());

    id.map(|id| Party {
        id,
        name: row.get(format!("{prefix}_party_name").as_str()),
        cell_number: row.get(format!("{prefix}_party_cell").as_str()),
        email: row.get(format!("{prefix}_party_email").as_str()),
        address: row.get(format!("{prefix}_party_address").as_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::party::{PartyDetails, PartyRepository};
    use crate::commands::test_support::{date, sample_fields, seed_parties, seed_project};

    async fn count(db: &Database, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .expect("Failed to count rows");
        n
    }

    #[tokio::test]
    async fn test_create_project() {
        let db = Database::in_memory().await.expect("Failed to create database");
        let parties = seed_parties(&db).await;

        let project = ProjectRepository::new(&db)
            .create(100, &sample_fields(), parties)
            .await
            .expect("Failed to create project");

        assert_eq!(project.project_num, 100);
        assert!(!project.finalized);
        assert_eq!(project.completion_date, None);
        assert_eq!(project.party_ids(), parties);
    }

    #[tokio::test]
    async fn test_duplicate_project_num_error() {
        let db = Database::in_memory().await.unwrap();
        let parties = seed_project(&db, 100).await;

        let result = ProjectRepository::new(&db)
            .create(100, &sample_fields(), parties)
            .await;
        assert!(matches!(result, Err(Error::ProjectExists(100))));
    }

    #[tokio::test]
    async fn test_create_with_unknown_party_fails() {
        let db = Database::in_memory().await.unwrap();
        let parties = PartyIds {
            customer: 41,
            architect: 42,
            contractor: 43,
        };

        let result = ProjectRepository::new(&db)
            .create(1, &sample_fields(), parties)
            .await;
        assert!(matches!(result, Err(Error::DatabaseError(_))));
        assert_eq!(count(&db, "project").await, 0);
    }

    #[tokio::test]
    async fn test_fetch_joins_parties() {
        let db = Database::in_memory().await.unwrap();
        let parties = seed_project(&db, 100).await;

        let detail = ProjectRepository::new(&db)
            .fetch(100)
            .await
            .expect("Failed to fetch project");

        assert_eq!(detail.project.fields, sample_fields());
        for role in PartyRole::ALL {
            let party = detail.party(role).expect("party should be joined");
            assert_eq!(party.id, parties.get(role));
            assert_eq!(party.name, format!("{} Name", role));
        }
    }

    #[tokio::test]
    async fn test_fetch_surfaces_missing_party() {
        let db = Database::in_memory().await.unwrap();
        let parties = seed_project(&db, 100).await;

        // Simulate a row removed behind the application's back
        sqlx::query("PRAGMA foreign_keys = OFF").execute(db.pool()).await.unwrap();
        sqlx::query("DELETE FROM architect WHERE architect_id = ?")
            .bind(parties.architect)
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON").execute(db.pool()).await.unwrap();

        let detail = ProjectRepository::new(&db).fetch(100).await.unwrap();
        assert!(detail.architect.is_none());
        assert!(detail.customer.is_some());
        assert!(detail.contractor.is_some());
    }

    #[tokio::test]
    async fn test_missing_project_not_found_everywhere() {
        let db = Database::in_memory().await.unwrap();
        seed_project(&db, 1).await;
        let repo = ProjectRepository::new(&db);

        assert!(matches!(repo.fetch(2).await, Err(Error::ProjectNotFound(2))));
        assert!(matches!(
            repo.update(2, &sample_fields()).await,
            Err(Error::ProjectNotFound(2))
        ));
        assert!(matches!(
            repo.finalize_on(2, date(2026, 1, 1)).await,
            Err(Error::ProjectNotFound(2))
        ));
        assert!(matches!(repo.delete(2).await, Err(Error::ProjectNotFound(2))));
        assert!(repo.get(2).await.unwrap().is_none());

        // Nothing else changed
        assert_eq!(count(&db, "project").await, 1);
        assert_eq!(count(&db, "customer").await, 1);
        assert_eq!(count(&db, "architect").await, 1);
        assert_eq!(count(&db, "contractor").await, 1);
        assert!(!repo.get(1).await.unwrap().unwrap().finalized);
    }

    #[tokio::test]
    async fn test_update_project() {
        let db = Database::in_memory().await.unwrap();
        seed_project(&db, 7).await;
        let repo = ProjectRepository::new(&db);

        let fields = ProjectFields {
            name: "Renamed".to_string(),
            building_type: "Warehouse".to_string(),
            physical_address: "9 Dock Rd".to_string(),
            erf_num: 555,
            total_fee: 2_000_000,
            total_paid: 150_000,
            deadline: date(2031, 2, 28),
        };
        repo.update(7, &fields).await.expect("Failed to update");

        let project = repo.get(7).await.unwrap().unwrap();
        assert_eq!(project.fields, fields);
        assert!(!project.finalized);
    }

    #[tokio::test]
    async fn test_finalize_sets_flag_and_date_together() {
        let db = Database::in_memory().await.unwrap();
        seed_project(&db, 5).await;
        let repo = ProjectRepository::new(&db);

        repo.finalize_on(5, date(2026, 10, 1))
            .await
            .expect("Failed to finalize");

        let project = repo.get(5).await.unwrap().unwrap();
        assert!(project.finalized);
        assert_eq!(project.completion_date, Some(date(2026, 10, 1)));

        let (half_done,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM project WHERE finalized = 1 AND completion_date IS NULL",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(half_done, 0);
    }

    #[tokio::test]
    async fn test_finalize_twice_keeps_first_date() {
        let db = Database::in_memory().await.unwrap();
        seed_project(&db, 5).await;
        let repo = ProjectRepository::new(&db);

        repo.finalize_on(5, date(2026, 10, 1)).await.unwrap();
        let second = repo.finalize_on(5, date(2026, 12, 25)).await;
        assert!(matches!(second, Err(Error::AlreadyFinalized(5))));

        let project = repo.get(5).await.unwrap().unwrap();
        assert_eq!(project.completion_date, Some(date(2026, 10, 1)));
    }

    #[tokio::test]
    async fn test_finalize_uses_today() {
        let db = Database::in_memory().await.unwrap();
        seed_project(&db, 5).await;
        let repo = ProjectRepository::new(&db);

        let stamped = repo.finalize(5).await.unwrap();
        assert_eq!(stamped, Local::now().date_naive());
        assert_eq!(
            repo.get(5).await.unwrap().unwrap().completion_date,
            Some(stamped)
        );
    }

    #[tokio::test]
    async fn test_delete_removes_project_and_its_parties() {
        let db = Database::in_memory().await.unwrap();
        let doomed = seed_project(&db, 1).await;
        let survivor = seed_project(&db, 2).await;
        let repo = ProjectRepository::new(&db);

        let deleted = repo.delete(1).await.expect("Failed to delete");
        assert_eq!(deleted.removed.len(), 3);
        assert!(deleted.kept.is_empty());

        assert!(repo.get(1).await.unwrap().is_none());
        let parties = PartyRepository::new(&db);
        for role in PartyRole::ALL {
            assert!(parties.get(role, doomed.get(role)).await.unwrap().is_none());
            assert!(parties.get(role, survivor.get(role)).await.unwrap().is_some());
        }
        assert_eq!(count(&db, "project").await, 1);
    }

    #[tokio::test]
    async fn test_delete_keeps_shared_party() {
        let db = Database::in_memory().await.unwrap();
        let first = seed_project(&db, 1).await;
        let own = seed_parties(&db).await;
        // Project 2 reuses project 1's customer
        let shared = PartyIds {
            customer: first.customer,
            ..own
        };
        let repo = ProjectRepository::new(&db);
        repo.create(2, &sample_fields(), shared).await.unwrap();

        let deleted = repo.delete(1).await.unwrap();
        assert_eq!(deleted.kept, vec![(PartyRole::Customer, first.customer)]);
        assert_eq!(deleted.removed.len(), 2);

        let detail = repo.fetch(2).await.unwrap();
        assert_eq!(detail.customer.map(|c| c.id), Some(first.customer));
    }

    #[tokio::test]
    async fn test_delete_does_not_use_project_num_as_party_id() {
        let db = Database::in_memory().await.unwrap();
        // Parties 1..=3 belong to project 500; project 1 gets later ids
        let other = seed_project(&db, 500).await;
        let parties = PartyRepository::new(&db);
        let mut ids = Vec::new();
        for role in PartyRole::ALL {
            ids.push(
                parties
                    .create(role, &PartyDetails::new("Late", "1", "l@x", "x"))
                    .await
                    .unwrap(),
            );
        }
        let own = PartyIds {
            customer: ids[0],
            architect: ids[1],
            contractor: ids[2],
        };
        assert_ne!(own.customer, 1);
        ProjectRepository::new(&db)
            .create(1, &sample_fields(), own)
            .await
            .unwrap();

        ProjectRepository::new(&db).delete(1).await.unwrap();

        for role in PartyRole::ALL {
            assert!(parties.get(role, other.get(role)).await.unwrap().is_some());
            assert!(parties.get(role, own.get(role)).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_delete_rolls_back_on_failure() {
        let db = Database::in_memory().await.unwrap();
        let parties = seed_project(&db, 1).await;
        sqlx::query(
            "CREATE TRIGGER refuse_contractor_delete BEFORE DELETE ON contractor
             BEGIN SELECT RAISE(ABORT, 'contractor rows are locked'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let repo = ProjectRepository::new(&db);
        let result = repo.delete(1).await;
        match result {
            Err(Error::DatabaseError(e)) => {
                assert!(e.to_string().contains("contractor rows are locked"), "{e}")
            }
            other => panic!("expected the trigger's error, got {other:?}"),
        }

        // Project and the parties deleted before the failure are back
        assert!(repo.get(1).await.unwrap().is_some());
        let party_repo = PartyRepository::new(&db);
        for role in PartyRole::ALL {
            assert!(party_repo.get(role, parties.get(role)).await.unwrap().is_some());
        }
    }

    fn new_party(name: &str) -> PartyChoice {
        PartyChoice::New(PartyDetails::new(name, "0830000000", "new@example.com", "2 New St"))
    }

    #[tokio::test]
    async fn test_create_with_parties_mixes_new_and_existing() {
        let db = Database::in_memory().await.unwrap();
        let existing = seed_parties(&db).await;
        let repo = ProjectRepository::new(&db);

        let choices = PartyChoices {
            customer: new_party("Fresh Customer"),
            architect: PartyChoice::Existing(existing.architect),
            contractor: new_party("Fresh Contractor"),
        };
        let project = repo
            .create_with_parties(5, &sample_fields(), &choices)
            .await
            .expect("Failed to create project with parties");

        assert_eq!(project.architect_id, existing.architect);
        assert_ne!(project.customer_id, existing.customer);
        let detail = repo.fetch(5).await.unwrap();
        assert_eq!(detail.customer.unwrap().name, "Fresh Customer");
        assert_eq!(detail.contractor.unwrap().name, "Fresh Contractor");
        assert_eq!(count(&db, "customer").await, 2);
    }

    #[tokio::test]
    async fn test_create_with_parties_unknown_id_leaves_nothing() {
        let db = Database::in_memory().await.unwrap();
        let repo = ProjectRepository::new(&db);

        let choices = PartyChoices {
            customer: new_party("Early Customer"),
            architect: PartyChoice::Existing(404),
            contractor: new_party("Never Created"),
        };
        let result = repo.create_with_parties(6, &sample_fields(), &choices).await;

        match result {
            Err(Error::InvalidInput(msg)) => assert_eq!(msg, "no Architect with ID 404"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        for table in ["project", "customer", "architect", "contractor"] {
            assert_eq!(count(&db, table).await, 0, "{table} should be empty");
        }
    }

    #[tokio::test]
    async fn test_create_with_parties_used_number_creates_no_parties() {
        let db = Database::in_memory().await.unwrap();
        seed_project(&db, 1).await;
        let repo = ProjectRepository::new(&db);

        let choices = PartyChoices {
            customer: new_party("A"),
            architect: new_party("B"),
            contractor: new_party("C"),
        };
        let result = repo.create_with_parties(1, &sample_fields(), &choices).await;

        assert!(matches!(result, Err(Error::ProjectExists(1))));
        assert_eq!(count(&db, "customer").await, 1);
    }

    #[tokio::test]
    async fn test_list_incomplete_through_repository() {
        let db = Database::in_memory().await.unwrap();
        seed_project(&db, 1).await;
        seed_project(&db, 2).await;
        let repo = ProjectRepository::new(&db);
        repo.finalize_on(1, date(2026, 1, 1)).await.unwrap();

        let incomplete = repo.list_incomplete().await.unwrap();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].project_num, 2);
    }
}
