//! Party records: customers, architects and contractors
//!
//! The three roles live in separate tables of identical shape. A role is a
//! closed enum; everything that differs between the tables (names and the
//! statements that touch them) sits in a static lookup table indexed by the
//! role, so no SQL is assembled at runtime.

use crate::storage::Database;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqliteExecutor};
use std::fmt;

/// The role a party plays on a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Customer,
    Architect,
    Contractor,
}

/// Table layout and statements for one role
#[derive(Debug)]
struct RoleSql {
    label: &'static str,
    table: &'static str,
    id_column: &'static str,
    insert: &'static str,
    select: &'static str,
    update_via_project: &'static str,
    current: &'static str,
    reassign: &'static str,
    delete_if_unreferenced: &'static str,
}

/// Indexed by `PartyRole as usize`.
static ROLE_SQL: [RoleSql; 3] = [
    RoleSql {
        label: "Customer",
        table: "customer",
        id_column: "customer_id",
        insert: "INSERT INTO customer (customer_name, customer_cell_num, customer_email, customer_address) \
                 VALUES (?, ?, ?, ?) RETURNING customer_id",
        select: "SELECT customer_id AS id, customer_name AS name, customer_cell_num AS cell_number, \
                 customer_email AS email, customer_address AS address \
                 FROM customer WHERE customer_id = ?",
        update_via_project: "UPDATE customer SET customer_name = ?, customer_cell_num = ?, customer_email = ?, customer_address = ? \
                             WHERE customer_id = (SELECT customer_id FROM project WHERE project_num = ?)",
        current: "SELECT customer_id FROM project WHERE project_num = ?",
        reassign: "UPDATE project SET customer_id = ? WHERE project_num = ?",
        delete_if_unreferenced: "DELETE FROM customer WHERE customer_id = ? \
                                 AND NOT EXISTS (SELECT 1 FROM project WHERE customer_id = ?)",
    },
    RoleSql {
        label: "Architect",
        table: "architect",
        id_column: "architect_id",
        insert: "INSERT INTO architect (architect_name, architect_cell_num, architect_email, architect_address) \
                 VALUES (?, ?, ?, ?) RETURNING architect_id",
        select: "SELECT architect_id AS id, architect_name AS name, architect_cell_num AS cell_number, \
                 architect_email AS email, architect_address AS address \
                 FROM architect WHERE architect_id = ?",
        update_via_project: "UPDATE architect SET architect_name = ?, architect_cell_num = ?, architect_email = ?, architect_address = ? \
                             WHERE architect_id = (SELECT architect_id FROM project WHERE project_num = ?)",
        current: "SELECT architect_id FROM project WHERE project_num = ?",
        reassign: "UPDATE project SET architect_id = ? WHERE project_num = ?",
        delete_if_unreferenced: "DELETE FROM architect WHERE architect_id = ? \
                                 AND NOT EXISTS (SELECT 1 FROM project WHERE architect_id = ?)",
    },
    RoleSql {
        label: "Contractor",
        table: "contractor",
        id_column: "contractor_id",
        insert: "INSERT INTO contractor (contractor_name, contractor_cell_num, contractor_email, contractor_address) \
                 VALUES (?, ?, ?, ?) RETURNING contractor_id",
        select: "SELECT contractor_id AS id, contractor_name AS name, contractor_cell_num AS cell_number, \
                 contractor_email AS email, contractor_address AS address \
                 FROM contractor WHERE contractor_id = ?",
        update_via_project: "UPDATE contractor SET contractor_name = ?, contractor_cell_num = ?, contractor_email = ?, contractor_address = ? \
                             WHERE contractor_id = (SELECT contractor_id FROM project WHERE project_num = ?)",
        current: "SELECT contractor_id FROM project WHERE project_num = ?",
        reassign: "UPDATE project SET contractor_id = ? WHERE project_num = ?",
        delete_if_unreferenced: "DELETE FROM contractor WHERE contractor_id = ? \
                                 AND NOT EXISTS (SELECT 1 FROM project WHERE contractor_id = ?)",
    },
];

impl PartyRole {
    /// All roles, in the order a project lists them
    pub const ALL: [PartyRole; 3] = [PartyRole::Customer, PartyRole::Architect, PartyRole::Contractor];

    fn sql(self) -> &'static RoleSql {
        &ROLE_SQL[self as usize]
    }

    /// Human-readable name ("Customer")
    pub fn label(self) -> &'static str {
        self.sql().label
    }

    /// Table holding this role's rows
    pub fn table(self) -> &'static str {
        self.sql().table
    }

    /// Primary key column of the role table, also the FK column on `project`
    pub fn id_column(self) -> &'static str {
        self.sql().id_column
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: i64,
    pub name: String,
    pub cell_number: String,
    pub email: String,
    pub address: String,
}

/// Contact fields supplied when creating or editing a party
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartyDetails {
    pub name: String,
    pub cell_number: String,
    pub email: String,
    pub address: String,
}

impl PartyDetails {
    pub fn new(
        name: impl Into<String>,
        cell_number: impl Into<String>,
        email: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cell_number: cell_number.into(),
            email: email.into(),
            address: address.into(),
        }
    }
}

/// Insert a party and return its generated id
pub(crate) async fn insert_party<'e>(
    executor: impl SqliteExecutor<'e>,
    role: PartyRole,
    details: &PartyDetails,
) -> Result<i64> {
    let id: Option<i64> = sqlx::query_scalar(role.sql().insert)
        .bind(&details.name)
        .bind(&details.cell_number)
        .bind(&details.email)
        .bind(&details.address)
        .fetch_optional(executor)
        .await?;

    id.ok_or(Error::MissingGeneratedId(role))
}

/// Load one party row
pub(crate) async fn fetch_party<'e>(
    executor: impl SqliteExecutor<'e>,
    role: PartyRole,
    id: i64,
) -> Result<Option<Party>> {
    let row = sqlx::query(role.sql().select)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|r| Party {
        id: r.get("id"),
        name: r.get("name"),
        cell_number: r.get("cell_number"),
        email: r.get("email"),
        address: r.get("address"),
    }))
}

/// The party a project points at for `role`; `None` when the project is absent
async fn project_party_id<'e>(
    executor: impl SqliteExecutor<'e>,
    project_num: i64,
    role: PartyRole,
) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar(role.sql().current)
        .bind(project_num)
        .fetch_optional(executor)
        .await?;

    Ok(id)
}

/// Point the project's FK for `role` at `party_id`, then delete the party it
/// pointed at before unless another project still references it.
///
/// Returns the id of the deleted previous party, if one was deleted.
async fn repoint(
    conn: &mut SqliteConnection,
    project_num: i64,
    role: PartyRole,
    party_id: i64,
) -> Result<Option<i64>> {
    let previous = project_party_id(&mut *conn, project_num, role)
        .await?
        .ok_or(Error::ProjectNotFound(project_num))?;

    sqlx::query(role.sql().reassign)
        .bind(party_id)
        .bind(project_num)
        .execute(&mut *conn)
        .await?;

    if previous != party_id && delete_if_unreferenced(&mut *conn, role, previous).await? {
        tracing::debug!(%role, previous, "replaced party deleted");
        return Ok(Some(previous));
    }
    Ok(None)
}

/// Delete a party unless some project still references it. Returns whether
/// the row was removed.
pub(crate) async fn delete_if_unreferenced<'e>(
    executor: impl SqliteExecutor<'e>,
    role: PartyRole,
    party_id: i64,
) -> Result<bool> {
    let result = sqlx::query(role.sql().delete_if_unreferenced)
        .bind(party_id)
        .bind(party_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn project_exists<'e>(
    executor: impl SqliteExecutor<'e>,
    project_num: i64,
) -> Result<bool> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM project WHERE project_num = ?")
        .bind(project_num)
        .fetch_optional(executor)
        .await?;

    Ok(row.is_some())
}

/// Party repository for database operations
pub struct PartyRepository<'a> {
    db: &'a Database,
}

impl<'a> PartyRepository<'a> {
    /// Create a new party repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a party and return its generated id
    pub async fn create(&self, role: PartyRole, details: &PartyDetails) -> Result<i64> {
        let id = insert_party(self.db.pool(), role, details).await?;
        tracing::info!(%role, id, "party created");
        Ok(id)
    }

    /// Get a party by id
    pub async fn get(&self, role: PartyRole, id: i64) -> Result<Option<Party>> {
        fetch_party(self.db.pool(), role, id).await
    }

    /// Overwrite the contact fields of the party a project points at
    pub async fn update_for_project(
        &self,
        project_num: i64,
        role: PartyRole,
        details: &PartyDetails,
    ) -> Result<()> {
        if !project_exists(self.db.pool(), project_num).await? {
            return Err(Error::ProjectNotFound(project_num));
        }

        let result = sqlx::query(role.sql().update_via_project)
            .bind(&details.name)
            .bind(&details.cell_number)
            .bind(&details.email)
            .bind(&details.address)
            .bind(project_num)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::PartyNotFound { role, project_num });
        }

        tracing::info!(%role, project_num, "party updated");
        Ok(())
    }

    /// Point a project at an existing party.
    ///
    /// The party it pointed at before is deleted unless another project
    /// still references it.
    pub async fn reassign(&self, project_num: i64, role: PartyRole, party_id: i64) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        let retired = repoint(&mut *tx, project_num, role, party_id).await?;
        tx.commit().await?;

        tracing::info!(%role, project_num, party_id, ?retired, "party reassigned");
        Ok(())
    }

    /// Create a new party and point the project at it, atomically. The
    /// replaced party is handled as in [`reassign`](Self::reassign).
    pub async fn assign_new(
        &self,
        project_num: i64,
        role: PartyRole,
        details: &PartyDetails,
    ) -> Result<i64> {
        let mut tx = self.db.pool().begin().await?;

        if !project_exists(&mut *tx, project_num).await? {
            return Err(Error::ProjectNotFound(project_num));
        }

        let party_id = insert_party(&mut *tx, role, details).await?;
        let retired = repoint(&mut *tx, project_num, role, party_id).await?;
        tx.commit().await?;

        tracing::info!(%role, project_num, party_id, ?retired, "new party assigned");
        Ok(party_id)
    }
}
