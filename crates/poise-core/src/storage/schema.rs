//! Table definitions
//!
//! The schema is created idempotently on open. There is no version tracking;
//! every statement uses `IF NOT EXISTS`.

use sqlx::SqlitePool;

/// Party tables. The three roles share one shape.
const PARTY_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS customer (
        customer_id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_name TEXT NOT NULL,
        customer_cell_num TEXT NOT NULL,
        customer_email TEXT NOT NULL,
        customer_address TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS architect (
        architect_id INTEGER PRIMARY KEY AUTOINCREMENT,
        architect_name TEXT NOT NULL,
        architect_cell_num TEXT NOT NULL,
        architect_email TEXT NOT NULL,
        architect_address TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS contractor (
        contractor_id INTEGER PRIMARY KEY AUTOINCREMENT,
        contractor_name TEXT NOT NULL,
        contractor_cell_num TEXT NOT NULL,
        contractor_email TEXT NOT NULL,
        contractor_address TEXT NOT NULL
    );
"#;

/// Project table, the aggregate root.
///
/// `finalized` is NULL until the project is finalized and the completion
/// date is written in the same statement, which the CHECK pins down.
const PROJECT_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS project (
        project_num INTEGER PRIMARY KEY NOT NULL,
        project_name TEXT NOT NULL,
        building_type TEXT NOT NULL,
        physical_address TEXT NOT NULL,
        erf_num INTEGER NOT NULL,
        total_fee INTEGER NOT NULL,
        total_paid INTEGER NOT NULL,
        project_deadline DATE NOT NULL,
        finalized BOOLEAN CHECK (finalized IS NULL OR finalized = 1),
        completion_date DATE,
        customer_id INTEGER NOT NULL REFERENCES customer(customer_id),
        architect_id INTEGER NOT NULL REFERENCES architect(architect_id),
        contractor_id INTEGER NOT NULL REFERENCES contractor(contractor_id),
        CHECK ((finalized IS NULL) = (completion_date IS NULL))
    );

    CREATE INDEX IF NOT EXISTS idx_project_customer_id ON project(customer_id);
    CREATE INDEX IF NOT EXISTS idx_project_architect_id ON project(architect_id);
    CREATE INDEX IF NOT EXISTS idx_project_contractor_id ON project(contractor_id);
    CREATE INDEX IF NOT EXISTS idx_project_deadline ON project(project_deadline);
"#;

/// Create all tables that do not exist yet
pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::raw_sql(PARTY_TABLES).execute(&mut *tx).await?;
    sqlx::raw_sql(PROJECT_TABLE).execute(&mut *tx).await?;
    tx.commit().await?;

    tracing::debug!("schema initialized");
    Ok(())
}

/// Names of the user tables currently in the database
pub async fn table_names(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}
