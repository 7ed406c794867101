//! Poise Core Integration Tests

use chrono::NaiveDate;
use poise_core::commands::PartyIds;
use poise_core::prelude::*;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fields(name: &str, deadline: NaiveDate) -> ProjectFields {
    ProjectFields {
        name: name.to_string(),
        building_type: "House".to_string(),
        physical_address: "3 Oak Ave".to_string(),
        erf_num: 1201,
        total_fee: 900_000,
        total_paid: 0,
        deadline,
    }
}

async fn fresh_party(db: &Database, tag: &str, role: PartyRole) -> i64 {
    PartyRepository::new(db)
        .create(
            role,
            &PartyDetails::new(
                format!("{tag} {role}"),
                "0831112222",
                format!("{tag}.{}@example.com", role.table()),
                format!("{tag} street"),
            ),
        )
        .await
        .expect("Failed to create party")
}

async fn fresh_parties(db: &Database, tag: &str) -> PartyIds {
    PartyIds {
        customer: fresh_party(db, tag, PartyRole::Customer).await,
        architect: fresh_party(db, tag, PartyRole::Architect).await,
        contractor: fresh_party(db, tag, PartyRole::Contractor).await,
    }
}

async fn row_count(db: &Database, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap();
    n
}

#[tokio::test]
async fn test_project_lifecycle_end_to_end() {
    let db = Database::in_memory().await.expect("Failed to create database");
    let projects = ProjectRepository::new(&db);

    let parties = fresh_parties(&db, "Lifecycle").await;
    projects
        .create(100, &fields("Riverside", date(2031, 1, 31)), parties)
        .await
        .expect("Failed to create project 100");

    let detail = projects.fetch(100).await.expect("Failed to fetch project 100");
    assert_eq!(detail.project.fields.name, "Riverside");
    assert_eq!(detail.customer.as_ref().unwrap().name, "Lifecycle Customer");
    assert_eq!(detail.architect.as_ref().unwrap().name, "Lifecycle Architect");
    assert_eq!(
        detail.contractor.as_ref().unwrap().email,
        "Lifecycle.contractor@example.com"
    );

    projects
        .finalize_on(100, date(2026, 10, 19))
        .await
        .expect("First finalize should succeed");
    assert!(matches!(
        projects.finalize_on(100, date(2026, 10, 20)).await,
        Err(Error::AlreadyFinalized(100))
    ));

    let deleted = projects.delete(100).await.expect("Failed to delete project");
    assert_eq!(deleted.removed.len(), 3);

    assert!(matches!(
        projects.fetch(100).await,
        Err(Error::ProjectNotFound(100))
    ));
    for table in ["project", "customer", "architect", "contractor"] {
        assert_eq!(row_count(&db, table).await, 0, "{table} should be empty");
    }
}

#[tokio::test]
async fn test_cascading_delete_leaves_no_orphans() {
    let db = Database::in_memory().await.unwrap();
    let projects = ProjectRepository::new(&db);

    for (num, tag) in [(1, "One"), (2, "Two"), (3, "Three")] {
        let parties = fresh_parties(&db, tag).await;
        projects
            .create(num, &fields(tag, date(2030, 1, 1)), parties)
            .await
            .unwrap();
    }

    projects.delete(2).await.unwrap();

    // Every remaining party is referenced by a remaining project
    for role in PartyRole::ALL {
        let sql = format!(
            "SELECT COUNT(*) FROM {table} WHERE {id} NOT IN (SELECT {id} FROM project)",
            table = role.table(),
            id = role.id_column()
        );
        let (orphans,): (i64,) = sqlx::query_as(&sql).fetch_one(db.pool()).await.unwrap();
        assert_eq!(orphans, 0, "orphaned {role} rows");
        assert_eq!(row_count(&db, role.table()).await, 2);
    }

    let remaining = QueryCatalog::new(&db).incomplete().await.unwrap();
    let nums: Vec<i64> = remaining.iter().map(|p| p.project_num).collect();
    assert_eq!(nums, vec![1, 3]);
}

#[tokio::test]
async fn test_edit_flow_reassigns_and_updates_parties() {
    let db = Database::in_memory().await.unwrap();
    let projects = ProjectRepository::new(&db);
    let parties = PartyRepository::new(&db);

    let original = fresh_parties(&db, "Old").await;
    projects
        .create(8, &fields("Mill", date(2029, 9, 9)), original)
        .await
        .unwrap();

    let new_architect = parties
        .assign_new(
            8,
            PartyRole::Architect,
            &PartyDetails::new("Fresh Architect", "1", "fa@example.com", "Studio"),
        )
        .await
        .unwrap();
    parties
        .update_for_project(
            8,
            PartyRole::Customer,
            &PartyDetails::new("Renamed Customer", "2", "rc@example.com", "Home"),
        )
        .await
        .unwrap();

    let detail = projects.fetch(8).await.unwrap();
    assert_eq!(detail.project.architect_id, new_architect);
    assert_eq!(detail.architect.unwrap().name, "Fresh Architect");
    assert_eq!(detail.customer.unwrap().name, "Renamed Customer");
    assert_eq!(detail.contractor.unwrap().id, original.contractor);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("poise.db");

    {
        let db = Database::new(DatabaseConfig::with_path(&path)).await.unwrap();
        let parties = fresh_parties(&db, "Persist").await;
        ProjectRepository::new(&db)
            .create(55, &fields("Depot", date(2020, 5, 5)), parties)
            .await
            .unwrap();
        db.close().await;
    }

    let db = Database::new(DatabaseConfig::with_path(&path)).await.unwrap();
    let overdue = QueryCatalog::new(&db)
        .overdue(date(2026, 1, 1))
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].name, "Depot");
}
