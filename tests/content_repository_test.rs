use bulletin::{
    domain::{Collection, ContentPayload, CreateAdminRequest, SortOrder},
    error::AppError,
    repository::{AdminRepository, ContentRepository, SqliteAdminRepository, SqliteContentRepository},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

async fn test_pool() -> anyhow::Result<SqlitePool> {
    // One connection so every query sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

fn payload(title: &str, start: DateTime<Utc>, end: DateTime<Utc>, written: DateTime<Utc>) -> ContentPayload {
    ContentPayload {
        title: title.to_string(),
        content: format!("{} details", title),
        start_date: start,
        end_date: end,
        updated_at: written,
    }
}

#[tokio::test]
async fn test_content_crud() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteContentRepository::new(pool.clone());

    // Create
    let created = repo
        .create(Collection::Events, payload("Career fair", at(10, 8), at(10, 17), at(1, 12)))
        .await?;
    assert_eq!(created.collection, Collection::Events);
    assert_eq!(created.created_at, at(1, 12));
    assert_eq!(created.updated_at, at(1, 12));

    // Find by ID, scoped to the collection
    let found = repo.find_by_id(Collection::Events, created.id).await?;
    assert_eq!(found, Some(created.clone()));
    assert!(repo.find_by_id(Collection::Announcements, created.id).await?.is_none());

    // Update overwrites the body and keeps created_at
    let updated = repo
        .update(
            Collection::Events,
            created.id,
            payload("Career fair (moved)", at(11, 8), at(11, 17), at(2, 9)),
        )
        .await?;
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "Career fair (moved)");
    assert_eq!(updated.start_date, at(11, 8));
    assert_eq!(updated.created_at, at(1, 12));
    assert_eq!(updated.updated_at, at(2, 9));

    // Delete
    assert!(repo.delete(Collection::Events, created.id).await?);
    assert!(repo.find_by_id(Collection::Events, created.id).await?.is_none());

    // Deleting again removes nothing
    assert!(!repo.delete(Collection::Events, created.id).await?);

    Ok(())
}

#[tokio::test]
async fn test_update_of_missing_document_is_not_found() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteContentRepository::new(pool);

    let err = repo
        .update(
            Collection::Announcements,
            Uuid::new_v4(),
            payload("Ghost", at(1, 0), at(2, 0), at(1, 0)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_list_orders_and_started_filter() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteContentRepository::new(pool);
    let written = at(1, 0);

    repo.create(Collection::Announcements, payload("second", at(5, 9), at(20, 0), written)).await?;
    repo.create(Collection::Announcements, payload("first", at(3, 9), at(20, 0), written)).await?;
    repo.create(Collection::Announcements, payload("future", at(15, 9), at(20, 0), written)).await?;

    let desc = repo.list(Collection::Announcements, SortOrder::StartDesc).await?;
    let titles: Vec<&str> = desc.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["future", "second", "first"]);

    let asc = repo.list(Collection::Announcements, SortOrder::StartAsc).await?;
    assert_eq!(asc[0].title, "first");

    let started = repo
        .list_started(Collection::Announcements, at(10, 0), SortOrder::StartDesc)
        .await?;
    let titles: Vec<&str> = started.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["second", "first"]);

    // The start bound is inclusive
    let at_start = repo
        .list_started(Collection::Announcements, at(15, 9), SortOrder::StartAsc)
        .await?;
    assert_eq!(at_start.len(), 3);

    // Collections never mix
    assert!(repo.list(Collection::Events, SortOrder::StartAsc).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_sub_second_dates_survive_storage() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteContentRepository::new(pool);

    let start = at(1, 9) + Duration::milliseconds(250);
    let created = repo
        .create(Collection::Events, payload("Precise", start, start + Duration::hours(1), start))
        .await?;
    assert_eq!(created.start_date, start);

    Ok(())
}

#[tokio::test]
async fn test_admin_accounts() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteAdminRepository::new(pool);

    let admin = repo
        .create(CreateAdminRequest {
            email: "  Registrar@Campus.edu ".to_string(),
            password: "correct horse".to_string(),
        })
        .await?;
    assert_eq!(admin.email, "registrar@campus.edu");

    let found = repo.find_by_email("REGISTRAR@campus.edu").await?;
    assert_eq!(found.map(|a| a.id), Some(admin.id));
    assert!(repo.find_by_id(admin.id).await?.is_some());
    assert!(repo.password_hash("registrar@campus.edu").await?.is_some());

    let duplicate = repo
        .create(CreateAdminRequest {
            email: "registrar@campus.edu".to_string(),
            password: "another".to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    Ok(())
}
