//! Runs only when TEST_DATABASE_URL points at a disposable Postgres database.

use civic_triage::error::AppError;
use civic_triage::models::Category;
use civic_triage::store::{IssueFilter, IssuePatch, IssueStore, NewIssue, PgIssueStore};
use civic_triage::utils::GeoPoint;
use sea_orm::{ConnectionTrait, Statement};
use sea_orm_migration::MigratorTrait;
use tokio::sync::OnceCell;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

async fn store() -> Option<PgIssueStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let db = sea_orm::Database::connect(&url)
        .await
        .expect("Failed to connect to test database");

    MIGRATED
        .get_or_init(|| async {
            civic_triage::migration::Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");
            db.execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                "TRUNCATE TABLE issue_upvotes, issues RESTART IDENTITY CASCADE".to_string(),
            ))
            .await
            .expect("Failed to clean tables");
        })
        .await;

    Some(PgIssueStore::new(db))
}

fn new_issue(title: &str, fingerprint: &str) -> NewIssue {
    NewIssue {
        title: title.to_string(),
        description: "Deep pothole near the crosswalk".to_string(),
        category: Category::Pothole,
        location: GeoPoint::new(40.0, -75.0).unwrap(),
        location_name: None,
        street_address: None,
        landmark: None,
        image_url: None,
        is_spam: false,
        duplicate_of: None,
        priority_score: 7.0,
        submitter_fingerprint: Some(fingerprint.to_string()),
        created_at: chrono::Utc::now().naive_utc(),
    }
}

#[tokio::test]
async fn test_pg_upvote_pair_is_unique_and_counted() {
    let Some(store) = store().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let issue = store
        .create_issue(new_issue("Pothole on Main St", "pg-upvote"))
        .await
        .unwrap();

    assert_eq!(store.create_upvote(issue.id, "fp-1").await.unwrap(), 1);
    let err = store.create_upvote(issue.id, "fp-1").await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(store.create_upvote(issue.id, "fp-2").await.unwrap(), 2);

    assert!(store.has_upvote(issue.id, "fp-1").await.unwrap());
    assert_eq!(store.delete_upvote(issue.id, "fp-1").await.unwrap(), Some(1));
    assert_eq!(store.delete_upvote(issue.id, "fp-1").await.unwrap(), None);
    assert_eq!(store.count_upvotes(issue.id).await.unwrap(), 1);

    assert!(matches!(
        store.create_upvote(i32::MAX, "fp-1").await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_pg_duplicates_and_filters() {
    let Some(store) = store().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let canonical = store
        .create_issue(new_issue("Canonical pothole", "pg-dup"))
        .await
        .unwrap();
    let mut dup = new_issue("Duplicate pothole", "pg-dup");
    dup.duplicate_of = Some(canonical.id);
    let dup = store.create_issue(dup).await.unwrap();

    assert_eq!(store.count_duplicates(canonical.id).await.unwrap(), 1);
    let linked = store
        .list_issues(&IssueFilter::duplicates_of(canonical.id))
        .await
        .unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id, dup.id);

    let pool = store.list_issues(&IssueFilter::merge_pool()).await.unwrap();
    assert!(pool.iter().any(|i| i.id == canonical.id));
    assert!(pool.iter().all(|i| i.id != dup.id));

    store
        .update_issue(
            dup.id,
            IssuePatch {
                is_spam: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(store.count_duplicates(canonical.id).await.unwrap(), 0);

    let since = chrono::Utc::now().naive_utc() - chrono::Duration::minutes(10);
    assert!(store.count_recent_submissions("pg-dup", since).await.unwrap() >= 2);
    assert!(store.ping().await);
}
