//! Service-level checks that don't need HTTP: degraded store paths and the
//! change feed.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use civic_triage::config::triage::TriageConfig;
use civic_triage::error::{AppError, AppResult};
use civic_triage::models::{Category, IssueModel, IssueStatus};
use civic_triage::services::issue::{IssueReport, SubmitOutcome};
use civic_triage::services::{IssueService, ModerationService, TriageContext, UpvoteService};
use civic_triage::store::{IssueFilter, IssuePatch, IssueStore, MemoryIssueStore, NewIssue};
use civic_triage::utils::GeoPoint;
use civic_triage::websocket::IssueHub;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Delegates to the in-process store but can fail the read paths used before persisting.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryIssueStore,
    fail_rate_window: AtomicBool,
    fail_pool: AtomicBool,
}

fn unavailable() -> AppError {
    AppError::StoreUnavailable("connection reset".to_string())
}

#[async_trait]
impl IssueStore for FlakyStore {
    async fn create_issue(&self, new: NewIssue) -> AppResult<IssueModel> {
        self.inner.create_issue(new).await
    }

    async fn get_issue(&self, id: i32) -> AppResult<IssueModel> {
        self.inner.get_issue(id).await
    }

    async fn list_issues(&self, filter: &IssueFilter) -> AppResult<Vec<IssueModel>> {
        if self.fail_pool.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.list_issues(filter).await
    }

    async fn update_issue(&self, id: i32, patch: IssuePatch) -> AppResult<IssueModel> {
        self.inner.update_issue(id, patch).await
    }

    async fn count_duplicates(&self, target_id: i32) -> AppResult<u64> {
        self.inner.count_duplicates(target_id).await
    }

    async fn count_recent_submissions(
        &self,
        fingerprint: &str,
        since: NaiveDateTime,
    ) -> AppResult<u64> {
        if self.fail_rate_window.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.count_recent_submissions(fingerprint, since).await
    }

    async fn create_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<i32> {
        self.inner.create_upvote(issue_id, user_ip).await
    }

    async fn delete_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<Option<i32>> {
        self.inner.delete_upvote(issue_id, user_ip).await
    }

    async fn has_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<bool> {
        self.inner.has_upvote(issue_id, user_ip).await
    }

    async fn count_upvotes(&self, issue_id: i32) -> AppResult<i32> {
        self.inner.count_upvotes(issue_id).await
    }

    async fn ping(&self) -> bool {
        !self.fail_pool.load(Ordering::SeqCst)
    }
}

fn context(store: Arc<dyn IssueStore>) -> TriageContext {
    TriageContext::new(store, IssueHub::new(), TriageConfig::default())
}

fn main_st(lat: f64, lng: f64) -> IssueReport {
    IssueReport {
        title: "Pothole on Main St".to_string(),
        description: "Deep pothole near the crosswalk".to_string(),
        category: Category::Pothole,
        latitude: lat,
        longitude: lng,
        location_name: Some("Main St".to_string()),
        street_address: None,
        landmark: None,
        image_url: None,
    }
}

#[tokio::test]
async fn test_rate_window_failure_allows_report_with_warning() {
    let store = Arc::new(FlakyStore::default());
    store.fail_rate_window.store(true, Ordering::SeqCst);
    let service = IssueService::new(context(store.clone()));

    let outcome = service.submit(main_st(40.0, -75.0), "device-a").await.unwrap();
    match outcome {
        SubmitOutcome::Created { issue, warnings } => {
            assert!(!issue.issue.is_spam);
            assert_eq!(warnings.len(), 1);
        }
        other => panic!("expected a created issue, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pool_failure_stores_report_as_unique() {
    let store = Arc::new(FlakyStore::default());
    let service = IssueService::new(context(store.clone()));

    let first = service.submit(main_st(40.0, -75.0), "device-a").await.unwrap();
    assert!(matches!(first, SubmitOutcome::Created { .. }));

    store.fail_pool.store(true, Ordering::SeqCst);
    let second = service
        .submit(main_st(40.0001, -75.0001), "device-b")
        .await
        .unwrap();
    match second {
        SubmitOutcome::Created { issue, warnings } => {
            assert!(issue.issue.duplicate_of.is_none());
            assert!(warnings[0].contains("Duplicate check unavailable"));
        }
        other => panic!("expected a created issue, got {:?}", other),
    }
}

#[tokio::test]
async fn test_store_failure_surfaces_as_retryable() {
    let store = Arc::new(FlakyStore::default());
    store.fail_pool.store(true, Ordering::SeqCst);
    let ctx = context(store);

    let err = ModerationService::new(ctx).rescore_all().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(
        err.public_message(),
        "Service temporarily unavailable, please try again"
    );
}

#[tokio::test]
async fn test_mutations_are_broadcast_to_subscribers() {
    let ctx = context(Arc::new(MemoryIssueStore::new()));
    let (_conn, mut rx) = ctx.hub.subscribe();

    let created = IssueService::new(ctx.clone())
        .submit(main_st(40.0, -75.0), "device-a")
        .await
        .unwrap();
    let SubmitOutcome::Created { issue, .. } = created else {
        panic!("expected a created issue");
    };
    let id = issue.issue.id;

    let insert: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(insert["type"], "change");
    assert_eq!(insert["data"]["event_type"], "insert");
    assert_eq!(insert["data"]["entity"], "issue");
    assert_eq!(insert["data"]["issue_id"], id);

    UpvoteService::new(ctx.clone())
        .toggle(id, "device-b")
        .await
        .unwrap();

    let mut saw_delta = false;
    let mut saw_upvote = false;
    while let Ok(raw) = rx.try_recv() {
        let msg: Value = serde_json::from_str(&raw).unwrap();
        match msg["type"].as_str() {
            Some("score_delta") => {
                assert_eq!(msg["data"]["issue_id"], id);
                saw_delta = true;
            }
            Some("change") if msg["data"]["entity"] == "upvote" => saw_upvote = true,
            _ => {}
        }
    }
    assert!(saw_delta, "score change was not published");
    assert!(saw_upvote, "upvote event was not published");
}

#[tokio::test]
async fn test_duplicate_of_flagged_duplicate_stops_counting() {
    let ctx = context(Arc::new(MemoryIssueStore::new()));
    let service = IssueService::new(ctx.clone());

    let SubmitOutcome::Created { issue, .. } =
        service.submit(main_st(40.0, -75.0), "device-a").await.unwrap()
    else {
        panic!("expected a created issue");
    };
    let canonical = issue.issue.id;

    let SubmitOutcome::Duplicate { issue_id: dup, .. } = service
        .submit(main_st(40.0003, -75.0003), "device-b")
        .await
        .unwrap()
    else {
        panic!("expected a duplicate");
    };

    let before = ctx.store.get_issue(canonical).await.unwrap().priority_score;
    ModerationService::new(ctx.clone())
        .set_spam(dup, true)
        .await
        .unwrap();

    assert_eq!(ctx.store.count_duplicates(canonical).await.unwrap(), 0);
    let after = ctx.store.get_issue(canonical).await.unwrap().priority_score;
    assert!(after < before);
}

#[tokio::test]
async fn test_oversized_spam_window_does_not_break_submit() {
    let mut config = TriageConfig::default();
    config.spam.window_seconds = 10_000_000_000_000;
    let ctx = TriageContext::new(Arc::new(MemoryIssueStore::new()), IssueHub::new(), config);
    let service = IssueService::new(ctx);

    let outcome = service.submit(main_st(40.0, -75.0), "device-a").await.unwrap();
    match outcome {
        SubmitOutcome::Created { issue, .. } => assert!(!issue.issue.is_spam),
        other => panic!("expected a created issue, got {:?}", other),
    }
}

#[tokio::test]
async fn test_re_resolving_measures_response_time_from_creation() {
    let ctx = context(Arc::new(MemoryIssueStore::new()));
    let created_at = chrono::Utc::now().naive_utc() - Duration::days(3);
    let issue = ctx
        .store
        .create_issue(NewIssue {
            title: "Broken streetlight".to_string(),
            description: "Light on the corner has been out all week".to_string(),
            category: Category::BrokenStreetlight,
            location: GeoPoint::new(40.0, -75.0).unwrap(),
            location_name: None,
            street_address: None,
            landmark: None,
            image_url: None,
            is_spam: false,
            duplicate_of: None,
            priority_score: 0.0,
            submitter_fingerprint: None,
            created_at,
        })
        .await
        .unwrap();
    let moderation = ModerationService::new(ctx.clone());
    let three_days = Duration::days(3).num_seconds();

    let first = moderation
        .set_status(issue.id, IssueStatus::Resolved, None)
        .await
        .unwrap();
    let first_elapsed = first.response_time_seconds.unwrap();
    let first_resolved_at = first.resolved_at.unwrap();
    assert!(first_elapsed >= three_days && first_elapsed < three_days + 60);

    let reopened = moderation
        .set_status(issue.id, IssueStatus::New, None)
        .await
        .unwrap();
    assert_eq!(reopened.status(), IssueStatus::New);
    assert!(reopened.resolved_at.is_none());
    assert!(reopened.response_time_seconds.is_none());

    let second = moderation
        .set_status(issue.id, IssueStatus::Resolved, None)
        .await
        .unwrap();
    let second_elapsed = second.response_time_seconds.unwrap();
    assert!(second_elapsed >= first_elapsed);
    assert!(second_elapsed < three_days + 60, "response time accumulated");
    assert!(second.resolved_at.unwrap() >= first_resolved_at);
}
