use crate::config::triage::TriageConfig;
use crate::error::AppResult;
use crate::models::IssueModel;
use crate::services::cache::CacheService;
use crate::services::duplicate::DuplicateResolver;
use crate::services::priority::PriorityScorer;
use crate::services::proximity::ProximityFilter;
use crate::services::similarity::SimilarityMatcher;
use crate::services::spam::SpamClassifier;
use crate::store::{IssuePatch, IssueStore};
use crate::websocket::{ChangeEvent, FeedMessage, IssueHub, ScoreDelta};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Scores closer than this are treated as unchanged.
const SCORE_EPSILON: f64 = 1e-9;

/// One async mutex per issue id. Guards are owned so they can cross `.await`
/// and spawned tasks.
#[derive(Clone, Default)]
pub struct IssueLocks {
    inner: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl IssueLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, issue_id: i32) -> OwnedMutexGuard<()> {
        let mutex = self
            .inner
            .entry(issue_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Locks two distinct issues in ascending id order.
    pub async fn lock_pair(&self, a: i32, b: i32) -> (OwnedMutexGuard<()>, OwnedMutexGuard<()>) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let first = self.lock(low).await;
        let second = self.lock(high).await;
        if a <= b {
            (first, second)
        } else {
            (second, first)
        }
    }
}

/// Everything the triage services share for the lifetime of the process.
#[derive(Clone)]
pub struct TriageContext {
    pub store: Arc<dyn IssueStore>,
    pub hub: IssueHub,
    pub cache: Option<CacheService>,
    pub locks: IssueLocks,
    pub config: TriageConfig,
}

impl TriageContext {
    pub fn new(store: Arc<dyn IssueStore>, hub: IssueHub, config: TriageConfig) -> Self {
        Self {
            store,
            hub,
            cache: None,
            locks: IssueLocks::new(),
            config,
        }
    }

    pub fn with_cache(mut self, cache: Option<CacheService>) -> Self {
        self.cache = cache;
        self
    }

    pub fn scorer(&self) -> PriorityScorer {
        PriorityScorer::new(self.config.priority)
    }

    pub fn matcher(&self) -> SimilarityMatcher {
        SimilarityMatcher::new(self.config.dedup.category_bonus)
    }

    pub fn proximity(&self) -> ProximityFilter {
        ProximityFilter::new(self.config.dedup.radius_meters)
    }

    pub fn resolver(&self) -> DuplicateResolver {
        DuplicateResolver::new(&self.config.dedup)
    }

    pub fn spam(&self) -> SpamClassifier {
        SpamClassifier::new(self.config.spam)
    }

    /// Fresh score from current store state, ignoring the freeze.
    pub async fn compute_score(&self, issue: &IssueModel) -> AppResult<f64> {
        let duplicates = self.store.count_duplicates(issue.id).await?;
        let now = chrono::Utc::now().naive_utc();
        Ok(self.scorer().score(issue, duplicates, now))
    }

    /// Recomputes and stores the score of `issue_id`. The caller must hold that
    /// issue's lock. Resolved issues are returned untouched.
    pub async fn refresh_score(&self, issue_id: i32) -> AppResult<IssueModel> {
        let issue = self.store.get_issue(issue_id).await?;
        if issue.status().freezes_score() {
            return Ok(issue);
        }

        let score = self.compute_score(&issue).await?;
        if (score - issue.priority_score).abs() < SCORE_EPSILON {
            return Ok(issue);
        }

        let updated = self
            .store
            .update_issue(issue_id, IssuePatch::score(score))
            .await?;
        tracing::debug!(
            "Issue {} rescored {:.3} -> {:.3}",
            issue_id,
            issue.priority_score,
            score
        );
        self.publish_score(issue_id, score);
        Ok(updated)
    }

    /// `refresh_score` under the issue's own lock.
    pub async fn refresh_score_locked(&self, issue_id: i32) -> AppResult<IssueModel> {
        let _guard = self.locks.lock(issue_id).await;
        self.refresh_score(issue_id).await
    }

    pub fn publish_score(&self, issue_id: i32, new_score: f64) {
        self.hub.broadcast(&FeedMessage::ScoreDelta(ScoreDelta {
            issue_id,
            new_score,
        }));
    }

    /// Broadcasts a committed change and drops cached analytics.
    pub async fn publish(&self, event: ChangeEvent) {
        self.hub.broadcast(&FeedMessage::Change(event));
        if let Some(cache) = &self.cache {
            cache.invalidate_analytics().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_issue_lock_is_exclusive() {
        let locks = IssueLocks::new();
        let guard = locks.lock(1).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = contender.lock(1).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn different_issues_do_not_block() {
        let locks = IssueLocks::new();
        let _a = locks.lock(1).await;
        tokio::time::timeout(Duration::from_millis(100), locks.lock(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn pair_lock_returns_guards_in_argument_order() {
        let locks = IssueLocks::new();
        let (_b, _a) = locks.lock_pair(5, 2).await;
        assert!(tokio::time::timeout(Duration::from_millis(20), locks.lock(2))
            .await
            .is_err());
    }
}
