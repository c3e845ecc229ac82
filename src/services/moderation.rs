use crate::error::{AppError, AppResult};
use crate::models::{IssueModel, IssueStatus};
use crate::services::context::TriageContext;
use crate::store::{IssueFilter, IssuePatch};
use crate::utils::optional_text;
use crate::websocket::{ChangeEvent, EventType};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RescoreSummary {
    pub scanned: usize,
    pub updated: usize,
}

/// Admin-only mutations. Callers have already passed the admin capability check.
pub struct ModerationService {
    ctx: TriageContext,
}

impl ModerationService {
    pub fn new(ctx: TriageContext) -> Self {
        Self { ctx }
    }

    /// Moves an issue to any other workflow state. Entering `resolved` takes one final
    /// score, stamps the response time and freezes the score; leaving it clears both
    /// stamps and resumes scoring.
    pub async fn set_status(
        &self,
        issue_id: i32,
        next: IssueStatus,
        expected: Option<IssueStatus>,
    ) -> AppResult<IssueModel> {
        let guard = self.ctx.locks.lock(issue_id).await;
        let issue = self.ctx.store.get_issue(issue_id).await?;
        let current = issue.status();

        if let Some(expected) = expected {
            if expected != current {
                return Err(AppError::Conflict(format!(
                    "Issue status is {}, not {}",
                    current, expected
                )));
            }
        }
        if current == next {
            return Ok(issue);
        }

        let now = chrono::Utc::now().naive_utc();
        let updated = if next == IssueStatus::Resolved {
            let score = self.ctx.compute_score(&issue).await?;
            let elapsed = (now - issue.created_at).num_seconds().max(0);
            let patch = IssuePatch {
                status: Some(next),
                priority_score: Some(score),
                response_time_seconds: Some(Some(elapsed)),
                resolved_at: Some(Some(now)),
                ..Default::default()
            };
            let updated = self.ctx.store.update_issue(issue_id, patch).await?;
            if (score - issue.priority_score).abs() > f64::EPSILON {
                self.ctx.publish_score(issue_id, score);
            }
            updated
        } else {
            let patch = IssuePatch {
                status: Some(next),
                response_time_seconds: Some(None),
                resolved_at: Some(None),
                ..Default::default()
            };
            self.ctx.store.update_issue(issue_id, patch).await?;
            self.ctx.refresh_score(issue_id).await?
        };
        drop(guard);

        tracing::info!("Issue {} status {} -> {}", issue_id, current, next);
        self.publish_update(&updated, json!({ "status": next, "previous_status": current }))
            .await;
        Ok(updated)
    }

    /// Flagging a canonical issue detaches its duplicates so nothing points at spam.
    /// Flagging or clearing a duplicate rescores the issue it points at.
    pub async fn set_spam(&self, issue_id: i32, is_spam: bool) -> AppResult<IssueModel> {
        let guard = self.ctx.locks.lock(issue_id).await;
        let issue = self.ctx.store.get_issue(issue_id).await?;
        if issue.is_spam == is_spam {
            return Ok(issue);
        }

        let patch = IssuePatch {
            is_spam: Some(is_spam),
            ..Default::default()
        };
        self.ctx.store.update_issue(issue_id, patch).await?;
        drop(guard);

        tracing::info!("Issue {} spam flag set to {}", issue_id, is_spam);

        let mut detached = Vec::new();
        if is_spam && issue.duplicate_of.is_none() {
            let duplicates = self
                .ctx
                .store
                .list_issues(&IssueFilter::duplicates_of(issue_id))
                .await?;
            for dup in duplicates {
                let _dup_guard = self.ctx.locks.lock(dup.id).await;
                let patch = IssuePatch {
                    duplicate_of: Some(None),
                    ..Default::default()
                };
                self.ctx.store.update_issue(dup.id, patch).await?;
                detached.push(dup.id);
            }
            if !detached.is_empty() {
                tracing::info!(
                    "Detached {} duplicates from spam issue {}",
                    detached.len(),
                    issue_id
                );
            }
        }

        if let Some(target) = issue.duplicate_of {
            self.ctx.refresh_score_locked(target).await?;
        }
        let updated = self.ctx.refresh_score_locked(issue_id).await?;

        self.publish_update(&updated, json!({ "is_spam": is_spam, "detached": detached }))
            .await;
        Ok(updated)
    }

    /// Blank assignee clears the assignment.
    pub async fn assign(&self, issue_id: i32, assignee: Option<String>) -> AppResult<IssueModel> {
        let assignee = optional_text(assignee.as_deref());
        let guard = self.ctx.locks.lock(issue_id).await;
        let patch = IssuePatch {
            assigned_to: Some(assignee.clone()),
            ..Default::default()
        };
        let updated = self.ctx.store.update_issue(issue_id, patch).await?;
        drop(guard);

        tracing::info!("Issue {} assigned to {:?}", issue_id, assignee);
        self.publish_update(&updated, json!({ "assigned_to": assignee }))
            .await;
        Ok(updated)
    }

    /// Markup is stripped; blank notes clear the field.
    pub async fn set_notes(&self, issue_id: i32, notes: Option<String>) -> AppResult<IssueModel> {
        let notes = optional_text(notes.as_deref());
        let guard = self.ctx.locks.lock(issue_id).await;
        let patch = IssuePatch {
            public_notes: Some(notes.clone()),
            ..Default::default()
        };
        let updated = self.ctx.store.update_issue(issue_id, patch).await?;
        drop(guard);

        self.publish_update(&updated, json!({ "public_notes": notes }))
            .await;
        Ok(updated)
    }

    /// Manual merge of `issue_id` into `target_id`. Rejects chains, self links and
    /// spam targets.
    pub async fn link_duplicate(&self, issue_id: i32, target_id: i32) -> AppResult<IssueModel> {
        if issue_id == target_id {
            return Err(AppError::Validation(
                "An issue cannot be a duplicate of itself".to_string(),
            ));
        }

        let (guard, target_guard) = self.ctx.locks.lock_pair(issue_id, target_id).await;
        let issue = self.ctx.store.get_issue(issue_id).await?;
        let target = self.ctx.store.get_issue(target_id).await?;

        if issue.duplicate_of == Some(target_id) {
            return Ok(issue);
        }
        if target.duplicate_of.is_some() {
            return Err(AppError::Validation(format!(
                "Issue {} is itself a duplicate; link to its canonical issue instead",
                target_id
            )));
        }
        if target.is_spam {
            return Err(AppError::Validation(format!(
                "Issue {} is flagged as spam and cannot be a merge target",
                target_id
            )));
        }
        let own_duplicates = self
            .ctx
            .store
            .list_issues(&IssueFilter::duplicates_of(issue_id))
            .await?;
        if !own_duplicates.is_empty() {
            return Err(AppError::Validation(format!(
                "Issue {} has {} duplicates of its own; unlink them first",
                issue_id,
                own_duplicates.len()
            )));
        }

        let patch = IssuePatch {
            duplicate_of: Some(Some(target_id)),
            ..Default::default()
        };
        let updated = self.ctx.store.update_issue(issue_id, patch).await?;
        self.ctx.refresh_score(target_id).await?;
        drop(target_guard);
        drop(guard);

        if let Some(previous) = issue.duplicate_of {
            self.ctx.refresh_score_locked(previous).await?;
        }

        tracing::info!("Issue {} merged into {}", issue_id, target_id);
        self.publish_update(&updated, json!({ "duplicate_of": target_id }))
            .await;
        Ok(updated)
    }

    pub async fn unlink_duplicate(&self, issue_id: i32) -> AppResult<IssueModel> {
        let guard = self.ctx.locks.lock(issue_id).await;
        let issue = self.ctx.store.get_issue(issue_id).await?;
        let Some(previous) = issue.duplicate_of else {
            return Ok(issue);
        };

        let patch = IssuePatch {
            duplicate_of: Some(None),
            ..Default::default()
        };
        let updated = self.ctx.store.update_issue(issue_id, patch).await?;
        drop(guard);

        self.ctx.refresh_score_locked(previous).await?;

        tracing::info!("Issue {} unlinked from {}", issue_id, previous);
        self.publish_update(&updated, json!({ "duplicate_of": null, "previous": previous }))
            .await;
        Ok(updated)
    }

    /// Re-derives the cached upvote count from the vote rows, then rescores.
    pub async fn reconcile(&self, issue_id: i32) -> AppResult<IssueModel> {
        let guard = self.ctx.locks.lock(issue_id).await;
        let issue = self.ctx.store.get_issue(issue_id).await?;
        let actual = self.ctx.store.count_upvotes(issue_id).await?;

        if actual != issue.upvotes_count {
            tracing::warn!(
                "Issue {} cached upvotes {} differ from {} rows, repairing",
                issue_id,
                issue.upvotes_count,
                actual
            );
            let patch = IssuePatch {
                upvotes_count: Some(actual),
                ..Default::default()
            };
            self.ctx.store.update_issue(issue_id, patch).await?;
        }
        let updated = self.ctx.refresh_score(issue_id).await?;
        drop(guard);

        if actual != issue.upvotes_count {
            self.publish_update(&updated, json!({ "upvotes_count": actual }))
                .await;
        }
        Ok(updated)
    }

    /// Age-dependent scores drift between events; this refreshes every open issue.
    pub async fn rescore_all(&self) -> AppResult<RescoreSummary> {
        let open = self.ctx.store.list_issues(&IssueFilter::open()).await?;
        let mut updated = 0;

        for issue in &open {
            let fresh = match self.ctx.refresh_score_locked(issue.id).await {
                Ok(fresh) => fresh,
                Err(AppError::NotFound) => continue,
                Err(e) => return Err(e),
            };
            if (fresh.priority_score - issue.priority_score).abs() > f64::EPSILON {
                updated += 1;
            }
        }

        tracing::info!("Rescored {} open issues, {} changed", open.len(), updated);
        Ok(RescoreSummary {
            scanned: open.len(),
            updated,
        })
    }

    async fn publish_update(&self, issue: &IssueModel, payload: serde_json::Value) {
        self.ctx
            .publish(ChangeEvent::issue(EventType::Update, issue.id, payload))
            .await;
    }
}
