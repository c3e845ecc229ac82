use super::{IssueFilter, IssuePatch, IssueStore, NewIssue};
use crate::error::{AppError, AppResult};
use crate::models::{IssueModel, IssueUpvoteModel};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    next_id: i32,
    issues: BTreeMap<i32, IssueModel>,
    upvotes: HashMap<(i32, String), IssueUpvoteModel>,
}

/// In-process store. Every operation runs under one lock, so counter updates and
/// the unique (issue, fingerprint) rule are atomic just like the Postgres store.
#[derive(Default)]
pub struct MemoryIssueStore {
    state: RwLock<MemoryState>,
}

impl MemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    async fn create_issue(&self, new: NewIssue) -> AppResult<IssueModel> {
        new.validate()?;
        let mut state = self.state.write().await;

        if let Some(target) = new.duplicate_of {
            if !state.issues.contains_key(&target) {
                return Err(AppError::Validation(format!(
                    "duplicate_of references unknown issue {}",
                    target
                )));
            }
        }

        state.next_id += 1;
        let id = state.next_id;
        let issue = IssueModel {
            id,
            title: new.title,
            description: new.description,
            category: new.category.as_str().to_string(),
            latitude: new.location.lat,
            longitude: new.location.lng,
            location_name: new.location_name,
            street_address: new.street_address,
            landmark: new.landmark,
            image_url: new.image_url,
            is_spam: new.is_spam,
            duplicate_of: new.duplicate_of,
            priority_score: new.priority_score,
            upvotes_count: 0,
            status: crate::models::IssueStatus::New.as_str().to_string(),
            assigned_to: None,
            response_time_seconds: None,
            public_notes: None,
            submitter_fingerprint: new.submitter_fingerprint,
            created_at: new.created_at,
            updated_at: new.created_at,
            resolved_at: None,
        };
        state.issues.insert(id, issue.clone());
        Ok(issue)
    }

    async fn get_issue(&self, id: i32) -> AppResult<IssueModel> {
        let state = self.state.read().await;
        state.issues.get(&id).cloned().ok_or(AppError::NotFound)
    }

    async fn list_issues(&self, filter: &IssueFilter) -> AppResult<Vec<IssueModel>> {
        let state = self.state.read().await;
        Ok(state
            .issues
            .values()
            .filter(|issue| filter.matches(issue))
            .cloned()
            .collect())
    }

    async fn update_issue(&self, id: i32, patch: IssuePatch) -> AppResult<IssueModel> {
        let mut state = self.state.write().await;

        if let Some(Some(target)) = patch.duplicate_of {
            if target == id {
                return Err(AppError::Validation(
                    "an issue cannot be a duplicate of itself".to_string(),
                ));
            }
            if !state.issues.contains_key(&target) {
                return Err(AppError::Validation(format!(
                    "duplicate_of references unknown issue {}",
                    target
                )));
            }
        }

        let issue = state.issues.get_mut(&id).ok_or(AppError::NotFound)?;
        apply_patch(issue, patch);
        Ok(issue.clone())
    }

    async fn count_duplicates(&self, target_id: i32) -> AppResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .issues
            .values()
            .filter(|i| i.duplicate_of == Some(target_id) && !i.is_spam)
            .count() as u64)
    }

    async fn count_recent_submissions(
        &self,
        fingerprint: &str,
        since: NaiveDateTime,
    ) -> AppResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .issues
            .values()
            .filter(|i| {
                i.submitter_fingerprint.as_deref() == Some(fingerprint) && i.created_at >= since
            })
            .count() as u64)
    }

    async fn create_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<i32> {
        let mut state = self.state.write().await;
        if !state.issues.contains_key(&issue_id) {
            return Err(AppError::NotFound);
        }

        let key = (issue_id, user_ip.to_string());
        if state.upvotes.contains_key(&key) {
            return Err(AppError::Conflict(
                "Issue already upvoted by this submitter".to_string(),
            ));
        }
        state.upvotes.insert(
            key,
            IssueUpvoteModel {
                id: uuid::Uuid::new_v4(),
                issue_id,
                user_ip: user_ip.to_string(),
                created_at: chrono::Utc::now().naive_utc(),
            },
        );

        let issue = state.issues.get_mut(&issue_id).ok_or(AppError::NotFound)?;
        issue.upvotes_count += 1;
        Ok(issue.upvotes_count)
    }

    async fn delete_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<Option<i32>> {
        let mut state = self.state.write().await;
        if state
            .upvotes
            .remove(&(issue_id, user_ip.to_string()))
            .is_none()
        {
            return Ok(None);
        }

        let issue = state.issues.get_mut(&issue_id).ok_or(AppError::NotFound)?;
        issue.upvotes_count = (issue.upvotes_count - 1).max(0);
        Ok(Some(issue.upvotes_count))
    }

    async fn has_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state.upvotes.contains_key(&(issue_id, user_ip.to_string())))
    }

    async fn count_upvotes(&self, issue_id: i32) -> AppResult<i32> {
        let state = self.state.read().await;
        if !state.issues.contains_key(&issue_id) {
            return Err(AppError::NotFound);
        }
        Ok(state
            .upvotes
            .keys()
            .filter(|(id, _)| *id == issue_id)
            .count() as i32)
    }

    async fn ping(&self) -> bool {
        true
    }
}

fn apply_patch(issue: &mut IssueModel, patch: IssuePatch) {
    if let Some(status) = patch.status {
        issue.status = status.as_str().to_string();
    }
    if let Some(spam) = patch.is_spam {
        issue.is_spam = spam;
    }
    if let Some(dup) = patch.duplicate_of {
        issue.duplicate_of = dup;
    }
    if let Some(assignee) = patch.assigned_to {
        issue.assigned_to = assignee;
    }
    if let Some(notes) = patch.public_notes {
        issue.public_notes = notes;
    }
    if let Some(score) = patch.priority_score {
        issue.priority_score = score;
    }
    if let Some(count) = patch.upvotes_count {
        issue.upvotes_count = count.max(0);
    }
    if let Some(rt) = patch.response_time_seconds {
        issue.response_time_seconds = rt;
    }
    if let Some(at) = patch.resolved_at {
        issue.resolved_at = at;
    }
    issue.updated_at = chrono::Utc::now().naive_utc();
}
