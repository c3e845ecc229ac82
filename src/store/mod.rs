//! The reporting store: persistence contract consumed by the triage core.
//!
//! Implementations must make counter updates and the one-upvote-per-fingerprint
//! rule atomic on their side; the core never read-modify-writes `upvotes_count`.

pub mod memory;
pub mod postgres;

use crate::error::{AppError, AppResult};
use crate::models::{Category, IssueModel, IssueStatus};
use crate::utils::GeoPoint;
use async_trait::async_trait;
use chrono::NaiveDateTime;

pub use memory::MemoryIssueStore;
pub use postgres::PgIssueStore;

/// Fields of a report that passed (or was flagged by) the spam gate.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: GeoPoint,
    pub location_name: Option<String>,
    pub street_address: Option<String>,
    pub landmark: Option<String>,
    pub image_url: Option<String>,
    pub is_spam: bool,
    pub duplicate_of: Option<i32>,
    pub priority_score: f64,
    pub submitter_fingerprint: Option<String>,
    pub created_at: NaiveDateTime,
}

impl NewIssue {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        GeoPoint::new(self.location.lat, self.location.lng).map_err(AppError::Validation)?;
        if !self.priority_score.is_finite() || self.priority_score < 0.0 {
            return Err(AppError::Validation(
                "priority_score must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update. `None` leaves a column untouched; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub status: Option<IssueStatus>,
    pub is_spam: Option<bool>,
    pub duplicate_of: Option<Option<i32>>,
    pub assigned_to: Option<Option<String>>,
    pub public_notes: Option<Option<String>>,
    pub priority_score: Option<f64>,
    pub upvotes_count: Option<i32>,
    pub response_time_seconds: Option<Option<i64>>,
    pub resolved_at: Option<Option<NaiveDateTime>>,
}

impl IssuePatch {
    pub fn score(score: f64) -> Self {
        Self {
            priority_score: Some(score),
            ..Default::default()
        }
    }
}

/// Store-side filter. Every set field must match; results are ordered by ascending id.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub is_spam: Option<bool>,
    pub status: Option<IssueStatus>,
    pub exclude_status: Option<IssueStatus>,
    pub category: Option<Category>,
    pub duplicate_of: Option<i32>,
    /// Only issues that are not themselves duplicates.
    pub canonical_only: bool,
}

impl IssueFilter {
    /// Candidate pool for duplicate resolution: open, non-spam, canonical issues.
    pub fn merge_pool() -> Self {
        Self {
            is_spam: Some(false),
            exclude_status: Some(IssueStatus::Resolved),
            canonical_only: true,
            ..Default::default()
        }
    }

    pub fn duplicates_of(target_id: i32) -> Self {
        Self {
            duplicate_of: Some(target_id),
            ..Default::default()
        }
    }

    pub fn open() -> Self {
        Self {
            exclude_status: Some(IssueStatus::Resolved),
            ..Default::default()
        }
    }

    pub fn matches(&self, issue: &IssueModel) -> bool {
        if let Some(spam) = self.is_spam {
            if issue.is_spam != spam {
                return false;
            }
        }
        if let Some(status) = self.status {
            if issue.status() != status {
                return false;
            }
        }
        if let Some(excluded) = self.exclude_status {
            if issue.status() == excluded {
                return false;
            }
        }
        if let Some(category) = self.category {
            if issue.category() != category {
                return false;
            }
        }
        if let Some(target) = self.duplicate_of {
            if issue.duplicate_of != Some(target) {
                return false;
            }
        }
        if self.canonical_only && issue.duplicate_of.is_some() {
            return false;
        }
        true
    }
}

#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Fails with `Validation` when required fields are missing or malformed.
    async fn create_issue(&self, new: NewIssue) -> AppResult<IssueModel>;

    /// Fails with `NotFound` for an unknown id.
    async fn get_issue(&self, id: i32) -> AppResult<IssueModel>;

    async fn list_issues(&self, filter: &IssueFilter) -> AppResult<Vec<IssueModel>>;

    /// Applies the patch and bumps `updated_at`. Fails with `NotFound` for an unknown id.
    async fn update_issue(&self, id: i32, patch: IssuePatch) -> AppResult<IssueModel>;

    /// Non-spam issues whose `duplicate_of` points at `target_id`.
    async fn count_duplicates(&self, target_id: i32) -> AppResult<u64>;

    async fn count_recent_submissions(
        &self,
        fingerprint: &str,
        since: NaiveDateTime,
    ) -> AppResult<u64>;

    /// Inserts the vote and increments the cached count atomically; returns the new count.
    /// Fails with `Conflict` when the pair already exists, `NotFound` for an unknown issue.
    async fn create_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<i32>;

    /// Removes the vote and decrements the cached count atomically; `None` when there
    /// was no vote to remove.
    async fn delete_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<Option<i32>>;

    async fn has_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<bool>;

    /// Authoritative count from the upvote rows.
    async fn count_upvotes(&self, issue_id: i32) -> AppResult<i32>;

    async fn ping(&self) -> bool;
}
