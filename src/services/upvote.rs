use crate::error::AppResult;
use crate::services::context::TriageContext;
use crate::websocket::{ChangeEvent, EventType};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct UpvoteToggle {
    pub upvoted: bool,
    pub upvotes_count: i32,
    pub priority_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct UpvoteStatus {
    pub upvoted: bool,
    pub upvotes_count: i32,
}

pub struct UpvoteService {
    ctx: TriageContext,
}

impl UpvoteService {
    pub fn new(ctx: TriageContext) -> Self {
        Self { ctx }
    }

    /// Adds the fingerprint's vote, or withdraws it if present. A lost race on the
    /// unique pair is retried once.
    pub async fn toggle(&self, issue_id: i32, fingerprint: &str) -> AppResult<UpvoteToggle> {
        let guard = self.ctx.locks.lock(issue_id).await;

        let result = match self.toggle_once(issue_id, fingerprint).await {
            Err(e) if e.is_conflict() => {
                tracing::warn!("Upvote conflict on issue {}, retrying once", issue_id);
                self.toggle_once(issue_id, fingerprint).await
            }
            other => other,
        };
        let (upvoted, count) = result?;

        let issue = self.ctx.refresh_score(issue_id).await?;
        drop(guard);

        let event_type = if upvoted {
            EventType::Insert
        } else {
            EventType::Delete
        };
        self.ctx
            .publish(ChangeEvent::upvote(
                event_type,
                issue_id,
                serde_json::json!({ "upvotes_count": count }),
            ))
            .await;

        Ok(UpvoteToggle {
            upvoted,
            upvotes_count: count,
            priority_score: issue.priority_score,
        })
    }

    async fn toggle_once(&self, issue_id: i32, fingerprint: &str) -> AppResult<(bool, i32)> {
        if let Some(count) = self.ctx.store.delete_upvote(issue_id, fingerprint).await? {
            return Ok((false, count));
        }
        let count = self.ctx.store.create_upvote(issue_id, fingerprint).await?;
        Ok((true, count))
    }

    pub async fn status(&self, issue_id: i32, fingerprint: &str) -> AppResult<UpvoteStatus> {
        let issue = self.ctx.store.get_issue(issue_id).await?;
        let upvoted = self.ctx.store.has_upvote(issue_id, fingerprint).await?;
        Ok(UpvoteStatus {
            upvoted,
            upvotes_count: issue.upvotes_count,
        })
    }
}
