use super::{IssueFilter, IssuePatch, IssueStore, NewIssue};
use crate::error::{AppError, AppResult};
use crate::models::{issue, issue_upvote, Issue, IssueModel, IssueStatus, IssueUpvote};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Statement, TransactionTrait,
};

/// Postgres-backed store (sea-orm).
#[derive(Clone)]
pub struct PgIssueStore {
    db: DatabaseConnection,
}

impl PgIssueStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// `UPDATE ... RETURNING` so the new count comes from the same atomic statement.
    async fn shift_upvotes<C: ConnectionTrait>(
        conn: &C,
        issue_id: i32,
        delta: i32,
    ) -> AppResult<i32> {
        let row = conn
            .query_one(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "UPDATE issues
                 SET upvotes_count = GREATEST(upvotes_count + $1, 0),
                     updated_at = NOW()
                 WHERE id = $2
                 RETURNING upvotes_count",
                vec![delta.into(), issue_id.into()],
            ))
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(row.try_get::<i32>("", "upvotes_count")?)
    }
}

#[async_trait]
impl IssueStore for PgIssueStore {
    async fn create_issue(&self, new: NewIssue) -> AppResult<IssueModel> {
        new.validate()?;

        if let Some(target) = new.duplicate_of {
            Issue::find_by_id(target)
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "duplicate_of references unknown issue {}",
                        target
                    ))
                })?;
        }

        let model = issue::ActiveModel {
            title: sea_orm::ActiveValue::Set(new.title),
            description: sea_orm::ActiveValue::Set(new.description),
            category: sea_orm::ActiveValue::Set(new.category.as_str().to_string()),
            latitude: sea_orm::ActiveValue::Set(new.location.lat),
            longitude: sea_orm::ActiveValue::Set(new.location.lng),
            location_name: sea_orm::ActiveValue::Set(new.location_name),
            street_address: sea_orm::ActiveValue::Set(new.street_address),
            landmark: sea_orm::ActiveValue::Set(new.landmark),
            image_url: sea_orm::ActiveValue::Set(new.image_url),
            is_spam: sea_orm::ActiveValue::Set(new.is_spam),
            duplicate_of: sea_orm::ActiveValue::Set(new.duplicate_of),
            priority_score: sea_orm::ActiveValue::Set(new.priority_score),
            upvotes_count: sea_orm::ActiveValue::Set(0),
            status: sea_orm::ActiveValue::Set(IssueStatus::New.as_str().to_string()),
            assigned_to: sea_orm::ActiveValue::Set(None),
            response_time_seconds: sea_orm::ActiveValue::Set(None),
            public_notes: sea_orm::ActiveValue::Set(None),
            submitter_fingerprint: sea_orm::ActiveValue::Set(new.submitter_fingerprint),
            created_at: sea_orm::ActiveValue::Set(new.created_at),
            updated_at: sea_orm::ActiveValue::Set(new.created_at),
            resolved_at: sea_orm::ActiveValue::Set(None),
            ..Default::default()
        };

        let saved = model.insert(&self.db).await?;
        Ok(saved)
    }

    async fn get_issue(&self, id: i32) -> AppResult<IssueModel> {
        Issue::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn list_issues(&self, filter: &IssueFilter) -> AppResult<Vec<IssueModel>> {
        let mut query = Issue::find();

        if let Some(spam) = filter.is_spam {
            query = query.filter(issue::Column::IsSpam.eq(spam));
        }
        if let Some(status) = filter.status {
            query = query.filter(issue::Column::Status.eq(status.as_str()));
        }
        if let Some(excluded) = filter.exclude_status {
            query = query.filter(issue::Column::Status.ne(excluded.as_str()));
        }
        if let Some(category) = filter.category {
            query = query.filter(issue::Column::Category.eq(category.as_str()));
        }
        if let Some(target) = filter.duplicate_of {
            query = query.filter(issue::Column::DuplicateOf.eq(target));
        }
        if filter.canonical_only {
            query = query.filter(issue::Column::DuplicateOf.is_null());
        }

        let issues = query
            .order_by_asc(issue::Column::Id)
            .all(&self.db)
            .await?;
        Ok(issues)
    }

    async fn update_issue(&self, id: i32, patch: IssuePatch) -> AppResult<IssueModel> {
        if let Some(Some(target)) = patch.duplicate_of {
            if target == id {
                return Err(AppError::Validation(
                    "an issue cannot be a duplicate of itself".to_string(),
                ));
            }
        }

        let existing = Issue::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: issue::ActiveModel = existing.into();
        if let Some(status) = patch.status {
            active.status = sea_orm::ActiveValue::Set(status.as_str().to_string());
        }
        if let Some(spam) = patch.is_spam {
            active.is_spam = sea_orm::ActiveValue::Set(spam);
        }
        if let Some(dup) = patch.duplicate_of {
            active.duplicate_of = sea_orm::ActiveValue::Set(dup);
        }
        if let Some(assignee) = patch.assigned_to {
            active.assigned_to = sea_orm::ActiveValue::Set(assignee);
        }
        if let Some(notes) = patch.public_notes {
            active.public_notes = sea_orm::ActiveValue::Set(notes);
        }
        if let Some(score) = patch.priority_score {
            active.priority_score = sea_orm::ActiveValue::Set(score);
        }
        if let Some(count) = patch.upvotes_count {
            active.upvotes_count = sea_orm::ActiveValue::Set(count.max(0));
        }
        if let Some(rt) = patch.response_time_seconds {
            active.response_time_seconds = sea_orm::ActiveValue::Set(rt);
        }
        if let Some(at) = patch.resolved_at {
            active.resolved_at = sea_orm::ActiveValue::Set(at);
        }
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    async fn count_duplicates(&self, target_id: i32) -> AppResult<u64> {
        let count = Issue::find()
            .filter(issue::Column::DuplicateOf.eq(target_id))
            .filter(issue::Column::IsSpam.eq(false))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn count_recent_submissions(
        &self,
        fingerprint: &str,
        since: NaiveDateTime,
    ) -> AppResult<u64> {
        let count = Issue::find()
            .filter(issue::Column::SubmitterFingerprint.eq(fingerprint))
            .filter(issue::Column::CreatedAt.gte(since))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn create_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<i32> {
        let txn = self.db.begin().await?;

        Issue::find_by_id(issue_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let inserted = txn
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "INSERT INTO issue_upvotes (id, issue_id, user_ip, created_at)
                 VALUES ($1, $2, $3, NOW())
                 ON CONFLICT (issue_id, user_ip) DO NOTHING",
                vec![
                    uuid::Uuid::new_v4().into(),
                    issue_id.into(),
                    user_ip.into(),
                ],
            ))
            .await?;

        if inserted.rows_affected() == 0 {
            txn.rollback().await?;
            return Err(AppError::Conflict(
                "Issue already upvoted by this submitter".to_string(),
            ));
        }

        let count = Self::shift_upvotes(&txn, issue_id, 1).await?;
        txn.commit().await?;
        Ok(count)
    }

    async fn delete_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<Option<i32>> {
        let txn = self.db.begin().await?;

        let deleted = IssueUpvote::delete_many()
            .filter(issue_upvote::Column::IssueId.eq(issue_id))
            .filter(issue_upvote::Column::UserIp.eq(user_ip))
            .exec(&txn)
            .await?;

        if deleted.rows_affected == 0 {
            txn.commit().await?;
            return Ok(None);
        }

        let count = Self::shift_upvotes(&txn, issue_id, -1).await?;
        txn.commit().await?;
        Ok(Some(count))
    }

    async fn has_upvote(&self, issue_id: i32, user_ip: &str) -> AppResult<bool> {
        let existing = IssueUpvote::find()
            .filter(issue_upvote::Column::IssueId.eq(issue_id))
            .filter(issue_upvote::Column::UserIp.eq(user_ip))
            .one(&self.db)
            .await?;
        Ok(existing.is_some())
    }

    async fn count_upvotes(&self, issue_id: i32) -> AppResult<i32> {
        Issue::find_by_id(issue_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let count = IssueUpvote::find()
            .filter(issue_upvote::Column::IssueId.eq(issue_id))
            .count(&self.db)
            .await?;
        upvote_count(issue_id, count)
    }

    async fn ping(&self) -> bool {
        self.db
            .query_one(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT 1".to_string(),
            ))
            .await
            .is_ok()
    }
}

fn upvote_count(issue_id: i32, count: u64) -> AppResult<i32> {
    i32::try_from(count).map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "upvote count {} of issue {} does not fit the counter column",
            count,
            issue_id
        ))
    })
}
