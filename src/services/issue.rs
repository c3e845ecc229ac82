use crate::error::{AppError, AppResult};
use crate::models::{Category, IssueModel, IssueStatus};
use crate::response::PaginatedResponse;
use crate::services::context::TriageContext;
use crate::services::duplicate::{Candidate, Resolution};
use crate::services::similarity::SimilarMatch;
use crate::services::spam::{SpamReason, SpamVerdict};
use crate::store::{IssueFilter, NewIssue};
use crate::utils::geo::GeoPoint;
use crate::utils::{humanize_response_time, optional_text, strip_markup};
use crate::websocket::{ChangeEvent, EventType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

/// A citizen report as received, before sanitizing.
#[derive(Debug, Clone)]
pub struct IssueReport {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: Option<String>,
    pub street_address: Option<String>,
    pub landmark: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Created {
        issue: IssueView,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Duplicate {
        duplicate_of: i32,
        similarity: f64,
        issue_id: i32,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Rejected {
        reason: SpamReason,
        message: String,
        issue_id: i32,
    },
}

/// An issue as shown to the feed and admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: IssueModel,
    /// Human-readable `response_time_seconds`, e.g. "2 days 3 hours".
    pub response_time: Option<String>,
}

impl From<IssueModel> for IssueView {
    fn from(issue: IssueModel) -> Self {
        let response_time = issue.response_time_seconds.map(humanize_response_time);
        Self {
            issue,
            response_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub view: IssueView,
    pub duplicate_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedSort {
    #[default]
    Priority,
    Upvotes,
    Newest,
    Oldest,
}

#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub status: Option<IssueStatus>,
    pub category: Option<Category>,
    pub search: Option<String>,
    pub include_spam: bool,
    pub include_duplicates: bool,
    pub sort: FeedSort,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone)]
pub struct SimilarQuery {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: Option<GeoPoint>,
    pub threshold: Option<f64>,
    pub limit: usize,
}

/// Submission pipeline plus the public read side.
pub struct IssueService {
    ctx: TriageContext,
}

impl IssueService {
    pub fn new(ctx: TriageContext) -> Self {
        Self { ctx }
    }

    /// Spam gate, then duplicate resolution, then persist. Everything before the
    /// persist step is dropped with the request; the persist step always completes.
    pub async fn submit(&self, report: IssueReport, fingerprint: &str) -> AppResult<SubmitOutcome> {
        let title = strip_markup(&report.title);
        let description = strip_markup(&report.description);
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if description.is_empty() {
            return Err(AppError::Validation("Description is required".to_string()));
        }
        let location =
            GeoPoint::new(report.latitude, report.longitude).map_err(AppError::Validation)?;

        let now = chrono::Utc::now().naive_utc();
        let mut warnings = Vec::new();
        let spam = self.ctx.spam();

        let recent = match self
            .ctx
            .store
            .count_recent_submissions(fingerprint, spam.window_start(now))
            .await
        {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Submission rate check failed, allowing report: {}", e);
                warnings.push("Submission rate check unavailable; report accepted".to_string());
                0
            }
        };

        let verdict = spam.classify(&title, &description, recent);
        let resolution = if verdict.is_spam() {
            Resolution::Unique
        } else {
            let candidate = Candidate::new(&title, &description, report.category, location);
            match self.ctx.resolver().resolve(self.ctx.store.as_ref(), &candidate).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    tracing::warn!("Duplicate check failed, storing report as unique: {}", e);
                    warnings.push(format!(
                        "Duplicate check unavailable ({}); report stored as a new issue",
                        e.public_message()
                    ));
                    Resolution::Unique
                }
            }
        };

        let new_issue = NewIssue {
            title,
            description,
            category: report.category,
            location,
            location_name: optional_text(report.location_name.as_deref()),
            street_address: optional_text(report.street_address.as_deref()),
            landmark: optional_text(report.landmark.as_deref()),
            image_url: report
                .image_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            is_spam: verdict.is_spam(),
            duplicate_of: None,
            priority_score: self
                .ctx
                .scorer()
                .score_parts(0, report.category, now, 0, now),
            submitter_fingerprint: Some(fingerprint.to_string()),
            created_at: now,
        };

        let ctx = self.ctx.clone();
        let (issue, linked) = tokio::spawn(persist(ctx, new_issue, resolution))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("persist task failed: {}", e)))??;

        let outcome = match (verdict, linked) {
            (SpamVerdict::Spam(reason), _) => {
                tracing::info!("Issue {} stored as spam ({:?})", issue.id, reason);
                SubmitOutcome::Rejected {
                    reason,
                    message: reason.message().to_string(),
                    issue_id: issue.id,
                }
            }
            (SpamVerdict::Clean, Some((target, similarity))) => {
                tracing::info!(
                    "Issue {} linked as duplicate of {} (similarity {:.2})",
                    issue.id,
                    target,
                    similarity
                );
                SubmitOutcome::Duplicate {
                    duplicate_of: target,
                    similarity,
                    issue_id: issue.id,
                    warnings,
                }
            }
            (SpamVerdict::Clean, None) => {
                tracing::info!("Issue {} created", issue.id);
                SubmitOutcome::Created {
                    issue: issue.into(),
                    warnings,
                }
            }
        };
        Ok(outcome)
    }

    pub async fn get(&self, id: i32) -> AppResult<IssueDetail> {
        let issue = self.ctx.store.get_issue(id).await?;
        let duplicate_count = self.ctx.store.count_duplicates(id).await?;
        Ok(IssueDetail {
            view: issue.into(),
            duplicate_count,
        })
    }

    /// Ranked feed: priority descending, ties by newest first.
    pub async fn feed(&self, query: FeedQuery) -> AppResult<PaginatedResponse<IssueView>> {
        let filter = IssueFilter {
            is_spam: if query.include_spam { None } else { Some(false) },
            status: query.status,
            category: query.category,
            canonical_only: !query.include_duplicates,
            ..Default::default()
        };
        let mut issues = self.ctx.store.list_issues(&filter).await?;

        if let Some(term) = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
        {
            issues.retain(|i| matches_search(i, &term));
        }

        issues.sort_by(|a, b| feed_order(query.sort, a, b));
        let views: Vec<IssueView> = issues.into_iter().map(IssueView::from).collect();
        Ok(PaginatedResponse::from_sorted(views, query.page, query.per_page))
    }

    /// Ranked similar open issues; the geo filter applies only when a location is given.
    pub async fn find_similar(&self, query: SimilarQuery) -> AppResult<Vec<SimilarMatch>> {
        let threshold = query
            .threshold
            .unwrap_or(self.ctx.config.dedup.similarity_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::Validation(
                "threshold must be between 0 and 1".to_string(),
            ));
        }

        let pool = self.ctx.store.list_issues(&IssueFilter::merge_pool()).await?;
        let profile = crate::utils::text::TextProfile::new(
            &strip_markup(&query.title),
            &strip_markup(&query.description),
        );
        let matcher = self.ctx.matcher();

        let mut ranked = match query.location {
            Some(origin) => {
                let nearby = self.ctx.proximity().filter(origin, &pool);
                matcher.rank(&profile, query.category, nearby, threshold)
            }
            None => matcher.rank(&profile, query.category, &pool, threshold),
        };
        ranked.truncate(query.limit);
        Ok(ranked)
    }
}

/// Creates the issue and, for a duplicate, links it and rescores the target
/// under the target's lock. Runs detached from the request.
async fn persist(
    ctx: TriageContext,
    mut new_issue: NewIssue,
    resolution: Resolution,
) -> AppResult<(IssueModel, Option<(i32, f64)>)> {
    let Resolution::DuplicateOf {
        issue_id: target,
        similarity,
    } = resolution
    else {
        let issue = ctx.store.create_issue(new_issue).await?;
        publish_created(&ctx, &issue).await;
        return Ok((issue, None));
    };

    let guard = ctx.locks.lock(target).await;

    // The target may have been flagged or merged since the pool was read.
    let still_valid = match ctx.store.get_issue(target).await {
        Ok(t) => t.is_merge_target(),
        Err(AppError::NotFound) => false,
        Err(e) => return Err(e),
    };
    if !still_valid {
        drop(guard);
        tracing::warn!(
            "Duplicate target {} is no longer open and canonical, storing as unique",
            target
        );
        let issue = ctx.store.create_issue(new_issue).await?;
        publish_created(&ctx, &issue).await;
        return Ok((issue, None));
    }

    new_issue.duplicate_of = Some(target);
    let issue = ctx.store.create_issue(new_issue).await?;
    let target_issue = ctx.refresh_score(target).await?;
    drop(guard);

    publish_created(&ctx, &issue).await;
    ctx.publish(ChangeEvent::issue(
        EventType::Update,
        target,
        serde_json::json!({
            "duplicate_added": issue.id,
            "priority_score": target_issue.priority_score,
        }),
    ))
    .await;

    Ok((issue, Some((target, similarity))))
}

async fn publish_created(ctx: &TriageContext, issue: &IssueModel) {
    let payload = serde_json::to_value(issue).unwrap_or(serde_json::Value::Null);
    ctx.publish(ChangeEvent::issue(EventType::Insert, issue.id, payload))
        .await;
}

fn matches_search(issue: &IssueModel, term: &str) -> bool {
    issue.title.to_lowercase().contains(term)
        || issue.description.to_lowercase().contains(term)
        || issue
            .location_name
            .as_deref()
            .is_some_and(|l| l.to_lowercase().contains(term))
}

fn feed_order(sort: FeedSort, a: &IssueModel, b: &IssueModel) -> Ordering {
    let newest_first = b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id));
    match sort {
        FeedSort::Priority => b
            .priority_score
            .total_cmp(&a.priority_score)
            .then(newest_first),
        FeedSort::Upvotes => b.upvotes_count.cmp(&a.upvotes_count).then(newest_first),
        FeedSort::Newest => newest_first,
        FeedSort::Oldest => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
    }
}
