use crate::error::{AppError, AppResult};
use crate::middleware::SubmitterFingerprint;
use crate::models::{Category, IssueStatus};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::issue::{
    FeedQuery, FeedSort, IssueDetail, IssueReport, IssueService, IssueView, SimilarQuery,
    SubmitOutcome,
};
use crate::services::similarity::SimilarMatch;
use crate::services::TriageContext;
use crate::utils::GeoPoint;
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

const DEFAULT_SIMILAR_LIMIT: usize = 10;
const MAX_SIMILAR_LIMIT: usize = 50;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitIssueRequest {
    /// Short summary (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// What is wrong and where exactly
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub category: Category,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(length(max = 200))]
    pub location_name: Option<String>,
    #[validate(length(max = 300))]
    pub street_address: Option<String>,
    #[validate(length(max = 200))]
    pub landmark: Option<String>,
    /// Link to an already uploaded photo
    #[validate(url, length(max = 2048))]
    pub image_url: Option<String>,
}

impl From<SubmitIssueRequest> for IssueReport {
    fn from(r: SubmitIssueRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            category: r.category,
            latitude: r.latitude,
            longitude: r.longitude,
            location_name: r.location_name,
            street_address: r.street_address,
            landmark: r.landmark,
            image_url: r.image_url,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedParams {
    /// new, in_progress or resolved
    pub status: Option<String>,
    /// Category display name, e.g. "Water Leak"
    pub category: Option<String>,
    /// Case-insensitive match on title, description and location name
    pub search: Option<String>,
    pub include_spam: Option<bool>,
    pub include_duplicates: Option<bool>,
    pub sort: Option<FeedSort>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SimilarIssuesRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    pub category: Category,
    /// With `longitude`, limits matches to the duplicate radius
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    /// Minimum similarity in [0, 1]; defaults to the duplicate threshold
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
}

#[utoipa::path(
    post,
    path = "/api/v1/issues",
    request_body = SubmitIssueRequest,
    responses(
        (status = 200, description = "Report stored as new, duplicate or rejected spam", body = SubmitOutcome),
        (status = 400, description = "Validation error", body = AppError),
        (status = 503, description = "Store unavailable, try again", body = AppError),
    ),
    tag = "issues"
)]
pub async fn submit_issue(
    Extension(ctx): Extension<TriageContext>,
    fingerprint: SubmitterFingerprint,
    Json(payload): Json<SubmitIssueRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = IssueService::new(ctx);
    let outcome = service.submit(payload.into(), &fingerprint.0).await?;

    Ok(ApiResponse::ok(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/issues",
    params(
        ("status" = Option<String>, Query, description = "new, in_progress or resolved"),
        ("category" = Option<String>, Query, description = "Category name"),
        ("search" = Option<String>, Query, description = "Free-text search"),
        ("include_spam" = Option<bool>, Query, description = "Include spam-flagged issues"),
        ("include_duplicates" = Option<bool>, Query, description = "Include issues merged into another"),
        ("sort" = Option<FeedSort>, Query, description = "priority (default), upvotes, newest, oldest"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Ranked issue feed", body = PaginatedResponse<IssueView>),
        (status = 400, description = "Invalid filter", body = AppError),
    ),
    tag = "issues"
)]
pub async fn list_issues(
    Extension(ctx): Extension<TriageContext>,
    Query(params): Query<FeedParams>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<IssueStatus>)
        .transpose()
        .map_err(AppError::Validation)?;
    let category = params
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(AppError::Validation)?;
    let (page, per_page) = PaginationQuery {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve();

    let query = FeedQuery {
        status,
        category,
        search: params.search,
        include_spam: params.include_spam.unwrap_or(false),
        include_duplicates: params.include_duplicates.unwrap_or(false),
        sort: params.sort.unwrap_or_default(),
        page,
        per_page,
    };

    let service = IssueService::new(ctx);
    Ok(ApiResponse::ok(service.feed(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/issues/{id}",
    params(("id" = i32, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Issue with its duplicate count", body = IssueDetail),
        (status = 404, description = "Issue not found", body = AppError),
    ),
    tag = "issues"
)]
pub async fn get_issue(
    Extension(ctx): Extension<TriageContext>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = IssueService::new(ctx);
    Ok(ApiResponse::ok(service.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/issues/similar",
    request_body = SimilarIssuesRequest,
    responses(
        (status = 200, description = "Open issues ranked by similarity", body = Vec<SimilarMatch>),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "issues"
)]
pub async fn find_similar(
    Extension(ctx): Extension<TriageContext>,
    Json(payload): Json<SimilarIssuesRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let location = match (payload.latitude, payload.longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng).map_err(AppError::Validation)?),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "latitude and longitude must be given together".to_string(),
            ))
        }
    };

    let query = SimilarQuery {
        title: payload.title,
        description: payload.description,
        category: payload.category,
        location,
        threshold: payload.threshold,
        limit: payload
            .limit
            .unwrap_or(DEFAULT_SIMILAR_LIMIT)
            .clamp(1, MAX_SIMILAR_LIMIT),
    };

    let service = IssueService::new(ctx);
    Ok(ApiResponse::ok(service.find_similar(query).await?))
}
