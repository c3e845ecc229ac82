use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::{IssueModel, IssueStatus};
use crate::response::ApiResponse;
use crate::services::issue::IssueView;
use crate::services::moderation::RescoreSummary;
use crate::services::{ModerationService, TriageContext};
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: IssueStatus,
    /// Rejects the change with 409 when the current status differs
    pub expected_status: Option<IssueStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SpamFlagRequest {
    pub is_spam: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignRequest {
    /// Handler identifier; blank or null clears the assignment
    #[validate(length(max = 100))]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NotesRequest {
    /// Shown to the public; markup is stripped, blank or null clears
    #[validate(length(max = 5000))]
    pub public_notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkDuplicateRequest {
    /// Canonical issue this one duplicates
    pub duplicate_of: i32,
}

fn view(issue: IssueModel) -> ApiResponse<IssueView> {
    ApiResponse::ok(issue.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/issues/{id}/status",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = IssueView),
        (status = 404, description = "Issue not found", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 403, description = "Forbidden", body = AppError),
        (status = 409, description = "Status changed concurrently", body = AppError),
    ),
    tag = "admin"
)]
pub async fn set_status(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let service = ModerationService::new(ctx);
    let issue = service
        .set_status(id, payload.status, payload.expected_status)
        .await?;
    Ok(view(issue))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/issues/{id}/spam",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    request_body = SpamFlagRequest,
    responses(
        (status = 200, description = "Spam flag updated", body = IssueView),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 403, description = "Forbidden", body = AppError),
    ),
    tag = "admin"
)]
pub async fn set_spam(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<SpamFlagRequest>,
) -> AppResult<impl IntoResponse> {
    let service = ModerationService::new(ctx);
    Ok(view(service.set_spam(id, payload.is_spam).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/issues/{id}/assignee",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Assignment updated", body = IssueView),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "admin"
)]
pub async fn assign(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<AssignRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = ModerationService::new(ctx);
    Ok(view(service.assign(id, payload.assigned_to).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/issues/{id}/notes",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    request_body = NotesRequest,
    responses(
        (status = 200, description = "Public notes updated", body = IssueView),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "admin"
)]
pub async fn set_notes(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<NotesRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = ModerationService::new(ctx);
    Ok(view(service.set_notes(id, payload.public_notes).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/issues/{id}/duplicate",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    request_body = LinkDuplicateRequest,
    responses(
        (status = 200, description = "Issue merged into the target", body = IssueView),
        (status = 400, description = "Would create a chain or target spam", body = AppError),
        (status = 404, description = "Issue not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn link_duplicate(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<LinkDuplicateRequest>,
) -> AppResult<impl IntoResponse> {
    let service = ModerationService::new(ctx);
    Ok(view(service.link_duplicate(id, payload.duplicate_of).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/issues/{id}/duplicate",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Duplicate link removed", body = IssueView),
        (status = 404, description = "Issue not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn unlink_duplicate(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = ModerationService::new(ctx);
    Ok(view(service.unlink_duplicate(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/issues/{id}/reconcile",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Cached counts re-derived and score refreshed", body = IssueView),
        (status = 404, description = "Issue not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn reconcile(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = ModerationService::new(ctx);
    Ok(view(service.reconcile(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/issues/rescore",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Open issues rescored", body = RescoreSummary),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "admin"
)]
pub async fn rescore_all(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let service = ModerationService::new(ctx);
    Ok(ApiResponse::ok(service.rescore_all().await?))
}
