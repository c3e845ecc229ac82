use crate::error::AppResult;
use crate::middleware::SubmitterFingerprint;
use crate::response::ApiResponse;
use crate::services::upvote::{UpvoteStatus, UpvoteToggle};
use crate::services::{TriageContext, UpvoteService};
use axum::{extract::Path, response::IntoResponse, Extension};

#[utoipa::path(
    post,
    path = "/api/v1/issues/{id}/upvote",
    params(("id" = i32, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Upvote added or withdrawn", body = UpvoteToggle),
        (status = 404, description = "Issue not found", body = crate::error::AppError),
        (status = 409, description = "Concurrent toggle lost twice", body = crate::error::AppError),
    ),
    tag = "upvotes"
)]
pub async fn toggle_upvote(
    Extension(ctx): Extension<TriageContext>,
    fingerprint: SubmitterFingerprint,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = UpvoteService::new(ctx);
    let toggle = service.toggle(id, &fingerprint.0).await?;
    Ok(ApiResponse::ok(toggle))
}

#[utoipa::path(
    get,
    path = "/api/v1/issues/{id}/upvote",
    params(("id" = i32, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Whether the caller currently supports the issue", body = UpvoteStatus),
        (status = 404, description = "Issue not found", body = crate::error::AppError),
    ),
    tag = "upvotes"
)]
pub async fn upvote_status(
    Extension(ctx): Extension<TriageContext>,
    fingerprint: SubmitterFingerprint,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = UpvoteService::new(ctx);
    Ok(ApiResponse::ok(service.status(id, &fingerprint.0).await?))
}
