use crate::error::AppResult;
use crate::middleware::AdminUser;
use crate::response::ApiResponse;
use crate::services::analytics::{CategoryBreakdown, Hotspot, MonthlyReport, Overview, ResolutionTime};
use crate::services::{AnalyticsService, TriageContext};
use axum::{extract::Query, response::IntoResponse, Extension};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AnalyticsQuery {
    /// Count spam-flagged issues too (default false)
    pub include_spam: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/analytics/overview",
    security(("jwt_token" = [])),
    responses((status = 200, description = "Dashboard totals", body = Overview)),
    tag = "analytics"
)]
pub async fn overview(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(ApiResponse::ok(AnalyticsService::new(ctx).overview().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/analytics/categories",
    security(("jwt_token" = [])),
    params(("include_spam" = Option<bool>, Query, description = "Count spam too")),
    responses((status = 200, description = "Total and open issues per category", body = Vec<CategoryBreakdown>)),
    tag = "analytics"
)]
pub async fn categories(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<impl IntoResponse> {
    let service = AnalyticsService::new(ctx);
    let rows = service
        .categories(query.include_spam.unwrap_or(false))
        .await?;
    Ok(ApiResponse::ok(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/analytics/monthly",
    security(("jwt_token" = [])),
    responses((status = 200, description = "Reports and resolutions per month", body = Vec<MonthlyReport>)),
    tag = "analytics"
)]
pub async fn monthly(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(ApiResponse::ok(AnalyticsService::new(ctx).monthly().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/analytics/resolution-times",
    security(("jwt_token" = [])),
    responses((status = 200, description = "Average hours to resolve per category", body = Vec<ResolutionTime>)),
    tag = "analytics"
)]
pub async fn resolution_times(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(ApiResponse::ok(
        AnalyticsService::new(ctx).resolution_times().await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/analytics/hotspots",
    security(("jwt_token" = [])),
    params(("include_spam" = Option<bool>, Query, description = "Count spam too")),
    responses((status = 200, description = "Top reported locations", body = Vec<Hotspot>)),
    tag = "analytics"
)]
pub async fn hotspots(
    Extension(ctx): Extension<TriageContext>,
    _admin: AdminUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<impl IntoResponse> {
    let service = AnalyticsService::new(ctx);
    let rows = service.hotspots(query.include_spam.unwrap_or(false)).await?;
    Ok(ApiResponse::ok(rows))
}
