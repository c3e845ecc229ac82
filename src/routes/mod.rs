use crate::config::rate_limit::{RateLimitConfig, RateLimitRule, RouteGroup};
use crate::handlers;
use crate::websocket;
use axum::{routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/ws/issues", routing::get(websocket::feed::ws_handler))
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let public_read = public_read_routes(&rate_limit_config);
    let submit = submit_routes(&rate_limit_config);
    let admin = admin_routes(&rate_limit_config);

    public_read.merge(submit).merge(admin)
}

/// Feed, detail, similarity search and upvote status.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/issues", routing::get(handlers::issue::list_issues))
        .route("/issues/{id}", routing::get(handlers::issue::get_issue))
        .route(
            "/issues/similar",
            routing::post(handlers::issue::find_similar),
        )
        .route(
            "/issues/{id}/upvote",
            routing::get(handlers::upvote::upvote_status),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(RouteGroup::PublicRead))
}

/// Anonymous writes keyed by submitter fingerprint.
fn submit_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/issues", routing::post(handlers::issue::submit_issue))
        .route(
            "/issues/{id}/upvote",
            routing::post(handlers::upvote::toggle_upvote),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(RouteGroup::Submit))
}

/// Moderation and analytics; every handler takes the `AdminUser` extractor.
fn admin_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/admin/issues/{id}/status",
            routing::put(handlers::admin::set_status),
        )
        .route(
            "/admin/issues/{id}/spam",
            routing::put(handlers::admin::set_spam),
        )
        .route(
            "/admin/issues/{id}/assignee",
            routing::put(handlers::admin::assign),
        )
        .route(
            "/admin/issues/{id}/notes",
            routing::put(handlers::admin::set_notes),
        )
        .route(
            "/admin/issues/{id}/duplicate",
            routing::put(handlers::admin::link_duplicate)
                .delete(handlers::admin::unlink_duplicate),
        )
        .route(
            "/admin/issues/{id}/reconcile",
            routing::post(handlers::admin::reconcile),
        )
        .route(
            "/admin/issues/rescore",
            routing::post(handlers::admin::rescore_all),
        )
        // Analytics
        .route(
            "/admin/analytics/overview",
            routing::get(handlers::analytics::overview),
        )
        .route(
            "/admin/analytics/categories",
            routing::get(handlers::analytics::categories),
        )
        .route(
            "/admin/analytics/monthly",
            routing::get(handlers::analytics::monthly),
        )
        .route(
            "/admin/analytics/resolution-times",
            routing::get(handlers::analytics::resolution_times),
        )
        .route(
            "/admin/analytics/hotspots",
            routing::get(handlers::analytics::hotspots),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(RouteGroup::Admin))
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    match GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    {
        Some(governor_conf) => router.layer(GovernorLayer::new(governor_conf)),
        None => {
            tracing::warn!(
                "Invalid rate limit rule {:?}, serving this group unthrottled",
                rule
            );
            router
        }
    }
}
