use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use civic_triage::config::{
    self, database::StoreBackend, fingerprint::FingerprintConfig, jwt::JwtConfig,
    triage::TriageConfig,
};
use civic_triage::services::{CacheService, TriageContext};
use civic_triage::store::{IssueStore, MemoryIssueStore, PgIssueStore};
use civic_triage::websocket::IssueHub;
use civic_triage::{middleware, migration, routes, utils};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Public issue routes
        civic_triage::handlers::issue::submit_issue,
        civic_triage::handlers::issue::list_issues,
        civic_triage::handlers::issue::get_issue,
        civic_triage::handlers::issue::find_similar,
        // Upvotes
        civic_triage::handlers::upvote::toggle_upvote,
        civic_triage::handlers::upvote::upvote_status,
        // Moderation
        civic_triage::handlers::admin::set_status,
        civic_triage::handlers::admin::set_spam,
        civic_triage::handlers::admin::assign,
        civic_triage::handlers::admin::set_notes,
        civic_triage::handlers::admin::link_duplicate,
        civic_triage::handlers::admin::unlink_duplicate,
        civic_triage::handlers::admin::reconcile,
        civic_triage::handlers::admin::rescore_all,
        // Analytics
        civic_triage::handlers::analytics::overview,
        civic_triage::handlers::analytics::categories,
        civic_triage::handlers::analytics::monthly,
        civic_triage::handlers::analytics::resolution_times,
        civic_triage::handlers::analytics::hotspots,
    ),
    components(
        schemas(
            civic_triage::response::ApiResponse<serde_json::Value>,
            civic_triage::response::PaginatedResponse<serde_json::Value>,
            civic_triage::response::PaginationQuery,
            civic_triage::error::AppError,
            civic_triage::models::Category,
            civic_triage::models::IssueStatus,
            civic_triage::models::IssueModel,
            // Issues
            civic_triage::handlers::issue::SubmitIssueRequest,
            civic_triage::handlers::issue::FeedParams,
            civic_triage::handlers::issue::SimilarIssuesRequest,
            civic_triage::services::issue::SubmitOutcome,
            civic_triage::services::issue::IssueView,
            civic_triage::services::issue::IssueDetail,
            civic_triage::services::issue::FeedSort,
            civic_triage::services::similarity::SimilarMatch,
            civic_triage::services::spam::SpamReason,
            // Upvotes
            civic_triage::services::upvote::UpvoteToggle,
            civic_triage::services::upvote::UpvoteStatus,
            // Moderation
            civic_triage::handlers::admin::UpdateStatusRequest,
            civic_triage::handlers::admin::SpamFlagRequest,
            civic_triage::handlers::admin::AssignRequest,
            civic_triage::handlers::admin::NotesRequest,
            civic_triage::handlers::admin::LinkDuplicateRequest,
            civic_triage::services::moderation::RescoreSummary,
            // Analytics
            civic_triage::handlers::analytics::AnalyticsQuery,
            civic_triage::services::analytics::Overview,
            civic_triage::services::analytics::CategoryBreakdown,
            civic_triage::services::analytics::MonthlyReport,
            civic_triage::services::analytics::ResolutionTime,
            civic_triage::services::analytics::Hotspot,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "issues", description = "Citizen reports and the ranked feed"),
        (name = "upvotes", description = "Upvote toggling"),
        (name = "admin", description = "Moderation operations"),
        (name = "analytics", description = "Dashboard aggregations"),
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    // Validate configuration before doing anything else
    let (jwt_config, fingerprint_config, backend) = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting civic triage v{}...", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn IssueStore> = match backend {
        StoreBackend::Postgres => {
            let database_url = env::var("DATABASE_URL")?;
            let db = config::database::get_database(&database_url).await?;
            tracing::info!("Database connected successfully");

            migration::Migrator::up(&db, None).await?;
            tracing::info!("Database migrations applied successfully");
            Arc::new(PgIssueStore::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-process store, issues are lost on restart");
            Arc::new(MemoryIssueStore::new())
        }
    };

    // Redis/Cache is optional - graceful degradation if unavailable
    let cache = match config::redis::get_redis().await {
        Ok(conn) => {
            tracing::info!("Redis connected successfully");
            Some(CacheService::new(conn))
        }
        Err(e) => {
            tracing::warn!("Redis unavailable, running without cache: {}", e);
            None
        }
    };

    let triage_config = TriageConfig::from_env();
    tracing::info!(
        "Triage: radius {} m, threshold {}, spam window {} s",
        triage_config.dedup.radius_meters,
        triage_config.dedup.similarity_threshold,
        triage_config.spam.window_seconds
    );

    let hub = IssueHub::new();
    let ctx = TriageContext::new(store, hub.clone(), triage_config).with_cache(cache);

    let app = create_app()
        .layer(Extension(ctx))
        .layer(Extension(hub))
        .layer(Extension(fingerprint_config));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "civic_triage=debug,tower_http=debug,axum=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<(JwtConfig, FingerprintConfig, StoreBackend)> {
    let jwt_config = JwtConfig::from_env()?;
    let fingerprint_config = FingerprintConfig::from_env()?;
    let backend = StoreBackend::from_env()?;

    // DATABASE_URL: checked here for early error; actual connection happens later
    if backend == StoreBackend::Postgres && env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    Ok((jwt_config, fingerprint_config, backend))
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderName, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware::fingerprint::CLIENT_FINGERPRINT_HEADER),
        ]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(
            middleware::security::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(ctx): Extension<TriageContext>) -> impl IntoResponse {
    let store_ok = ctx.store.ping().await;
    let status = if store_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "civic-triage",
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_ok,
        "cache": ctx.cache.is_some(),
        "subscribers": ctx.hub.subscriber_count(),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
