//! Brokerage Back-Office Backend Server
//!
//! REST API server around the branch hierarchy rollup aggregator.

use brokerage_backoffice_backend::api::create_router;
use brokerage_backoffice_backend::api::middleware::rate_limit_middleware;
use brokerage_backoffice_backend::config::Config;
use brokerage_backoffice_backend::db::DatabasePool;
use brokerage_backoffice_backend::scheduler::StatsScheduler;
use brokerage_backoffice_backend::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use brokerage_backoffice_backend::db::{CreateBranchRequest, CreateClientRequest};
use brokerage_backoffice_backend::models::{
    AbilitiesResponse, AggregateStatsRequest, AggregateStatsResponse, ApiKeyInfo,
    ApiKeysListResponse, BranchStatsResponse, BranchSummary, BranchesListResponse, ClientSummary,
    ClientsListResponse, ComparisonResponse, CreateApiKeyRequest, CreateApiKeyResponse,
    DeleteApiKeyResponse, DescendantsResponse, HealthResponse, OverviewResponse,
};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        brokerage_backoffice_backend::api::handlers::health_check,
        brokerage_backoffice_backend::api::handlers::get_overview,
        brokerage_backoffice_backend::api::handlers::trigger_aggregation,
        brokerage_backoffice_backend::api::handlers::get_branch_stats,
        brokerage_backoffice_backend::api::handlers::compare_branch_stats,
        brokerage_backoffice_backend::api::handlers::list_branches,
        brokerage_backoffice_backend::api::handlers::create_branch,
        brokerage_backoffice_backend::api::handlers::get_branch,
        brokerage_backoffice_backend::api::handlers::delete_branch,
        brokerage_backoffice_backend::api::handlers::get_branch_descendants,
        brokerage_backoffice_backend::api::handlers::list_clients,
        brokerage_backoffice_backend::api::handlers::create_client,
        brokerage_backoffice_backend::api::handlers::get_client,
        brokerage_backoffice_backend::api::handlers::delete_client,
        brokerage_backoffice_backend::api::handlers::get_user_abilities,
        brokerage_backoffice_backend::api::handlers::create_api_key,
        brokerage_backoffice_backend::api::handlers::list_api_keys,
        brokerage_backoffice_backend::api::handlers::delete_api_key,
    ),
    components(
        schemas(
            HealthResponse,
            OverviewResponse,
            AggregateStatsRequest,
            AggregateStatsResponse,
            BranchStatsResponse,
            ComparisonResponse,
            BranchesListResponse,
            BranchSummary,
            CreateBranchRequest,
            DescendantsResponse,
            ClientsListResponse,
            ClientSummary,
            CreateClientRequest,
            AbilitiesResponse,
            ApiKeyInfo,
            ApiKeysListResponse,
            CreateApiKeyRequest,
            CreateApiKeyResponse,
            DeleteApiKeyResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Statistics", description = "Rollup snapshots and aggregation runs"),
        (name = "Branches", description = "Branch hierarchy management"),
        (name = "Clients", description = "Client management"),
        (name = "Permissions", description = "User ability resolution"),
        (name = "Authentication", description = "API key management"),
    ),
    info(
        title = "Brokerage Back-Office API",
        version = "0.2.0",
        description = "REST API for branch hierarchy rollup statistics",
        license(name = "MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; fall back to DATABASE_URL when no file exists
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("no {config_path} and DATABASE_URL is not set"))?;
        Config::from_database_url(url)
    };

    // Connect to the database
    let db = DatabasePool::new(&config.database.url, config.database.max_connections).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let host = config.server.host.clone();
    let port = config.server.port;
    let aggregation_config = config.aggregation.clone();

    // Create application state
    let state = Arc::new(AppState::from_config(config, db));

    // Start the scheduler
    let scheduler = Arc::new(StatsScheduler::new(
        state.job_queue.clone(),
        aggregation_config,
    ));
    tokio::spawn(scheduler.run());

    info!("Starting Brokerage Back-Office Backend on {}:{}", host, port);
    info!(
        "Swagger UI available at http://{}:{}/swagger-ui/",
        host, port
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(Arc::clone(&state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn_with_state(
            state,
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
