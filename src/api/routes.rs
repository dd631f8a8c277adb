//! Route configuration.

use crate::api::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{delete, get, post};
use std::sync::Arc;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Statistics
        .route("/api/v1/stats", get(handlers::get_overview))
        .route("/api/v1/stats/aggregate", post(handlers::trigger_aggregation))
        .route(
            "/api/v1/stats/branches/{branch_id}",
            get(handlers::get_branch_stats),
        )
        .route(
            "/api/v1/stats/comparison",
            get(handlers::compare_branch_stats),
        )
        // Branches
        .route(
            "/api/v1/branches",
            get(handlers::list_branches).post(handlers::create_branch),
        )
        .route(
            "/api/v1/branches/{branch_id}",
            get(handlers::get_branch).delete(handlers::delete_branch),
        )
        .route(
            "/api/v1/branches/{branch_id}/descendants",
            get(handlers::get_branch_descendants),
        )
        // Clients
        .route(
            "/api/v1/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route(
            "/api/v1/clients/{client_id}",
            get(handlers::get_client).delete(handlers::delete_client),
        )
        // Permissions
        .route(
            "/api/v1/users/{user_id}/abilities",
            get(handlers::get_user_abilities),
        )
        // Authentication
        .route(
            "/api/v1/auth/keys",
            post(handlers::create_api_key).get(handlers::list_api_keys),
        )
        .route(
            "/api/v1/auth/keys/{key_id}",
            delete(handlers::delete_api_key),
        )
        .with_state(state)
}
