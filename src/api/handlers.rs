//! REST API request handlers.

use crate::db::queries;
use crate::db::{Branch, Client, CreateBranchRequest, CreateClientRequest, DailyBranchStats};
use crate::error::ApiError;
use crate::models::{
    AbilitiesResponse, AggregateStatsRequest, AggregateStatsResponse, ApiKeysListResponse,
    BranchStatsResponse, BranchSummary, BranchesListResponse, ClientSummary, ClientsListResponse,
    ClientsQuery, ComparisonQuery, ComparisonResponse, CreateApiKeyRequest, CreateApiKeyResponse,
    DeleteApiKeyResponse, DescendantsResponse, HealthResponse, OverviewResponse, SnapshotQuery,
};
use crate::permissions;
use crate::rollup::read;
use crate::rollup::{BranchHierarchy, BranchNode};
use crate::scheduler::{EnqueueError, StatsJob};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use std::sync::Arc;

fn branch_summary(branch: Branch) -> BranchSummary {
    BranchSummary {
        id: branch.id,
        name: branch.name,
        model: branch.model,
        control_branch_id: branch.control_branch_id,
        activated_on: branch.activated_on,
    }
}

fn client_summary(client: Client, not_traded_days: Option<i64>) -> ClientSummary {
    ClientSummary {
        id: client.id,
        code: client.code,
        name: client.name,
        branch_id: client.branch_id,
        activated_on: client.activated_on,
        not_traded_days,
    }
}

fn snapshot_response(row: DailyBranchStats) -> BranchStatsResponse {
    BranchStatsResponse {
        branch_id: row.branch_id,
        stat_date: row.stat_date,
        total_brokerage: row.total_brokerage,
        monthly_brokerage: row.monthly_brokerage,
        projected_brokerage: row.projected_brokerage,
        total_clients: row.total_clients,
        traded_clients: row.traded_clients,
        added_clients: row.added_clients,
        total_franchisees: row.total_franchisees,
        traded_franchisees: row.traded_franchisees,
        added_franchisees: row.added_franchisees,
        trading_days_total: row.trading_days_total,
        trading_days_elapsed: row.trading_days_elapsed,
        segment_revenue: row.segment_revenue.0,
        model_revenue: row.model_revenue.0,
        top_clients: row.top_clients.0,
        top_franchisees: row.top_franchisees.0,
        computed_at: row.computed_at,
    }
}

fn node_from_branch(branch: Branch) -> BranchNode {
    BranchNode {
        id: branch.id,
        name: branch.name,
        model: branch.model,
        control_branch_id: branch.control_branch_id,
        activated_on: branch.activated_on,
    }
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Overview
// ============================================================================

/// Get back-office overview statistics.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    responses(
        (status = 200, description = "Overview statistics", body = OverviewResponse)
    ),
    tag = "Statistics"
)]
pub async fn get_overview(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OverviewResponse>, ApiError> {
    let pool = state.db.pool();
    let (branch_count, client_count, dates) = tokio::try_join!(
        queries::count_branches(pool),
        queries::count_clients(pool),
        read::latest_snapshot_dates(pool, 1),
    )?;

    Ok(Json(OverviewResponse {
        branch_count,
        client_count,
        latest_snapshot_date: dates.first().copied(),
    }))
}

// ============================================================================
// Statistics Aggregation
// ============================================================================

/// Enqueue a rollup run for a business date.
#[utoipa::path(
    post,
    path = "/api/v1/stats/aggregate",
    request_body = AggregateStatsRequest,
    responses(
        (status = 200, description = "Job queued", body = AggregateStatsResponse),
        (status = 400, description = "Invalid date"),
        (status = 409, description = "A run for the date is already in progress")
    ),
    tag = "Statistics"
)]
pub async fn trigger_aggregation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AggregateStatsRequest>,
) -> Result<Json<AggregateStatsResponse>, ApiError> {
    if body.date > Utc::now().date_naive() {
        return Err(ApiError::InvalidRequest(format!(
            "Cannot aggregate a future date: {}",
            body.date
        )));
    }

    let job = StatsJob {
        date: body.date,
        is_last_date: body.is_last_date,
    };

    match state.job_queue.enqueue(job).await {
        Ok(()) => Ok(Json(AggregateStatsResponse {
            queued: true,
            date: body.date,
        })),
        Err(EnqueueError::InFlight(date)) => Err(ApiError::AggregationInProgress(date)),
        Err(EnqueueError::Closed) => Err(ApiError::Internal(
            "Aggregation worker unavailable".to_string(),
        )),
    }
}

/// Get one branch's snapshot for a date.
#[utoipa::path(
    get,
    path = "/api/v1/stats/branches/{branch_id}",
    params(
        ("branch_id" = i64, Path, description = "Branch identifier"),
        ("date" = String, Query, description = "Business date (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Branch snapshot", body = BranchStatsResponse),
        (status = 404, description = "Snapshot not found")
    ),
    tag = "Statistics"
)]
pub async fn get_branch_stats(
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<i64>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<BranchStatsResponse>, ApiError> {
    let row = read::fetch_snapshot(state.db.pool(), branch_id, query.date)
        .await?
        .ok_or(ApiError::SnapshotNotFound {
            branch_id,
            date: query.date,
        })?;

    Ok(Json(snapshot_response(row)))
}

/// Compare summed snapshot figures across a branch subset.
#[utoipa::path(
    get,
    path = "/api/v1/stats/comparison",
    params(
        ("branchIds" = String, Query, description = "Comma-separated branch ids")
    ),
    responses(
        (status = 200, description = "Summed figures for the two most recent dates", body = ComparisonResponse),
        (status = 400, description = "Invalid branch id list")
    ),
    tag = "Statistics"
)]
pub async fn compare_branch_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<ComparisonResponse>, ApiError> {
    let branch_ids: Vec<i64> = query
        .branch_ids
        .split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|_| {
            ApiError::InvalidRequest(format!("Invalid branch id list: {}", query.branch_ids))
        })?;

    if branch_ids.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Branch id list cannot be empty".to_string(),
        ));
    }

    let totals = read::comparison_totals(state.db.pool(), &branch_ids).await?;

    Ok(Json(ComparisonResponse { branch_ids, totals }))
}

// ============================================================================
// Branch Management
// ============================================================================

/// List all branches.
#[utoipa::path(
    get,
    path = "/api/v1/branches",
    responses(
        (status = 200, description = "List of branches", body = BranchesListResponse)
    ),
    tag = "Branches"
)]
pub async fn list_branches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BranchesListResponse>, ApiError> {
    let branches = queries::list_branches(state.db.pool()).await?;

    Ok(Json(BranchesListResponse {
        branches: branches.into_iter().map(branch_summary).collect(),
    }))
}

/// Create a branch.
#[utoipa::path(
    post,
    path = "/api/v1/branches",
    request_body = CreateBranchRequest,
    responses(
        (status = 200, description = "Branch created", body = BranchSummary),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Control branch not found")
    ),
    tag = "Branches"
)]
pub async fn create_branch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBranchRequest>,
) -> Result<Json<BranchSummary>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "Branch name cannot be empty".to_string(),
        ));
    }

    let pool = state.db.pool();

    if let Some(parent_id) = body.control_branch_id
        && queries::get_branch(pool, parent_id).await?.is_none()
    {
        return Err(ApiError::BranchNotFound(parent_id));
    }

    let activated_on = body.activated_on.unwrap_or_else(|| Utc::now().date_naive());
    let branch = queries::insert_branch(
        pool,
        body.name.trim(),
        body.model,
        body.control_branch_id,
        activated_on,
    )
    .await?;

    Ok(Json(branch_summary(branch)))
}

/// Get branch details.
#[utoipa::path(
    get,
    path = "/api/v1/branches/{branch_id}",
    params(
        ("branch_id" = i64, Path, description = "Branch identifier")
    ),
    responses(
        (status = 200, description = "Branch details", body = BranchSummary),
        (status = 404, description = "Branch not found")
    ),
    tag = "Branches"
)]
pub async fn get_branch(
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<i64>,
) -> Result<Json<BranchSummary>, ApiError> {
    let branch = queries::get_branch(state.db.pool(), branch_id)
        .await?
        .ok_or(ApiError::BranchNotFound(branch_id))?;

    Ok(Json(branch_summary(branch)))
}

/// Soft-delete a branch.
#[utoipa::path(
    delete,
    path = "/api/v1/branches/{branch_id}",
    params(
        ("branch_id" = i64, Path, description = "Branch identifier")
    ),
    responses(
        (status = 200, description = "Branch deleted"),
        (status = 404, description = "Branch not found")
    ),
    tag = "Branches"
)]
pub async fn delete_branch(
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if queries::soft_delete_branch(state.db.pool(), branch_id).await? {
        Ok(Json(serde_json::json!({
            "message": format!("Branch {} deleted", branch_id)
        })))
    } else {
        Err(ApiError::BranchNotFound(branch_id))
    }
}

/// Get a branch's descendant set.
#[utoipa::path(
    get,
    path = "/api/v1/branches/{branch_id}/descendants",
    params(
        ("branch_id" = i64, Path, description = "Branch identifier")
    ),
    responses(
        (status = 200, description = "Descendant branch ids, root included", body = DescendantsResponse),
        (status = 404, description = "Branch not found")
    ),
    tag = "Branches"
)]
pub async fn get_branch_descendants(
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<i64>,
) -> Result<Json<DescendantsResponse>, ApiError> {
    let branches = queries::list_branches(state.db.pool()).await?;
    let hierarchy = BranchHierarchy::build(branches.into_iter().map(node_from_branch).collect());

    if hierarchy.node(branch_id).is_none() {
        return Err(ApiError::BranchNotFound(branch_id));
    }

    Ok(Json(DescendantsResponse {
        branch_id,
        descendant_ids: hierarchy.descendants(branch_id),
    }))
}

// ============================================================================
// Client Management
// ============================================================================

/// List clients, optionally restricted to a branch.
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    params(
        ("branchId" = Option<i64>, Query, description = "Restrict to one branch")
    ),
    responses(
        (status = 200, description = "List of clients", body = ClientsListResponse)
    ),
    tag = "Clients"
)]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClientsQuery>,
) -> Result<Json<ClientsListResponse>, ApiError> {
    let pool = state.db.pool();
    let clients = queries::list_clients(pool, query.branch_id).await?;

    let client_ids: Vec<i64> = clients.iter().map(|c| c.id).collect();
    let last_trades = queries::last_trade_dates(pool, &client_ids).await?;
    let today = Utc::now().date_naive();

    let clients = clients
        .into_iter()
        .map(|client| {
            let not_traded_days = last_trades
                .get(&client.id)
                .map(|last| (today - *last).num_days());
            client_summary(client, not_traded_days)
        })
        .collect();

    Ok(Json(ClientsListResponse { clients }))
}

/// Create a client.
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 200, description = "Client created", body = ClientSummary),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Branch not found")
    ),
    tag = "Clients"
)]
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateClientRequest>,
) -> Result<Json<ClientSummary>, ApiError> {
    if body.code.trim().is_empty() || body.name.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "Client code and name cannot be empty".to_string(),
        ));
    }

    let pool = state.db.pool();

    if queries::get_branch(pool, body.branch_id).await?.is_none() {
        return Err(ApiError::BranchNotFound(body.branch_id));
    }

    let activated_on = body.activated_on.unwrap_or_else(|| Utc::now().date_naive());
    let client = queries::insert_client(
        pool,
        body.code.trim(),
        body.name.trim(),
        body.branch_id,
        activated_on,
    )
    .await?;

    Ok(Json(client_summary(client, None)))
}

/// Get client details.
#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}",
    params(
        ("client_id" = i64, Path, description = "Client identifier")
    ),
    responses(
        (status = 200, description = "Client details", body = ClientSummary),
        (status = 404, description = "Client not found")
    ),
    tag = "Clients"
)]
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
) -> Result<Json<ClientSummary>, ApiError> {
    let pool = state.db.pool();
    let client = queries::get_client(pool, client_id)
        .await?
        .ok_or(ApiError::ClientNotFound(client_id))?;

    let not_traded_days = queries::last_trade_date(pool, client_id)
        .await?
        .map(|last| (Utc::now().date_naive() - last).num_days());

    Ok(Json(client_summary(client, not_traded_days)))
}

/// Soft-delete a client.
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{client_id}",
    params(
        ("client_id" = i64, Path, description = "Client identifier")
    ),
    responses(
        (status = 200, description = "Client deleted"),
        (status = 404, description = "Client not found")
    ),
    tag = "Clients"
)]
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if queries::soft_delete_client(state.db.pool(), client_id).await? {
        Ok(Json(serde_json::json!({
            "message": format!("Client {} deleted", client_id)
        })))
    } else {
        Err(ApiError::ClientNotFound(client_id))
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// Get a user's effective abilities.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/abilities",
    params(
        ("user_id" = i64, Path, description = "User identifier")
    ),
    responses(
        (status = 200, description = "Effective abilities", body = AbilitiesResponse),
        (status = 404, description = "User not found")
    ),
    tag = "Permissions"
)]
pub async fn get_user_abilities(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<AbilitiesResponse>, ApiError> {
    let pool = state.db.pool();
    let user = queries::get_user(pool, user_id)
        .await?
        .ok_or(ApiError::UserNotFound(user_id))?;

    let abilities = permissions::resolve_user_abilities(pool, &user.role, user_id).await?;

    Ok(Json(AbilitiesResponse {
        user_id,
        role: user.role,
        abilities,
    }))
}

// ============================================================================
// API Key Management
// ============================================================================

/// Create an API key.
#[utoipa::path(
    post,
    path = "/api/v1/auth/keys",
    request_body = CreateApiKeyRequest,
    responses(
        (status = 200, description = "API key created", body = CreateApiKeyResponse),
        (status = 400, description = "Invalid request")
    ),
    tag = "Authentication"
)]
pub async fn create_api_key(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateApiKeyRequest>,
) -> Result<Json<CreateApiKeyResponse>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "Key name cannot be empty".to_string(),
        ));
    }
    if body.permissions.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Permissions cannot be empty".to_string(),
        ));
    }
    if body.rate_limit == 0 {
        return Err(ApiError::InvalidRequest(
            "Rate limit must be positive".to_string(),
        ));
    }

    let (key_id, api_key) = state.api_keys.create_key(
        body.name.clone(),
        body.permissions.clone(),
        body.rate_limit,
    );

    Ok(Json(CreateApiKeyResponse {
        key_id,
        api_key,
        name: body.name,
        permissions: body.permissions,
        rate_limit: body.rate_limit,
    }))
}

/// List API keys.
#[utoipa::path(
    get,
    path = "/api/v1/auth/keys",
    responses(
        (status = 200, description = "List of API keys", body = ApiKeysListResponse)
    ),
    tag = "Authentication"
)]
pub async fn list_api_keys(State(state): State<Arc<AppState>>) -> Json<ApiKeysListResponse> {
    Json(ApiKeysListResponse {
        keys: state.api_keys.list_keys(),
    })
}

/// Delete an API key.
#[utoipa::path(
    delete,
    path = "/api/v1/auth/keys/{key_id}",
    params(
        ("key_id" = String, Path, description = "Key identifier")
    ),
    responses(
        (status = 200, description = "API key deleted", body = DeleteApiKeyResponse),
        (status = 404, description = "Key not found")
    ),
    tag = "Authentication"
)]
pub async fn delete_api_key(
    State(state): State<Arc<AppState>>,
    Path(key_id): Path<String>,
) -> Result<Json<DeleteApiKeyResponse>, ApiError> {
    if state.api_keys.delete_key(&key_id) {
        Ok(Json(DeleteApiKeyResponse {
            deleted: true,
            key_id,
        }))
    } else {
        Err(ApiError::NotFound(format!("API key not found: {key_id}")))
    }
}
