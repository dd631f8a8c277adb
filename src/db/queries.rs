//! CRUD queries for branches, clients, and users.
//!
//! Soft deletes only; the aggregator and the read side both filter on
//! `deleted_at IS NULL`.

use crate::db::schema::{Branch, BranchModel, Client, User};
use chrono::NaiveDate;
use sqlx::PgPool;

const BRANCH_COLUMNS: &str = "id, name, model, control_branch_id, activated_on, deleted_at, created_at";
const CLIENT_COLUMNS: &str = "id, code, name, branch_id, activated_on, deleted_at, created_at";

/// Lists all non-deleted branches ordered by id.
///
/// # Errors
/// Returns the database error.
pub async fn list_branches(pool: &PgPool) -> Result<Vec<Branch>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {BRANCH_COLUMNS} FROM branches WHERE deleted_at IS NULL ORDER BY id"
    ))
    .fetch_all(pool)
    .await
}

/// Fetches one non-deleted branch.
///
/// # Errors
/// Returns the database error.
pub async fn get_branch(pool: &PgPool, id: i64) -> Result<Option<Branch>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Inserts a branch and returns the stored row.
///
/// # Errors
/// Returns the database error.
pub async fn insert_branch(
    pool: &PgPool,
    name: &str,
    model: BranchModel,
    control_branch_id: Option<i64>,
    activated_on: NaiveDate,
) -> Result<Branch, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO branches (name, model, control_branch_id, activated_on) \
         VALUES ($1, $2, $3, $4) RETURNING {BRANCH_COLUMNS}"
    ))
    .bind(name)
    .bind(model)
    .bind(control_branch_id)
    .bind(activated_on)
    .fetch_one(pool)
    .await
}

/// Soft-deletes a branch. Returns false if no live row matched.
///
/// # Errors
/// Returns the database error.
pub async fn soft_delete_branch(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE branches SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Lists non-deleted clients, optionally restricted to one branch.
///
/// # Errors
/// Returns the database error.
pub async fn list_clients(
    pool: &PgPool,
    branch_id: Option<i64>,
) -> Result<Vec<Client>, sqlx::Error> {
    match branch_id {
        Some(branch_id) => {
            sqlx::query_as(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients \
                 WHERE branch_id = $1 AND deleted_at IS NULL ORDER BY id"
            ))
            .bind(branch_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients WHERE deleted_at IS NULL ORDER BY id"
            ))
            .fetch_all(pool)
            .await
        }
    }
}

/// Fetches one non-deleted client.
///
/// # Errors
/// Returns the database error.
pub async fn get_client(pool: &PgPool, id: i64) -> Result<Option<Client>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Inserts a client and returns the stored row.
///
/// # Errors
/// Returns the database error.
pub async fn insert_client(
    pool: &PgPool,
    code: &str,
    name: &str,
    branch_id: i64,
    activated_on: NaiveDate,
) -> Result<Client, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO clients (code, name, branch_id, activated_on) \
         VALUES ($1, $2, $3, $4) RETURNING {CLIENT_COLUMNS}"
    ))
    .bind(code)
    .bind(name)
    .bind(branch_id)
    .bind(activated_on)
    .fetch_one(pool)
    .await
}

/// Soft-deletes a client. Returns false if no live row matched.
///
/// # Errors
/// Returns the database error.
pub async fn soft_delete_client(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE clients SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns a client's most recent trade date from the revenue ledger.
///
/// # Errors
/// Returns the database error.
pub async fn last_trade_date(
    pool: &PgPool,
    client_id: i64,
) -> Result<Option<NaiveDate>, sqlx::Error> {
    let row: (Option<NaiveDate>,) =
        sqlx::query_as("SELECT MAX(trade_date) FROM segment_revenue WHERE client_id = $1")
            .bind(client_id)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

/// Returns the most recent trade date per client for a set of clients.
/// Clients that never traded have no entry.
///
/// # Errors
/// Returns the database error.
pub async fn last_trade_dates(
    pool: &PgPool,
    client_ids: &[i64],
) -> Result<std::collections::HashMap<i64, NaiveDate>, sqlx::Error> {
    let rows: Vec<(i64, Option<NaiveDate>)> = sqlx::query_as(
        "SELECT client_id, MAX(trade_date) FROM segment_revenue \
         WHERE client_id = ANY($1) GROUP BY client_id",
    )
    .bind(client_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(id, date)| date.map(|d| (id, d)))
        .collect())
}

/// Counts non-deleted branches.
///
/// # Errors
/// Returns the database error.
pub async fn count_branches(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM branches WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Counts non-deleted clients.
///
/// # Errors
/// Returns the database error.
pub async fn count_clients(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Fetches one non-deleted user.
///
/// # Errors
/// Returns the database error.
pub async fn get_user(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, name, email, role, branch_id, deleted_at \
         FROM users WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
