//! # Brokerage Back-Office Backend - REST API Server
//!
//! A multi-tenant brokerage back-office service whose core is a branch
//! hierarchy rollup aggregator: every branch's daily statistics are computed
//! over its full subtree of sub-branches, franchisees, and referral partners,
//! then persisted as one denormalized snapshot row per (branch, date).
//! Built with [Axum](https://crates.io/crates/axum) for async HTTP handling,
//! [SQLx](https://crates.io/crates/sqlx) for PostgreSQL access, and
//! OpenAPI/Swagger documentation via [utoipa](https://crates.io/crates/utoipa).
//!
//! ## Key Features
//!
//! - **Hierarchy Rollup**: Bottom-up aggregation of brokerage revenue,
//!   client counts, franchisee counts, segment breakdowns, and ranked
//!   top-performer lists over the branch tree.
//!
//! - **Idempotent Snapshots**: Each run transactionally replaces the
//!   snapshot rows for its date; re-running a date converges to the same
//!   rows. A per-date database lock keeps concurrent runs out.
//!
//! - **Job Queue**: Rollup runs are serialized through a worker task; a
//!   second request for an in-flight date is rejected with 409.
//!
//! - **RESTful API**: Branch and client management, snapshot reads,
//!   cross-branch comparison, and user permission resolution.
//!
//! - **OpenAPI Documentation**: Auto-generated Swagger UI at `/swagger-ui/`.
//!
//! - **Structured Logging**: Request tracing with `tower-http`.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Route handlers, router configuration, middleware |
//! | [`auth`] | API key store and rate limiting |
//! | [`config`] | TOML configuration loading |
//! | [`db`] | PostgreSQL pool, schema types, CRUD queries |
//! | [`error`] | API error types with `IntoResponse` implementation |
//! | [`models`] | Request/response DTOs with OpenAPI schemas |
//! | [`permissions`] | Role/user ability resolution |
//! | [`rollup`] | The hierarchy rollup aggregator |
//! | [`scheduler`] | Aggregation job queue and scheduled runs |
//! | [`state`] | Application state management |
//!
//! ## API Endpoints
//!
//! ### Health & Statistics
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/stats` | Back-office overview |
//! | POST | `/api/v1/stats/aggregate` | Enqueue a rollup run |
//! | GET | `/api/v1/stats/branches/{id}?date=` | Branch snapshot for a date |
//! | GET | `/api/v1/stats/comparison?branchIds=` | Compare branch subsets |
//!
//! ### Branches & Clients
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET/POST | `/api/v1/branches` | List / create branches |
//! | GET/DELETE | `/api/v1/branches/{id}` | Get / soft-delete a branch |
//! | GET | `/api/v1/branches/{id}/descendants` | Descendant branch ids |
//! | GET/POST | `/api/v1/clients` | List / create clients |
//! | GET/DELETE | `/api/v1/clients/{id}` | Get / soft-delete a client |
//!
//! ### Permissions & Authentication
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/v1/users/{id}/abilities` | Effective user abilities |
//! | POST/GET | `/api/v1/auth/keys` | Create / list API keys |
//! | DELETE | `/api/v1/auth/keys/{key_id}` | Delete an API key |
//!
//! ## Example Usage
//!
//! ```bash
//! # Start the server against a local Postgres
//! CONFIG_PATH=config.toml cargo run
//!
//! # Trigger a rollup for a date
//! curl -X POST http://localhost:8080/api/v1/stats/aggregate \
//!   -H "Content-Type: application/json" \
//!   -d '{"date": "2024-03-15"}'
//!
//! # Read a branch snapshot
//! curl "http://localhost:8080/api/v1/stats/branches/1?date=2024-03-15"
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod permissions;
pub mod rollup;
pub mod scheduler;
pub mod state;
