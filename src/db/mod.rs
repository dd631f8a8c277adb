//! Database module for PostgreSQL connection and operations.

mod pool;
pub mod queries;
mod schema;

pub use pool::DatabasePool;
pub use schema::*;
