// Postgres storage layer with sqlx: the sole `gateway_core::Repository`
// implementation used outside of tests.

pub mod models;
pub mod repositories;

pub use models::*;
pub use repositories::Database;
