//! Database configuration and connection pool initialization.
//!
//! The pool is the only process-wide shared mutable resource in the request
//! pipeline. Tenant-bound requests check a connection out of it and apply
//! `SET search_path` to that connection only; the `after_release` hook below
//! resets the search path every time a connection returns to the pool, so a
//! pooled connection can never leak one tenant's schema into another request.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::env;

/// Initializes the PostgreSQL connection pool.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the connection cannot be
/// established.
pub async fn init_db_pool() -> PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    pool_options(max_connections)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

/// Pool options with the search-path reset hook installed. Exposed so test
/// harnesses can build lazily-connecting pools with identical semantics.
pub fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .after_release(|conn, _meta| {
            Box::pin(async move {
                sqlx::query(r#"SET search_path TO "public""#)
                    .execute(&mut *conn)
                    .await?;
                Ok(true)
            })
        })
}
