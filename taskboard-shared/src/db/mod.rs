/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded schema migrations
///
/// Queries live next to their row types in `models`, and the
/// [`PgStore`](crate::repository::postgres::PgStore) composes them into
/// transactions.

pub mod migrations;
pub mod pool;
