/// Database layer
///
/// - `pool`: connection pool creation and health checks
/// - `migrations`: embedded schema migrations
///
/// Table-level queries live next to their row types in [`crate::models`].

pub mod migrations;
pub mod pool;
