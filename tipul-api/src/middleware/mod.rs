/// Middleware modules for the API server
///
/// - `security`: security response headers
/// - `cron`: shared-secret check for the cron endpoints
///
/// JWT authentication lives in `tipul_shared::auth::middleware` and is
/// wired up in [`crate::app`].

pub mod cron;
pub mod security;
