//! # Tipul Shared Library
//!
//! Types and data access shared by the Tipul API server and the worker.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and migrations
//! - `models`: row types and owner-scoped queries
//! - `auth`: passwords, JWTs, request auth context, ownership checks
//! - `scheduling`: local-time windows, overlap rule, recurring-session planning
//! - `storage`: upload files on disk

pub mod auth;
pub mod db;
pub mod models;
pub mod scheduling;
pub mod storage;

/// Current version of the Tipul shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
