//! # Tipul API Server Library
//!
//! HTTP surface of the practice-management backend: clients, sessions,
//! payments, recordings and their AI outputs, documents, tasks and
//! notifications.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and the cron secret check
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
