//! # Tipul Worker Library
//!
//! Outbound integrations and background work shared by the API server and
//! the scheduler binary.
//!
//! ## Modules
//!
//! - `config`: worker and integration settings from the environment
//! - `ai`: Gemini transcription and Claude analysis behind traits
//! - `mail`: e-mail delivery through Resend, and the message templates
//! - `pipeline`: recording transcription and analysis with status tracking
//! - `jobs`: notification digest and 48-hour session reminders
//! - `scheduler`: runs the jobs on intervals until shutdown
//!
//! ## Example
//!
//! ```no_run
//! use tipul_worker::ai::{MockTranscriber, Transcriber};
//!
//! # async fn example() {
//! let transcriber = MockTranscriber::new("Therapist: Hello");
//! println!("Transcriber: {}", transcriber.name());
//! # }
//! ```

pub mod ai;
pub mod config;
pub mod jobs;
pub mod mail;
pub mod pipeline;
pub mod scheduler;
