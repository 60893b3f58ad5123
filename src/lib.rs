//! websnap: screenshot dataset collection engine
//!
//! Collects labeled webpage screenshots for multimodal fine-tuning:
//! - Bounded-concurrency collection jobs with retry and live progress
//! - Pluggable capture providers (remote screenshot API, local placeholder)
//! - JSONL metadata persistence and vision fine-tuning export
//! - REST + SSE API over the job registry

pub mod archive;
pub mod capture;
pub mod categories;
pub mod config;
pub mod export;
pub mod job;
pub mod server;
pub mod store;
pub mod types;
pub mod worker;

pub use config::Config;
pub use types::*;
