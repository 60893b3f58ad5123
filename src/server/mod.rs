//! HTTP API Server Module
//!
//! REST + SSE surface over the job registry: start collections, poll or
//! stream progress, fetch metadata, trigger exports, and download the
//! assembled dataset.

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use server::HttpServer;
