//! Shared infrastructure for the S3 Explorer crates: error taxonomy, layered
//! configuration, tracing setup and the request-id middleware.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
