//! This crate contains the code that provides the observability of the
//! deployer service: logging initialization, the panic hook and the
//! prometheus registry backing the `/metrics` endpoint.
pub mod config;
pub mod metrics;
pub mod panic_hook;
pub mod request_span;
pub mod tracing;

pub use config::Config;
