// Library exports shared by the veil binary and its tests

/**
 * HTTP client for the secret-sharing API, and the
 *  secret store built on top of it.
 */
pub mod client;
/**
 * Tracing setup for the CLI.
 */
pub mod logging;
/**
 * On-disk configuration in the veil directory
 *  (~/.veil by default).
 */
pub mod state;

pub use client::{ApiClient, ApiError, HttpSecretStore};
pub use state::{AppConfig, AppState, StateError};
