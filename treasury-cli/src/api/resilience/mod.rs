//! Resilience features for service requests
//!
//! Provides the bounded, fixed-delay retry policy shared by the data service
//! fetch and the import post.

pub mod config;
pub mod retry;

pub use config::RetryConfig;
pub use retry::{RetryError, RetryPolicy, RetryableError};
