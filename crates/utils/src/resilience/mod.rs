//! Retry logic for operations that lose optimistic-concurrency races.
//!
//! ```rust,no_run
//! use ticketry_utils::resilience::{retry, RetryConfig};
//!
//! # async fn example() -> ticketry_core::Result<String> {
//! let config = RetryConfig::for_conflicts(3);
//! retry(&config, || async {
//!     // Your operation here
//!     Ok("success".to_string())
//! })
//! .await
//! # }
//! ```

pub mod config;
pub mod retry;

pub use config::RetryConfig;
pub use retry::retry;
