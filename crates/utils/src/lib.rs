//! Shared utilities for the ticketry workspace
//!
//! Bounded retry for optimistic-concurrency writes, tracing initialisation
//! and XDG configuration paths.

pub mod resilience;
pub mod tracing;
pub mod xdg;

pub use resilience::{retry, RetryConfig};
pub use xdg::XdgPaths;
