//! Configuration for ticketry deployments
//!
//! [`TicketryConfig`] is the whole deployment configuration. It is loaded by
//! [`ConfigLoader`] from defaults, a JSON file, `TICKETRY_*` environment
//! variables and command line overrides, in that order of precedence, or
//! assembled in code with [`ConfigBuilder`].

pub mod builder;
pub mod catalog;
pub mod loader;
pub mod settings;

#[cfg(test)]
mod config_tests;

pub use builder::ConfigBuilder;
pub use loader::{CliOverrides, ConfigLoader, ConfigSource, LoadedConfig};
pub use settings::{
    BackendKind, CipherSettings, CleanerSettings, KindSettings, RegistrySettings, TicketryConfig,
};
