pub mod commands;
pub mod execute;

pub use commands::Commands;
pub use execute::Context;

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use ticketry_config::{BackendKind, CliOverrides};
use ticketry_core::CascadeMode;

#[derive(Parser, Debug)]
#[command(name = "ticketry")]
#[command(about = "Inspect and maintain SSO ticket registries", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the XDG config location)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Registry backend (memory, moka, document, sql)
    #[arg(long, global = true, value_parser = BackendKind::from_str)]
    pub backend: Option<BackendKind>,

    /// Document server URL or sqlite connection string
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Whether descendants share the fate of their parent (dependent, sovereign)
    #[arg(long, global = true, value_parser = CascadeMode::from_str)]
    pub cascade_mode: Option<CascadeMode>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            backend: self.backend,
            url: self.url.clone(),
            cascade_mode: self.cascade_mode,
        }
    }
}
