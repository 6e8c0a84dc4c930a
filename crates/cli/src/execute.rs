use crate::commands::Commands;
use crate::Cli;
use eyre::WrapErr;
use ticketry_config::{ConfigLoader, LoadedConfig};
use ticketry_registry::TicketingRuntime;

/// Loaded configuration shared by every command
pub struct Context {
    pub loaded: LoadedConfig,
}

impl Context {
    pub fn load(cli: &Cli) -> eyre::Result<Self> {
        let loaded = ConfigLoader::load_from(cli.config.as_deref(), &cli.overrides())
            .wrap_err("failed to load configuration")?;
        tracing::debug!(sources = ?loaded.sources, "configuration loaded");
        Ok(Self { loaded })
    }

    /// Catalog, registry and cleaner wired from the loaded configuration
    pub async fn runtime(&self) -> eyre::Result<TicketingRuntime> {
        TicketingRuntime::from_config(&self.loaded.config)
            .await
            .wrap_err_with(|| {
                format!(
                    "failed to open the {} registry",
                    self.loaded.config.registry.backend
                )
            })
    }
}

pub async fn execute_command(cli: Cli) -> eyre::Result<()> {
    let context = Context::load(&cli)?;
    cli.command.execute(&context).await
}

impl Commands {
    pub async fn execute(self, context: &Context) -> eyre::Result<()> {
        match self {
            Commands::Catalog => crate::commands::catalog::execute(context),
            Commands::Config => crate::commands::config::execute(context),
            Commands::Keys { command } => command.execute(),
            Commands::Tickets { command } => command.execute(context).await,
            Commands::Sessions { principal, count } => {
                crate::commands::sessions::execute(context, &principal, count).await
            }
            Commands::Clean { watch } => crate::commands::clean::execute(context, watch).await,
        }
    }
}
