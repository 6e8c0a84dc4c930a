use clap::Parser;
use ticketry_cli::{execute, Cli};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    if let Err(e) = ticketry_utils::tracing::init() {
        eprintln!("Failed to initialize tracing: {e}");
    }

    let cli = Cli::parse();
    execute::execute_command(cli).await
}
