use crate::execute::Context;

pub async fn execute(context: &Context, watch: bool) -> eyre::Result<()> {
    let runtime = context.runtime().await?;

    if !watch {
        let removed = runtime.cleaner.clean().await?;
        tracing::info!("✓ removed {removed} expired ticket(s)");
        return Ok(());
    }

    let mut handle = runtime.start_cleaner();
    eyre::ensure!(
        handle.is_running(),
        "the registry cleaner is disabled by configuration"
    );
    tracing::info!(
        interval = ?runtime.cleaner.options().interval,
        "registry cleaner running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    handle.stop();
    tracing::info!("registry cleaner stopped");
    Ok(())
}
