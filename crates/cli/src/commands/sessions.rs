use crate::commands::tickets::summary_line;
use crate::execute::Context;
use chrono::Utc;

pub async fn execute(context: &Context, principal: &str, count: bool) -> eyre::Result<()> {
    let runtime = context.runtime().await?;

    if count {
        println!("{}", runtime.registry.count_sessions_for(principal).await?);
        return Ok(());
    }

    let sessions = runtime.registry.get_sessions_for(principal).await?;
    let now = Utc::now();
    for session in &sessions {
        println!("{}", summary_line(session, now));
    }
    tracing::info!("{} live session(s) for {principal}", sessions.len());
    Ok(())
}
