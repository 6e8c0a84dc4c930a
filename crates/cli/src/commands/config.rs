use crate::execute::Context;
use ticketry_config::ConfigSource;

pub fn execute(context: &Context) -> eyre::Result<()> {
    let mut shown = context.loaded.config.clone();
    if shown.cipher.encryption_key.is_some() {
        shown.cipher.encryption_key = Some(REDACTED.to_string());
    }
    if shown.cipher.signing_key.is_some() {
        shown.cipher.signing_key = Some(REDACTED.to_string());
    }
    if shown.registry.password.is_some() {
        shown.registry.password = Some(REDACTED.to_string());
    }

    println!("{}", serde_json::to_string_pretty(&shown)?);
    for source in &context.loaded.sources {
        let described = match source {
            ConfigSource::Default => "defaults".to_string(),
            ConfigSource::ConfigFile(path) => format!("file {}", path.display()),
            ConfigSource::EnvironmentVariable(name) => format!("environment {name}"),
            ConfigSource::CommandLine => "command line".to_string(),
        };
        tracing::info!("source: {described}");
    }
    Ok(())
}

const REDACTED: &str = "<redacted>";
