use crate::execute::Context;
use eyre::WrapErr;

pub fn execute(context: &Context) -> eyre::Result<()> {
    let catalog = context
        .loaded
        .config
        .catalog()
        .wrap_err("invalid ticket catalog")?;

    println!("cascade mode: {}", catalog.cascade_mode());
    println!(
        "{:<20} {:<6} {:<28} {:>12}  policy",
        "kind", "prefix", "storage", "ttl (s)"
    );
    for definition in catalog.definitions() {
        println!(
            "{:<20} {:<6} {:<28} {:>12}  {}",
            definition.kind(),
            definition.prefix(),
            definition.storage_name(),
            definition.storage_timeout().as_secs(),
            definition.new_expiration_policy()
        );
    }
    Ok(())
}
