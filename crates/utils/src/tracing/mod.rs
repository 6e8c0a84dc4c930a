use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system with an `info` default filter.
///
/// `RUST_LOG` takes precedence when set.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    init_with_default("info")
}

/// Initialize the tracing system, falling back to `directive` when
/// `RUST_LOG` is not set
pub fn init_with_default(
    directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directive))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span wrapping one registry operation on one ticket
pub fn registry_span(operation: &'static str, ticket_id: &str) -> Span {
    span!(Level::DEBUG, "registry", operation = operation, ticket_id = %ticket_id)
}

/// Span wrapping one cleaner pass
pub fn cleaner_span(backend: &str) -> Span {
    span!(Level::INFO, "cleaner", backend = %backend)
}
