//! Turning configuration into a ticket catalog

use crate::settings::{KindSettings, TicketryConfig};
use std::time::Duration;
use ticketry_core::catalog::default_policy;
use ticketry_core::{ExpirationPolicy, Result, TicketCatalog, TicketDefinition, TicketKind};

impl TicketryConfig {
    /// Catalog with every kind, defaults overlaid by `tickets.<kind>` settings
    pub fn catalog(&self) -> Result<TicketCatalog> {
        TicketKind::ALL
            .into_iter()
            .fold(TicketCatalog::builder(), |builder, kind| {
                let definition = match self.tickets.get(&kind) {
                    Some(settings) => definition_for(kind, settings),
                    None => TicketDefinition::new(kind),
                };
                builder.register(definition)
            })
            .cascade_mode(self.cascade_mode)
            .build()
    }
}

fn definition_for(kind: TicketKind, settings: &KindSettings) -> TicketDefinition {
    let mut definition = TicketDefinition::new(kind);

    if settings.overrides_policy() {
        let policy = policy_for(kind, settings);
        definition = definition
            .with_storage_timeout(policy.maximum_lifetime().unwrap_or(Duration::ZERO))
            .with_policy(policy);
    }
    if let Some(prefix) = &settings.prefix {
        definition = definition.with_prefix(prefix.clone());
    }
    if let Some(storage_name) = &settings.storage_name {
        definition = definition.with_storage_name(storage_name.clone());
    }
    if let Some(seconds) = settings.storage_timeout_seconds {
        definition = definition.with_storage_timeout(Duration::from_secs(seconds));
    }
    if let Some(id_length) = settings.id_length {
        definition = definition.with_id_length(id_length);
    }
    definition
}

/// Lifetime settings of a kind as a policy. Descendant kinds stay tied to
/// their parent.
fn policy_for(kind: TicketKind, settings: &KindSettings) -> ExpirationPolicy {
    let time_to_live = settings.time_to_live_seconds.map(Duration::from_secs);
    let time_to_idle = settings.time_to_idle_seconds.map(Duration::from_secs);

    let standalone = match settings.max_uses {
        Some(max_uses) => {
            let fallback = default_policy(kind)
                .maximum_lifetime()
                .unwrap_or(Duration::from_secs(10));
            ExpirationPolicy::multi_use(max_uses, time_to_live.unwrap_or(fallback))
        }
        None => ExpirationPolicy::Timeout {
            time_to_live,
            time_to_idle,
        },
    };

    if kind.is_root() {
        standalone
    } else {
        ExpirationPolicy::descendant(standalone)
    }
}
