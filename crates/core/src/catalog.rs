//! Ticket catalog
//!
//! Built once at startup and shared read-only (`Arc<TicketCatalog>`). Maps
//! each ticket kind to its prefix, expiration policy factory, storage region
//! and storage timeout, and classifies raw id strings back to their kind.

use crate::errors::{Error, Result};
use crate::expiration::{CascadeMode, ExpirationPolicy};
use crate::id::{self, DEFAULT_ID_LENGTH, MIN_ID_LENGTH};
use crate::ticket::TicketKind;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Produces the expiration policy attached to each new ticket of a kind
pub type ExpirationPolicyFactory = Arc<dyn Fn() -> ExpirationPolicy + Send + Sync>;

/// Catalog entry for one ticket kind
#[derive(Clone)]
pub struct TicketDefinition {
    kind: TicketKind,
    prefix: String,
    policy_factory: ExpirationPolicyFactory,
    storage_name: String,
    storage_timeout: Duration,
    id_length: usize,
}

impl TicketDefinition {
    /// Definition using the kind's default prefix, storage name and policy
    pub fn new(kind: TicketKind) -> Self {
        let policy = default_policy(kind);
        let storage_timeout = policy.maximum_lifetime().unwrap_or(Duration::ZERO);
        Self {
            kind,
            prefix: kind.default_prefix().to_string(),
            policy_factory: Arc::new(move || policy.clone()),
            storage_name: kind.default_storage_name().to_string(),
            storage_timeout,
            id_length: DEFAULT_ID_LENGTH,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Every new ticket gets a copy of `policy`
    pub fn with_policy(mut self, policy: ExpirationPolicy) -> Self {
        self.policy_factory = Arc::new(move || policy.clone());
        self
    }

    pub fn with_policy_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> ExpirationPolicy + Send + Sync + 'static,
    {
        self.policy_factory = Arc::new(factory);
        self
    }

    pub fn with_storage_name(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = storage_name.into();
        self
    }

    /// Native storage TTL hint; zero disables native expiry for the region
    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.storage_timeout = storage_timeout;
        self
    }

    pub fn with_id_length(mut self, id_length: usize) -> Self {
        self.id_length = id_length;
        self
    }

    pub fn kind(&self) -> TicketKind {
        self.kind
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn new_expiration_policy(&self) -> ExpirationPolicy {
        (self.policy_factory)()
    }

    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn storage_timeout(&self) -> Duration {
        self.storage_timeout
    }

    pub fn id_length(&self) -> usize {
        self.id_length
    }
}

impl fmt::Debug for TicketDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketDefinition")
            .field("kind", &self.kind)
            .field("prefix", &self.prefix)
            .field("policy", &self.new_expiration_policy())
            .field("storage_name", &self.storage_name)
            .field("storage_timeout", &self.storage_timeout)
            .field("id_length", &self.id_length)
            .finish()
    }
}

/// Default lifetimes for each kind
pub fn default_policy(kind: TicketKind) -> ExpirationPolicy {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;

    let session = ExpirationPolicy::timeout(
        Duration::from_secs(8 * HOUR),
        Duration::from_secs(2 * HOUR),
    );
    match kind {
        TicketKind::TicketGranting => session,
        TicketKind::Service | TicketKind::Proxy => {
            ExpirationPolicy::descendant(ExpirationPolicy::multi_use(1, Duration::from_secs(10)))
        }
        TicketKind::ProxyGranting | TicketKind::OAuthAccessToken => {
            ExpirationPolicy::descendant(session)
        }
        TicketKind::TransientSession => {
            ExpirationPolicy::hard_timeout(Duration::from_secs(5 * MINUTE))
        }
        TicketKind::OAuthCode => {
            ExpirationPolicy::descendant(ExpirationPolicy::multi_use(1, Duration::from_secs(30)))
        }
        TicketKind::OAuthRefreshToken => ExpirationPolicy::descendant(
            ExpirationPolicy::hard_timeout(Duration::from_secs(30 * 24 * HOUR)),
        ),
    }
}

/// Read-only registry of ticket definitions
#[derive(Debug, Clone)]
pub struct TicketCatalog {
    definitions: BTreeMap<TicketKind, TicketDefinition>,
    by_prefix: HashMap<String, TicketKind>,
    cascade_mode: CascadeMode,
}

impl TicketCatalog {
    pub fn builder() -> TicketCatalogBuilder {
        TicketCatalogBuilder::new()
    }

    /// Every kind with its defaults
    pub fn with_defaults(cascade_mode: CascadeMode) -> Result<Self> {
        TicketKind::ALL
            .into_iter()
            .fold(Self::builder(), |builder, kind| {
                builder.register(TicketDefinition::new(kind))
            })
            .cascade_mode(cascade_mode)
            .build()
    }

    pub fn find(&self, kind: TicketKind) -> Option<&TicketDefinition> {
        self.definitions.get(&kind)
    }

    /// Like [`find`](Self::find) but a missing entry is a configuration error
    pub fn require(&self, kind: TicketKind) -> Result<&TicketDefinition> {
        self.find(kind).ok_or_else(|| {
            Error::configuration(format!("no ticket definition registered for kind '{kind}'"))
        })
    }

    pub fn find_by_prefix(&self, prefix: &str) -> Option<&TicketDefinition> {
        self.by_prefix
            .get(prefix)
            .and_then(|kind| self.definitions.get(kind))
    }

    /// Classify an arbitrary ticket id by its prefix
    pub fn find_by_ticket_id(&self, ticket_id: &str) -> Option<&TicketDefinition> {
        id::prefix_of(ticket_id).and_then(|prefix| self.find_by_prefix(prefix))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TicketDefinition> {
        self.definitions.values()
    }

    pub fn cascade_mode(&self) -> CascadeMode {
        self.cascade_mode
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Collects definitions and validates them into a [`TicketCatalog`]
#[derive(Debug, Default)]
pub struct TicketCatalogBuilder {
    definitions: Vec<TicketDefinition>,
    cascade_mode: CascadeMode,
}

impl TicketCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition; a later registration for the same kind wins
    pub fn register(mut self, definition: TicketDefinition) -> Self {
        self.definitions.retain(|d| d.kind != definition.kind);
        self.definitions.push(definition);
        self
    }

    pub fn cascade_mode(mut self, cascade_mode: CascadeMode) -> Self {
        self.cascade_mode = cascade_mode;
        self
    }

    pub fn build(self) -> Result<TicketCatalog> {
        let mut definitions = BTreeMap::new();
        let mut by_prefix = HashMap::new();
        let mut storage_names = HashSet::new();

        for mut definition in self.definitions {
            validate_prefix(&definition)?;
            validate_storage_name(&definition)?;

            if definition.id_length < MIN_ID_LENGTH {
                return Err(Error::configuration(format!(
                    "id length {} for '{}' is below the minimum of {MIN_ID_LENGTH}",
                    definition.id_length, definition.kind
                )));
            }

            match definition.new_expiration_policy().maximum_lifetime() {
                Some(lifetime)
                    if !definition.storage_timeout.is_zero()
                        && definition.storage_timeout < lifetime =>
                {
                    tracing::warn!(
                        kind = %definition.kind,
                        configured_secs = definition.storage_timeout.as_secs(),
                        lifetime_secs = lifetime.as_secs(),
                        "storage timeout shorter than ticket lifetime, raising it"
                    );
                    definition.storage_timeout = lifetime;
                }
                None if !definition.storage_timeout.is_zero() => {
                    tracing::warn!(
                        kind = %definition.kind,
                        configured_secs = definition.storage_timeout.as_secs(),
                        "ticket lifetime is unbounded, dropping the storage timeout"
                    );
                    definition.storage_timeout = Duration::ZERO;
                }
                _ => {}
            }

            if let Some(existing) = by_prefix.insert(definition.prefix.clone(), definition.kind) {
                return Err(Error::configuration(format!(
                    "prefix '{}' is used by both '{existing}' and '{}'",
                    definition.prefix, definition.kind
                )));
            }
            if !storage_names.insert(definition.storage_name.clone()) {
                return Err(Error::configuration(format!(
                    "storage name '{}' is used by more than one ticket kind",
                    definition.storage_name
                )));
            }

            definitions.insert(definition.kind, definition);
        }

        tracing::debug!(
            kinds = definitions.len(),
            cascade_mode = %self.cascade_mode,
            "ticket catalog built"
        );

        Ok(TicketCatalog {
            definitions,
            by_prefix,
            cascade_mode: self.cascade_mode,
        })
    }
}

fn validate_prefix(definition: &TicketDefinition) -> Result<()> {
    let valid = !definition.prefix.is_empty()
        && definition.prefix.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "prefix '{}' for '{}' must be non-empty and alphanumeric",
            definition.prefix, definition.kind
        )))
    }
}

/// Storage names double as SQL table and document database names
fn validate_storage_name(definition: &TicketDefinition) -> Result<()> {
    let name = &definition.storage_name;
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "storage name '{name}' for '{}' must match [a-z][a-z0-9_]*",
            definition.kind
        )))
    }
}
