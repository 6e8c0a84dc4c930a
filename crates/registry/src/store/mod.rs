//! Storage adapters behind the registry
//!
//! A [`TicketStore`] only moves [`TicketRecord`]s in and out of named regions.
//! Everything ticket-aware (cipher, lineage, merge, cascade) lives in
//! [`crate::DefaultTicketRegistry`].

mod cache;
mod document;
mod memory;
mod sql;

pub use cache::MokaTicketStore;
pub use document::{DocumentStoreOptions, DocumentTicketStore};
pub use memory::MemoryTicketStore;
pub use sql::SqlTicketStore;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use ticketry_core::{Result, TicketDefinition, TicketKind, TicketRecord};

/// Opaque optimistic-concurrency token handed out by a store
pub type Revision = String;

/// Read guarantees a backend gives across callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Every read observes the latest acknowledged write
    Strong,
    /// A caller observes its own writes; other callers may briefly lag
    ReadYourWrites,
    /// Reads may be served by a replica that has not caught up yet
    Eventual,
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strong => "strong",
            Self::ReadYourWrites => "read-your-writes",
            Self::Eventual => "eventual",
        })
    }
}

/// Static description of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendInfo {
    pub name: &'static str,
    pub consistency: Consistency,
    /// Entries vanish on their own once the region timeout passes
    pub native_expiry: bool,
}

/// Where the tickets of one kind live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRegion {
    pub name: String,
    pub kind: TicketKind,
    /// Native expiry hint; `None` leaves removal to the cleaner
    pub timeout: Option<Duration>,
}

impl StorageRegion {
    pub fn new(name: impl Into<String>, kind: TicketKind, timeout: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            kind,
            timeout,
        }
    }
}

impl From<&TicketDefinition> for StorageRegion {
    fn from(definition: &TicketDefinition) -> Self {
        let timeout = definition.storage_timeout();
        Self::new(
            definition.storage_name(),
            definition.kind(),
            (!timeout.is_zero()).then_some(timeout),
        )
    }
}

/// A record as persisted under `key`, plus the revision it was read at
#[derive(Debug, Clone)]
pub struct StoredTicket {
    pub key: String,
    pub record: TicketRecord,
    pub revision: Option<Revision>,
}

impl StoredTicket {
    pub fn new(key: impl Into<String>, record: TicketRecord) -> Self {
        Self {
            key: key.into(),
            record,
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<Revision>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

/// Backend adapter contract.
///
/// `replace` and `remove` take the revision the caller last read. A store
/// that tracks revisions fails with `Error::Conflict` when it no longer
/// matches; stores without revisions apply last-writer-wins. Both return
/// `Ok(false)` when the key is gone.
#[async_trait]
pub trait TicketStore: Send + Sync + 'static {
    fn backend(&self) -> BackendInfo;

    /// Create whatever tables, databases or caches the regions need
    async fn initialize(&self, regions: &[StorageRegion]) -> Result<()>;

    async fn fetch(&self, region: &StorageRegion, key: &str) -> Result<Option<StoredTicket>>;

    /// Unconditional upsert
    async fn insert(&self, region: &StorageRegion, ticket: StoredTicket) -> Result<()>;

    async fn replace(
        &self,
        region: &StorageRegion,
        ticket: StoredTicket,
        expected: Option<&str>,
    ) -> Result<bool>;

    async fn remove(&self, region: &StorageRegion, key: &str, expected: Option<&str>)
        -> Result<bool>;

    async fn scan(&self, region: &StorageRegion) -> Result<Vec<StoredTicket>>;

    async fn count(&self, region: &StorageRegion) -> Result<usize>;

    /// Remove everything in the region, returning how many records went away
    async fn clear(&self, region: &StorageRegion) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketry_core::catalog::TicketDefinition;

    #[test]
    fn test_region_from_definition_keeps_timeout() {
        let definition = TicketDefinition::new(TicketKind::TicketGranting)
            .with_storage_timeout(Duration::from_secs(60));
        let region = StorageRegion::from(&definition);
        assert_eq!(region.name, "ticket_granting_tickets");
        assert_eq!(region.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_storage_timeout_disables_native_expiry() {
        let definition = TicketDefinition::new(TicketKind::Service)
            .with_storage_timeout(Duration::ZERO);
        assert_eq!(StorageRegion::from(&definition).timeout, None);
    }

    #[test]
    fn test_consistency_display() {
        assert_eq!(Consistency::ReadYourWrites.to_string(), "read-your-writes");
    }
}
