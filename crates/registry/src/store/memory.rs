//! In-process store over concurrent hash maps

use super::{BackendInfo, Consistency, StorageRegion, StoredTicket, TicketStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use ticketry_core::{Error, Result, TicketRecord};

type Region = Arc<DashMap<String, Slot>>;

#[derive(Debug, Clone)]
struct Slot {
    record: TicketRecord,
    version: u64,
}

impl Slot {
    fn matches(&self, expected: Option<&str>) -> bool {
        expected.map_or(true, |expected| expected == self.version.to_string())
    }

    fn to_stored(&self, key: &str) -> StoredTicket {
        StoredTicket::new(key, self.record.clone()).with_revision(self.version.to_string())
    }
}

/// Single-node store holding private copies of every record.
///
/// Handing out clones means a caller's mutation is invisible until it goes
/// through `update_ticket`, exactly like the network backends.
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    regions: DashMap<String, Region>,
    next_version: AtomicU64,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Clone the region handle so no outer shard lock outlives this call
    fn region(&self, name: &str) -> Region {
        if let Some(region) = self.regions.get(name) {
            return Arc::clone(&region);
        }
        Arc::clone(&self.regions.entry(name.to_string()).or_default())
    }

    fn bump(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    fn backend(&self) -> BackendInfo {
        BackendInfo {
            name: "memory",
            consistency: Consistency::Strong,
            native_expiry: false,
        }
    }

    async fn initialize(&self, regions: &[StorageRegion]) -> Result<()> {
        for region in regions {
            self.region(&region.name);
        }
        Ok(())
    }

    async fn fetch(&self, region: &StorageRegion, key: &str) -> Result<Option<StoredTicket>> {
        Ok(self
            .region(&region.name)
            .get(key)
            .map(|slot| slot.to_stored(key)))
    }

    async fn insert(&self, region: &StorageRegion, ticket: StoredTicket) -> Result<()> {
        let version = self.bump();
        self.region(&region.name).insert(
            ticket.key,
            Slot {
                record: ticket.record,
                version,
            },
        );
        Ok(())
    }

    async fn replace(
        &self,
        region: &StorageRegion,
        ticket: StoredTicket,
        expected: Option<&str>,
    ) -> Result<bool> {
        let entries = self.region(&region.name);
        let Some(mut slot) = entries.get_mut(&ticket.key) else {
            return Ok(false);
        };
        if !slot.matches(expected) {
            return Err(Error::conflict(ticket.key, "replace"));
        }
        slot.record = ticket.record;
        slot.version = self.bump();
        Ok(true)
    }

    async fn remove(
        &self,
        region: &StorageRegion,
        key: &str,
        expected: Option<&str>,
    ) -> Result<bool> {
        let entries = self.region(&region.name);
        if entries
            .remove_if(key, |_, slot| slot.matches(expected))
            .is_some()
        {
            return Ok(true);
        }
        if entries.contains_key(key) {
            return Err(Error::conflict(key, "remove"));
        }
        Ok(false)
    }

    async fn scan(&self, region: &StorageRegion) -> Result<Vec<StoredTicket>> {
        Ok(self
            .region(&region.name)
            .iter()
            .map(|entry| entry.value().to_stored(entry.key()))
            .collect())
    }

    async fn count(&self, region: &StorageRegion) -> Result<usize> {
        Ok(self.region(&region.name).len())
    }

    async fn clear(&self, region: &StorageRegion) -> Result<usize> {
        let entries = self.region(&region.name);
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
