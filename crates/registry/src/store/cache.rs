//! In-process store with native expiry, one moka cache per region

use super::{BackendInfo, Consistency, StorageRegion, StoredTicket, TicketStore};
use async_trait::async_trait;
use dashmap::DashMap;
use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;
use ticketry_core::{Result, TicketRecord};

/// Upper bound on entries per region before moka starts evicting
pub const DEFAULT_MAX_CAPACITY: u64 = 1_000_000;

/// Last-writer-wins store whose entries expire after the region timeout.
///
/// The timeout is never shorter than the longest logical lifetime of the
/// kind, so the cache only reclaims entries that are already dead.
pub struct MokaTicketStore {
    caches: DashMap<String, Cache<String, TicketRecord>>,
    max_capacity: u64,
}

impl Default for MokaTicketStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CAPACITY)
    }
}

impl MokaTicketStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            caches: DashMap::new(),
            max_capacity,
        }
    }

    fn cache(&self, region: &StorageRegion) -> Cache<String, TicketRecord> {
        if let Some(cache) = self.caches.get(&region.name) {
            return cache.clone();
        }
        self.caches
            .entry(region.name.clone())
            .or_insert_with(|| {
                let mut builder = Cache::builder()
                    .name(&region.name)
                    .max_capacity(self.max_capacity);
                if let Some(timeout) = region.timeout {
                    builder = builder.time_to_live(timeout);
                }
                builder.build()
            })
            .clone()
    }
}

#[async_trait]
impl TicketStore for MokaTicketStore {
    fn backend(&self) -> BackendInfo {
        BackendInfo {
            name: "moka",
            consistency: Consistency::ReadYourWrites,
            native_expiry: true,
        }
    }

    async fn initialize(&self, regions: &[StorageRegion]) -> Result<()> {
        for region in regions {
            let cache = self.cache(region);
            tracing::debug!(
                region = %region.name,
                ttl_seconds = region.timeout.map(|timeout| timeout.as_secs()),
                entries = cache.entry_count(),
                "moka region ready"
            );
        }
        Ok(())
    }

    async fn fetch(&self, region: &StorageRegion, key: &str) -> Result<Option<StoredTicket>> {
        Ok(self
            .cache(region)
            .get(key)
            .map(|record| StoredTicket::new(key, record)))
    }

    async fn insert(&self, region: &StorageRegion, ticket: StoredTicket) -> Result<()> {
        self.cache(region).insert(ticket.key, ticket.record);
        Ok(())
    }

    async fn replace(
        &self,
        region: &StorageRegion,
        ticket: StoredTicket,
        _expected: Option<&str>,
    ) -> Result<bool> {
        let StoredTicket { key, record, .. } = ticket;
        let result = self
            .cache(region)
            .entry(key)
            .and_compute_with(|entry| match entry {
                Some(_) => Op::Put(record),
                None => Op::Nop,
            });
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn remove(
        &self,
        region: &StorageRegion,
        key: &str,
        _expected: Option<&str>,
    ) -> Result<bool> {
        // Goes through the same per-key lock as replace
        let result = self
            .cache(region)
            .entry_by_ref(key)
            .and_compute_with(|entry| match entry {
                Some(_) => Op::Remove,
                None => Op::Nop,
            });
        Ok(matches!(result, CompResult::Removed(_)))
    }

    async fn scan(&self, region: &StorageRegion) -> Result<Vec<StoredTicket>> {
        Ok(self
            .cache(region)
            .iter()
            .map(|(key, record)| StoredTicket::new(key.as_str(), record))
            .collect())
    }

    async fn count(&self, region: &StorageRegion) -> Result<usize> {
        // entry_count lags behind pending writes; iterating is exact
        Ok(self.cache(region).iter().count())
    }

    async fn clear(&self, region: &StorageRegion) -> Result<usize> {
        let cache = self.cache(region);
        let removed = cache.iter().count();
        cache.invalidate_all();
        cache.run_pending_tasks();
        Ok(removed)
    }
}
