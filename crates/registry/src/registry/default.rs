//! Backend-independent registry logic over a [`TicketStore`]

use super::{RegistryStats, RegistryStatsSnapshot, TicketRegistry};
use crate::store::{BackendInfo, StorageRegion, StoredTicket, TicketStore};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use ticketry_core::{
    CascadeMode, EncodedTicket, Error, Lineage, Result, Ticket, TicketCatalog, TicketKind,
    TicketRecord,
};
use ticketry_security::{digest_ticket_id, CipherExecutor, NoOpCipherExecutor};
use ticketry_utils::tracing::registry_span;
use ticketry_utils::{retry, RetryConfig};
use tracing::Instrument;

/// Ancestors resolved per ticket before the chain is treated as rooted
pub const MAX_LINEAGE_DEPTH: usize = 8;

/// Byte cipher protecting stored tickets
pub type TicketCipher = Arc<dyn CipherExecutor<Vec<u8>, Vec<u8>>>;

/// Behaviour knobs shared by every backend
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Applied to conflicting writes only
    pub retry: RetryConfig,
    /// Upper bound for a whole registry operation
    pub operation_timeout: Option<Duration>,
    /// Store under the SHA-512 digest of the id (needs an enabled cipher)
    pub encode_ids: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            retry: RetryConfig::for_conflicts(3),
            operation_timeout: None,
            encode_ids: false,
        }
    }
}

/// The registry, implemented once for every backend
pub struct DefaultTicketRegistry<S> {
    store: S,
    catalog: Arc<TicketCatalog>,
    regions: BTreeMap<TicketKind, StorageRegion>,
    cipher: TicketCipher,
    options: RegistryOptions,
    stats: RegistryStats,
}

impl<S: TicketStore> DefaultTicketRegistry<S> {
    /// Plain-text registry with default options
    pub fn new(store: S, catalog: Arc<TicketCatalog>) -> Self {
        let regions = catalog
            .definitions()
            .map(|definition| (definition.kind(), StorageRegion::from(definition)))
            .collect();
        Self {
            store,
            catalog,
            regions,
            cipher: Arc::new(NoOpCipherExecutor::new()),
            options: RegistryOptions::default(),
            stats: RegistryStats::default(),
        }
    }

    pub fn with_cipher(mut self, cipher: TicketCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_options(mut self, options: RegistryOptions) -> Self {
        self.options = options;
        self
    }

    /// Prepare the backend for every region in the catalog
    pub async fn initialize(&self) -> Result<()> {
        if self.options.encode_ids && !self.cipher.is_enabled() {
            tracing::warn!("id encoding requested without a cipher, storing plain ids");
        }
        let regions: Vec<StorageRegion> = self.regions.values().cloned().collect();
        self.store.initialize(&regions).await?;
        tracing::info!(
            backend = self.store.backend().name,
            regions = regions.len(),
            cipher = self.cipher.name(),
            "ticket registry initialized"
        );
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<TicketCatalog> {
        &self.catalog
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn stats(&self) -> RegistryStatsSnapshot {
        self.stats.snapshot()
    }

    fn cascade_mode(&self) -> CascadeMode {
        self.catalog.cascade_mode()
    }

    fn region_for(&self, kind: TicketKind) -> Result<&StorageRegion> {
        self.regions.get(&kind).ok_or_else(|| {
            Error::configuration(format!("no ticket definition registered for kind '{kind}'"))
        })
    }

    /// Route an arbitrary id by its prefix
    fn route(&self, ticket_id: &str) -> Option<&StorageRegion> {
        self.catalog
            .find_by_ticket_id(ticket_id)
            .and_then(|definition| self.regions.get(&definition.kind()))
    }

    fn storage_key(&self, ticket_id: &str) -> String {
        if self.options.encode_ids && self.cipher.is_enabled() {
            digest_ticket_id(ticket_id)
        } else {
            ticket_id.to_string()
        }
    }

    fn encode(&self, ticket: &Ticket, key: &str) -> Result<TicketRecord> {
        if !self.cipher.is_enabled() {
            let mut plain = ticket.clone();
            plain.detach_lineage();
            return Ok(TicketRecord::from(plain));
        }
        let json = serde_json::to_vec(ticket).map_err(|e| Error::serialization(ticket.id(), e))?;
        let payload = self.cipher.encode(&json)?;
        let prefix = self.catalog.require(ticket.kind())?.prefix();
        Ok(TicketRecord::Encoded(EncodedTicket::new(key, prefix, payload)))
    }

    fn decode(&self, record: TicketRecord, ticket_id: Option<&str>) -> Result<Ticket> {
        let encoded = match record {
            TicketRecord::Plain(ticket) => return Ok(*ticket),
            TicketRecord::Encoded(encoded) => encoded,
        };
        let key = encoded.id().to_string();
        if !self.cipher.is_enabled() {
            return Err(Error::decode(format!(
                "ticket '{key}' is encoded but no cipher is configured"
            )));
        }
        let json = self.cipher.decode(&encoded.into_encoded_ticket())?;
        let ticket: Ticket =
            serde_json::from_slice(&json).map_err(|e| Error::serialization(key, e))?;
        match ticket_id {
            Some(expected) if expected != ticket.id() => Err(Error::decode(format!(
                "payload stored for '{expected}' belongs to another ticket"
            ))),
            _ => Ok(ticket),
        }
    }

    fn decode_or_skip(&self, stored: StoredTicket) -> Option<Ticket> {
        match self.decode(stored.record, None) {
            Ok(ticket) => Some(ticket),
            Err(error) => {
                self.stats.record_decode_failure();
                tracing::warn!(key = %stored.key, error = %error, "skipping undecodable ticket");
                None
            }
        }
    }

    /// Exhausted conflict retries become a registry failure
    fn exhausted(&self, error: Error, ticket_id: &str, operation: &'static str) -> Error {
        if error.is_conflict() {
            Error::RetriesExhausted {
                key: ticket_id.to_string(),
                operation,
                attempts: self.options.retry.max_attempts(),
            }
        } else {
            error
        }
    }

    async fn timed<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.options.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| Error::timeout(operation, limit))?,
            None => future.await,
        }
    }

    /// Fetch and decode without touching lineage
    async fn load(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let Some(region) = self.route(ticket_id) else {
            tracing::debug!(ticket_id = %ticket_id, "id matches no registered prefix");
            return Ok(None);
        };
        let key = self.storage_key(ticket_id);
        let Some(stored) = self.store.fetch(region, &key).await? else {
            return Ok(None);
        };
        match self.decode(stored.record, Some(ticket_id)) {
            Ok(ticket) => Ok(Some(ticket)),
            Err(error) => {
                self.stats.record_decode_failure();
                Err(error)
            }
        }
    }

    /// Resolve the ancestor chain from storage and attach it
    async fn hydrate(&self, ticket: &mut Ticket) -> Result<()> {
        let mut chain = Vec::new();
        let mut next = ticket.parent_id().map(str::to_string);
        while let Some(parent_id) = next.take() {
            if chain.len() == MAX_LINEAGE_DEPTH {
                tracing::warn!(
                    ticket_id = %ticket.id(),
                    "lineage deeper than supported, truncating"
                );
                break;
            }
            let parent = self.load(&parent_id).await?;
            next = parent
                .as_ref()
                .and_then(|parent| parent.parent_id().map(str::to_string));
            chain.push(parent);
        }
        if let Some(lineage) = assemble_lineage(chain, self.cascade_mode()) {
            ticket.attach_lineage(lineage);
        }
        Ok(())
    }

    /// Merge `ticket` into the stored copy; never recreates a purged ticket
    async fn write_back(&self, ticket: &Ticket) -> Result<bool> {
        let region = self.region_for(ticket.kind())?;
        let key = self.storage_key(ticket.id());
        retry(&self.options.retry, || self.write_back_once(region, &key, ticket))
            .await
            .map_err(|error| self.exhausted(error, ticket.id(), "update"))
    }

    async fn write_back_once(
        &self,
        region: &StorageRegion,
        key: &str,
        ticket: &Ticket,
    ) -> Result<bool> {
        let Some(current) = self.store.fetch(region, key).await? else {
            return Ok(false);
        };
        let stored = self.decode(current.record, Some(ticket.id()))?;
        let mut merged = ticket.clone();
        merged.detach_lineage();
        merged.reconcile_with(&stored);

        let record = self.encode(&merged, key)?;
        self.store
            .replace(region, StoredTicket::new(key, record), current.revision.as_deref())
            .await
    }

    async fn write_back_ancestors(&self, ticket: &Ticket) -> Result<()> {
        for ancestor in ticket.ancestors() {
            if !self.write_back(ancestor).await? {
                tracing::debug!(ticket_id = %ancestor.id(), "ancestor already purged");
            }
        }
        Ok(())
    }

    async fn add(&self, ticket: &Ticket) -> Result<()> {
        let region = self.region_for(ticket.kind())?;
        let key = self.storage_key(ticket.id());
        let record = self.encode(ticket, &key)?;
        retry(&self.options.retry, || {
            self.store
                .insert(region, StoredTicket::new(key.clone(), record.clone()))
        })
        .await
        .map_err(|error| self.exhausted(error, ticket.id(), "add"))?;
        self.stats.record_add();

        self.write_back_ancestors(ticket).await
    }

    async fn get(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let Some(mut ticket) = self.load(ticket_id).await? else {
            self.stats.record_miss();
            return Ok(None);
        };
        self.hydrate(&mut ticket).await?;
        self.stats.record_hit();
        Ok(Some(ticket))
    }

    async fn update(&self, ticket: &Ticket) -> Result<bool> {
        let written = self.write_back(ticket).await?;
        self.stats.record_update(written);
        if !written {
            tracing::debug!(ticket_id = %ticket.id(), "update skipped, ticket no longer stored");
            return Ok(false);
        }
        self.write_back_ancestors(ticket).await?;
        Ok(true)
    }

    /// Remove `ticket_id` after its descendants when cascading
    fn delete_cascading<'a>(
        &'a self,
        ticket_id: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, Result<bool>> {
        async move {
            let Some(region) = self.route(ticket_id) else {
                return Ok(false);
            };

            if self.cascade_mode().is_dependent() && depth < MAX_LINEAGE_DEPTH {
                match self.load(ticket_id).await {
                    Ok(Some(ticket)) => {
                        for descendant in ticket.descendants() {
                            self.delete_cascading(descendant, depth + 1).await?;
                        }
                    }
                    Ok(None) => return Ok(false),
                    Err(error) => {
                        tracing::warn!(
                            ticket_id = %ticket_id,
                            error = %error,
                            "cannot read descendants, deleting ticket alone"
                        );
                    }
                }
            }

            let key = self.storage_key(ticket_id);
            let removed = retry(&self.options.retry, || self.store.remove(region, &key, None))
                .await
                .map_err(|error| self.exhausted(error, ticket_id, "delete"))?;
            if removed {
                self.stats.record_deletion();
                tracing::debug!(ticket_id = %ticket_id, depth, "ticket deleted");
            }
            Ok(removed)
        }
        .boxed()
    }

    async fn all(&self) -> Result<Vec<Ticket>> {
        let mut tickets = Vec::new();
        for region in self.regions.values() {
            tickets.extend(
                self.store
                    .scan(region)
                    .await?
                    .into_iter()
                    .filter_map(|stored| self.decode_or_skip(stored)),
            );
        }

        let index: HashMap<String, Ticket> = tickets
            .iter()
            .map(|ticket| (ticket.id().to_string(), ticket.clone()))
            .collect();
        let mode = self.cascade_mode();
        for ticket in &mut tickets {
            let mut chain = Vec::new();
            let mut next = ticket.parent_id();
            while let Some(parent_id) = next {
                if chain.len() == MAX_LINEAGE_DEPTH {
                    break;
                }
                let parent = index.get(parent_id);
                next = parent.and_then(Ticket::parent_id);
                chain.push(parent.cloned());
            }
            if let Some(lineage) = assemble_lineage(chain, mode) {
                ticket.attach_lineage(lineage);
            }
        }
        Ok(tickets)
    }

    async fn sessions(&self, principal_id: &str) -> Result<Vec<Ticket>> {
        let Some(region) = self.regions.get(&TicketKind::TicketGranting) else {
            return Ok(Vec::new());
        };
        let now = Utc::now();
        Ok(self
            .store
            .scan(region)
            .await?
            .into_iter()
            .filter_map(|stored| self.decode_or_skip(stored))
            .filter(|ticket| ticket.principal_id() == Some(principal_id))
            .filter(|ticket| !ticket.is_expired_at(now))
            .collect())
    }

    async fn sum_over_regions<'a, F, Fut>(&'a self, per_region: F) -> Result<usize>
    where
        F: Fn(&'a StorageRegion) -> Fut,
        Fut: Future<Output = Result<usize>>,
    {
        let mut total = 0;
        for region in self.regions.values() {
            total += per_region(region).await?;
        }
        Ok(total)
    }
}

/// Fold a nearest-first chain of loaded ancestors into a lineage.
///
/// A `None` link is a purged ancestor and becomes an orphaned lineage.
fn assemble_lineage(chain: Vec<Option<Ticket>>, mode: CascadeMode) -> Option<Lineage> {
    chain.into_iter().rev().fold(None, |farther, ancestor| {
        Some(match ancestor {
            Some(mut ancestor) => {
                if let Some(lineage) = farther {
                    ancestor.attach_lineage(lineage);
                }
                Lineage::new(ancestor, mode)
            }
            None => Lineage::orphaned(mode),
        })
    })
}

#[async_trait]
impl<S: TicketStore> TicketRegistry for DefaultTicketRegistry<S> {
    async fn add_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.timed("add_ticket", self.add(ticket))
            .instrument(registry_span("add_ticket", ticket.id()))
            .await
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        self.timed("get_ticket", self.get(ticket_id))
            .instrument(registry_span("get_ticket", ticket_id))
            .await
    }

    async fn get_ticket_of(&self, ticket_id: &str, kind: TicketKind) -> Result<Option<Ticket>> {
        if self.route(ticket_id).map(|region| region.kind) != Some(kind) {
            return Ok(None);
        }
        Ok(self
            .get_ticket(ticket_id)
            .await?
            .filter(|ticket| ticket.kind() == kind))
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<bool> {
        self.timed("update_ticket", self.update(ticket))
            .instrument(registry_span("update_ticket", ticket.id()))
            .await
    }

    async fn delete_ticket(&self, ticket_id: &str) -> Result<bool> {
        self.timed("delete_ticket", self.delete_cascading(ticket_id, 0))
            .instrument(registry_span("delete_ticket", ticket_id))
            .await
    }

    async fn get_tickets(&self) -> Result<Vec<Ticket>> {
        self.timed("get_tickets", self.all()).await
    }

    async fn count_tickets_for(&self, kind: TicketKind) -> Result<usize> {
        match self.regions.get(&kind) {
            Some(region) => self.timed("count_tickets", self.store.count(region)).await,
            None => Ok(0),
        }
    }

    async fn size(&self) -> Result<usize> {
        self.timed(
            "size",
            self.sum_over_regions(|region| self.store.count(region)),
        )
        .await
    }

    async fn delete_all(&self) -> Result<usize> {
        let removed = self
            .timed(
                "delete_all",
                self.sum_over_regions(|region| self.store.clear(region)),
            )
            .await?;
        tracing::info!(removed, "deleted every ticket");
        Ok(removed)
    }

    async fn get_sessions_for(&self, principal_id: &str) -> Result<Vec<Ticket>> {
        self.timed("get_sessions", self.sessions(principal_id)).await
    }

    fn backend(&self) -> BackendInfo {
        self.store.backend()
    }
}
