#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ticketry_core::{
    Authentication, CascadeMode, DefaultTicketFactory, Error, Principal, Result, Ticket,
    TicketCatalog,
};
use ticketry_registry::{BackendInfo, StorageRegion, StoredTicket, TicketStore};

pub fn catalog(mode: CascadeMode) -> Arc<TicketCatalog> {
    Arc::new(TicketCatalog::with_defaults(mode).unwrap())
}

pub fn factory(catalog: &Arc<TicketCatalog>) -> DefaultTicketFactory {
    DefaultTicketFactory::new(Arc::clone(catalog)).unwrap()
}

pub fn authentication(principal: &str) -> Authentication {
    Authentication::new(Principal::new(principal))
}

pub fn login(factory: &DefaultTicketFactory, principal: &str) -> Ticket {
    factory.ticket_granting().create(authentication(principal))
}

/// Store wrapper failing the next `n` conditional writes with a conflict
pub struct FlakyStore<S> {
    inner: S,
    conflicts_left: AtomicUsize,
    replace_attempts: Arc<AtomicUsize>,
}

impl<S: TicketStore> FlakyStore<S> {
    pub fn new(inner: S, conflicts: usize) -> Self {
        Self {
            inner,
            conflicts_left: AtomicUsize::new(conflicts),
            replace_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn arm(&self, conflicts: usize) {
        self.conflicts_left.store(conflicts, Ordering::SeqCst);
        self.replace_attempts.store(0, Ordering::SeqCst);
    }

    pub fn replace_attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.replace_attempts)
    }
}

#[async_trait]
impl<S: TicketStore> TicketStore for FlakyStore<S> {
    fn backend(&self) -> BackendInfo {
        self.inner.backend()
    }

    async fn initialize(&self, regions: &[StorageRegion]) -> Result<()> {
        self.inner.initialize(regions).await
    }

    async fn fetch(&self, region: &StorageRegion, key: &str) -> Result<Option<StoredTicket>> {
        self.inner.fetch(region, key).await
    }

    async fn insert(&self, region: &StorageRegion, ticket: StoredTicket) -> Result<()> {
        self.inner.insert(region, ticket).await
    }

    async fn replace(
        &self,
        region: &StorageRegion,
        ticket: StoredTicket,
        expected: Option<&str>,
    ) -> Result<bool> {
        self.replace_attempts.fetch_add(1, Ordering::SeqCst);
        let armed = self
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if armed {
            return Err(Error::conflict(ticket.key, "replace"));
        }
        self.inner.replace(region, ticket, expected).await
    }

    async fn remove(
        &self,
        region: &StorageRegion,
        key: &str,
        expected: Option<&str>,
    ) -> Result<bool> {
        self.inner.remove(region, key, expected).await
    }

    async fn scan(&self, region: &StorageRegion) -> Result<Vec<StoredTicket>> {
        self.inner.scan(region).await
    }

    async fn count(&self, region: &StorageRegion) -> Result<usize> {
        self.inner.count(region).await
    }

    async fn clear(&self, region: &StorageRegion) -> Result<usize> {
        self.inner.clear(region).await
    }
}

/// Store wrapper whose reads take `delay`
pub struct SlowStore<S> {
    inner: S,
    delay: Duration,
}

impl<S: TicketStore> SlowStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<S: TicketStore> TicketStore for SlowStore<S> {
    fn backend(&self) -> BackendInfo {
        self.inner.backend()
    }

    async fn initialize(&self, regions: &[StorageRegion]) -> Result<()> {
        self.inner.initialize(regions).await
    }

    async fn fetch(&self, region: &StorageRegion, key: &str) -> Result<Option<StoredTicket>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch(region, key).await
    }

    async fn insert(&self, region: &StorageRegion, ticket: StoredTicket) -> Result<()> {
        self.inner.insert(region, ticket).await
    }

    async fn replace(
        &self,
        region: &StorageRegion,
        ticket: StoredTicket,
        expected: Option<&str>,
    ) -> Result<bool> {
        self.inner.replace(region, ticket, expected).await
    }

    async fn remove(
        &self,
        region: &StorageRegion,
        key: &str,
        expected: Option<&str>,
    ) -> Result<bool> {
        self.inner.remove(region, key, expected).await
    }

    async fn scan(&self, region: &StorageRegion) -> Result<Vec<StoredTicket>> {
        self.inner.scan(region).await
    }

    async fn count(&self, region: &StorageRegion) -> Result<usize> {
        self.inner.count(region).await
    }

    async fn clear(&self, region: &StorageRegion) -> Result<usize> {
        self.inner.clear(region).await
    }
}
