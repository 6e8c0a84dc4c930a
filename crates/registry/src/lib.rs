//! Ticket registry for ticketry
//!
//! - **`registry`**: the async [`TicketRegistry`] contract and
//!   [`DefaultTicketRegistry`], which implements it once over any store:
//!   prefix routing, cipher protection, lineage hydration, conflict retries,
//!   monotonic merge on update and cascading deletes.
//! - **`store`**: backend adapters (in-memory, moka, CouchDB-style documents,
//!   SQLite).
//! - **`cleaner`**: the scheduled [`RegistryCleaner`].
//! - **`builder`**: assembles a [`TicketingRuntime`] from configuration.

pub mod builder;
pub mod cleaner;
pub mod registry;
pub mod store;

pub use builder::{build_registry, TicketingRuntime};
pub use cleaner::{CleanerHandle, CleanerOptions, RegistryCleaner};
pub use registry::{
    DefaultTicketRegistry, RegistryOptions, RegistryStats, RegistryStatsSnapshot, TicketRegistry,
};
pub use store::{
    BackendInfo, Consistency, DocumentStoreOptions, DocumentTicketStore, MemoryTicketStore,
    MokaTicketStore, SqlTicketStore, StorageRegion, StoredTicket, TicketStore,
};
