//! The ticket registry contract and its single implementation

mod default;
mod stats;

pub use default::{DefaultTicketRegistry, RegistryOptions, TicketCipher, MAX_LINEAGE_DEPTH};
pub use stats::{RegistryStats, RegistryStatsSnapshot};

use crate::store::BackendInfo;
use async_trait::async_trait;
use ticketry_core::{Result, Ticket, TicketKind};

/// Durable, concurrent, possibly distributed home of all live tickets.
///
/// Lookups of missing tickets are `Ok(None)`/`Ok(false)`, never errors.
/// Returned tickets are private copies with their lineage attached; changing
/// one has no effect until it is passed to [`TicketRegistry::update_ticket`].
#[async_trait]
pub trait TicketRegistry: Send + Sync {
    /// Idempotent upsert. Resolved ancestors are written back as well.
    async fn add_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// Absent when the id is unknown, malformed or routes to no kind
    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>>;

    /// Absent as well when the stored ticket is of another kind
    async fn get_ticket_of(&self, ticket_id: &str, kind: TicketKind) -> Result<Option<Ticket>> {
        Ok(self
            .get_ticket(ticket_id)
            .await?
            .filter(|ticket| ticket.kind() == kind))
    }

    /// Write back a mutated ticket and its resolved ancestors.
    ///
    /// Returns `false` when the ticket was purged in the meantime; it is not
    /// recreated.
    async fn update_ticket(&self, ticket: &Ticket) -> Result<bool>;

    /// Remove a ticket, and in dependent mode everything issued from it.
    ///
    /// Returns whether the ticket itself was present.
    async fn delete_ticket(&self, ticket_id: &str) -> Result<bool>;

    /// Every stored ticket with lineage attached; meant for the cleaner and
    /// administrative tooling
    async fn get_tickets(&self) -> Result<Vec<Ticket>>;

    async fn count_tickets_for(&self, kind: TicketKind) -> Result<usize>;

    async fn size(&self) -> Result<usize>;

    /// Remove every ticket of every kind
    async fn delete_all(&self) -> Result<usize>;

    /// Unexpired ticket-granting tickets of `principal_id`
    async fn get_sessions_for(&self, principal_id: &str) -> Result<Vec<Ticket>>;

    async fn count_sessions_for(&self, principal_id: &str) -> Result<usize> {
        Ok(self.get_sessions_for(principal_id).await?.len())
    }

    fn backend(&self) -> BackendInfo;
}
