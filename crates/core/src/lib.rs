//! Core domain types for the `ticketry` ticket lifecycle subsystem.
//!
//! This crate owns everything that does not touch storage or cryptography:
//!
//! - **`errors`**: the shared `Error` enum, `ErrorKind` classification and
//!   `Result` alias used by every other crate in the workspace.
//! - **`ticket`**: the single `Ticket` entity (kind tag plus kind-specific
//!   fields), the transient `Lineage` used to consult ancestors, and the
//!   `EncodedTicket`/`TicketRecord` storage envelope.
//! - **`expiration`**: tagged-variant expiration policies and the
//!   deployment-wide `CascadeMode`.
//! - **`id`**: prefixed, unguessable ticket id generation.
//! - **`catalog`**: the startup-built `TicketCatalog` of `TicketDefinition`s.
//! - **`factory`**: per-kind factories and the `DefaultTicketFactory`
//!   dispatcher.

pub mod authentication;
pub mod catalog;
pub mod errors;
pub mod expiration;
pub mod factory;
pub mod id;
pub mod ticket;

pub use self::{
    authentication::{Authentication, Principal, Service},
    catalog::{TicketCatalog, TicketCatalogBuilder, TicketDefinition},
    errors::{Error, ErrorKind, RecoveryHint, Result},
    expiration::{CascadeMode, ExpirationPolicy},
    factory::{DefaultTicketFactory, TicketRequest},
    id::{DefaultUniqueTicketIdGenerator, UniqueTicketIdGenerator},
    ticket::{EncodedTicket, Lineage, Ticket, TicketKind, TicketRecord},
};
