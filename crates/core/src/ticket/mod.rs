//! The ticket entity
//!
//! Every kind of ticket is the same struct: a `kind` tag, shared usage
//! bookkeeping, an owned expiration policy and a handful of kind-specific
//! optional fields. Parents are referenced by id; a resolved copy of the
//! ancestor chain can be attached as a transient [`Lineage`] by whoever hands
//! the ticket out (factory or registry).

mod encoded;
mod kind;
mod lineage;

pub use encoded::{EncodedTicket, TicketRecord};
pub use kind::TicketKind;
pub use lineage::Lineage;

use crate::authentication::{Authentication, Service};
use crate::expiration::ExpirationPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Property bag carried by transient session tickets
pub type Properties = BTreeMap<String, serde_json::Value>;

/// A security ticket of any kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    id: String,
    kind: TicketKind,
    creation_time: DateTime<Utc>,
    last_time_used: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_time_used: Option<DateTime<Utc>>,
    #[serde(default)]
    count_of_uses: u64,
    expiration_policy: ExpirationPolicy,
    #[serde(default)]
    expired: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authentication: Option<Authentication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service: Option<Service>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: Properties,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    descendants: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    scopes: BTreeSet<String>,
    #[serde(default)]
    from_new_login: bool,
    #[serde(skip)]
    lineage: Option<Lineage>,
}

impl Ticket {
    /// Create a fresh, unused ticket created at `now`
    pub fn new(
        id: impl Into<String>,
        kind: TicketKind,
        expiration_policy: ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            creation_time: now,
            last_time_used: now,
            previous_time_used: None,
            count_of_uses: 0,
            expiration_policy,
            expired: false,
            parent: None,
            authentication: None,
            service: None,
            properties: Properties::new(),
            descendants: BTreeSet::new(),
            scopes: BTreeSet::new(),
            from_new_login: false,
            lineage: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent = Some(parent_id.into());
        self
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_from_new_login(mut self, from_new_login: bool) -> Self {
        self.from_new_login = from_new_login;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TicketKind {
        self.kind
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    pub fn last_time_used(&self) -> DateTime<Utc> {
        self.last_time_used
    }

    pub fn previous_time_used(&self) -> Option<DateTime<Utc>> {
        self.previous_time_used
    }

    pub fn count_of_uses(&self) -> u64 {
        self.count_of_uses
    }

    pub fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.expiration_policy
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    /// Principal id of the authentication, if this ticket carries one
    pub fn principal_id(&self) -> Option<&str> {
        self.authentication.as_ref().map(Authentication::principal_id)
    }

    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }

    pub fn descendants(&self) -> &BTreeSet<String> {
        &self.descendants
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn is_from_new_login(&self) -> bool {
        self.from_new_login
    }

    pub fn lineage(&self) -> Option<&Lineage> {
        self.lineage.as_ref()
    }

    /// Resolved parent, if a lineage with a live reference is attached
    pub fn parent(&self) -> Option<&Ticket> {
        self.lineage.as_ref().and_then(Lineage::parent)
    }

    pub fn attach_lineage(&mut self, lineage: Lineage) {
        self.lineage = Some(lineage);
    }

    pub fn detach_lineage(&mut self) -> Option<Lineage> {
        self.lineage.take()
    }

    /// Remember that `ticket_id` was issued from this ticket
    pub fn add_descendant(&mut self, ticket_id: impl Into<String>) {
        self.descendants.insert(ticket_id.into());
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Manual flag first, then the policy (which may consult the lineage)
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expired || self.expiration_policy.is_expired(self, now)
    }

    /// Only the manual kill flag, ignoring the policy
    pub fn is_marked_expired(&self) -> bool {
        self.expired
    }

    /// Kill the ticket. There is no way back.
    pub fn mark_expired(&mut self) {
        self.expired = true;
    }

    pub fn update(&mut self) {
        self.update_at(Utc::now());
    }

    /// Record a use at `now`, keeping the live part of the ancestor chain
    /// alive as well
    pub fn update_at(&mut self, now: DateTime<Utc>) {
        self.previous_time_used = Some(self.last_time_used);
        self.last_time_used = now;
        self.count_of_uses += 1;

        if let Some(parent) = self.lineage.as_mut().and_then(Lineage::parent_mut) {
            if !parent.is_expired_at(now) {
                parent.update_at(now);
            }
        }
    }

    /// Fold the stored copy of this ticket into `self` before writing back.
    ///
    /// Counters and timestamps only move forward, descendants only grow, and a
    /// stored manual expiry is never lost.
    pub fn reconcile_with(&mut self, stored: &Ticket) {
        self.expired |= stored.expired;
        self.count_of_uses = self.count_of_uses.max(stored.count_of_uses);
        if stored.last_time_used > self.last_time_used {
            self.previous_time_used = stored.previous_time_used;
            self.last_time_used = stored.last_time_used;
        }
        self.descendants
            .extend(stored.descendants.iter().cloned());
    }

    /// Resolved ancestors, nearest first
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            next: self.parent(),
        }
    }
}

/// Iterator over a ticket's resolved ancestor chain
pub struct Ancestors<'a> {
    next: Option<&'a Ticket>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Ticket;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}
