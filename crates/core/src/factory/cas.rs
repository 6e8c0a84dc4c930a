use super::Blueprint;
use crate::authentication::{Authentication, Service};
use crate::errors::Result;
use crate::ticket::{Ticket, TicketKind};
use chrono::{DateTime, Utc};

/// Issues the root ticket of an SSO session
#[derive(Clone)]
pub struct TicketGrantingTicketFactory {
    pub(super) blueprint: Blueprint,
}

impl TicketGrantingTicketFactory {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }

    pub fn create(&self, authentication: Authentication) -> Ticket {
        self.create_at(authentication, Utc::now())
    }

    pub fn create_at(&self, authentication: Authentication, now: DateTime<Utc>) -> Ticket {
        let ticket = self.blueprint.fresh(now).with_authentication(authentication);
        tracing::debug!(
            ticket_id = %ticket.id(),
            principal = ticket.principal_id().unwrap_or_default(),
            "created ticket-granting ticket"
        );
        ticket
    }
}

/// Issues one-shot service tickets from a ticket-granting ticket
#[derive(Clone)]
pub struct ServiceTicketFactory {
    pub(super) blueprint: Blueprint,
}

impl ServiceTicketFactory {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }

    pub fn create(
        &self,
        ticket_granting_ticket: &mut Ticket,
        service: Service,
        credential_provided: bool,
    ) -> Result<Ticket> {
        self.create_at(ticket_granting_ticket, service, credential_provided, Utc::now())
    }

    /// `credential_provided` marks a login that just happened; the very first
    /// ticket issued from a fresh session counts as one too
    pub fn create_at(
        &self,
        ticket_granting_ticket: &mut Ticket,
        service: Service,
        credential_provided: bool,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let from_new_login = credential_provided || ticket_granting_ticket.count_of_uses() == 0;
        let ticket = self
            .blueprint
            .issue_from(ticket_granting_ticket, &[TicketKind::TicketGranting], now)?
            .with_service(service)
            .with_from_new_login(from_new_login);
        Ok(ticket)
    }
}

/// Issues proxy-granting tickets to a proxying service.
///
/// The parent is the session's ticket-granting ticket, or another
/// proxy-granting ticket when proxies are chained.
#[derive(Clone)]
pub struct ProxyGrantingTicketFactory {
    pub(super) blueprint: Blueprint,
}

impl ProxyGrantingTicketFactory {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }

    pub fn create(&self, parent: &mut Ticket, authentication: Authentication) -> Result<Ticket> {
        self.create_at(parent, authentication, Utc::now())
    }

    pub fn create_at(
        &self,
        parent: &mut Ticket,
        authentication: Authentication,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let ticket = self
            .blueprint
            .issue_from(
                parent,
                &[TicketKind::TicketGranting, TicketKind::ProxyGranting],
                now,
            )?
            .with_authentication(authentication);
        Ok(ticket)
    }
}

/// Issues proxy tickets from a proxy-granting ticket
#[derive(Clone)]
pub struct ProxyTicketFactory {
    pub(super) blueprint: Blueprint,
}

impl ProxyTicketFactory {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }

    pub fn create(&self, proxy_granting_ticket: &mut Ticket, service: Service) -> Result<Ticket> {
        self.create_at(proxy_granting_ticket, service, Utc::now())
    }

    pub fn create_at(
        &self,
        proxy_granting_ticket: &mut Ticket,
        service: Service,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let ticket = self
            .blueprint
            .issue_from(proxy_granting_ticket, &[TicketKind::ProxyGranting], now)?
            .with_service(service);
        Ok(ticket)
    }
}
