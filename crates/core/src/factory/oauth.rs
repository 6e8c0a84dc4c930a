use super::Blueprint;
use crate::authentication::Service;
use crate::errors::Result;
use crate::ticket::{Ticket, TicketKind};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Issues OAuth authorization codes from a ticket-granting ticket
#[derive(Clone)]
pub struct OAuthCodeFactory {
    pub(super) blueprint: Blueprint,
}

impl OAuthCodeFactory {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }

    pub fn create(
        &self,
        ticket_granting_ticket: &mut Ticket,
        service: Service,
        scopes: BTreeSet<String>,
    ) -> Result<Ticket> {
        self.create_at(ticket_granting_ticket, service, scopes, Utc::now())
    }

    pub fn create_at(
        &self,
        ticket_granting_ticket: &mut Ticket,
        service: Service,
        scopes: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let authentication = ticket_granting_ticket.authentication().cloned();
        let ticket = self
            .blueprint
            .issue_from(ticket_granting_ticket, &[TicketKind::TicketGranting], now)?
            .with_service(service)
            .with_scopes(scopes);
        Ok(with_optional_authentication(ticket, authentication))
    }
}

/// Issues OAuth access tokens from a ticket-granting ticket
#[derive(Clone)]
pub struct OAuthAccessTokenFactory {
    pub(super) blueprint: Blueprint,
}

impl OAuthAccessTokenFactory {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }

    pub fn create(
        &self,
        ticket_granting_ticket: &mut Ticket,
        service: Service,
        scopes: BTreeSet<String>,
    ) -> Result<Ticket> {
        self.create_at(ticket_granting_ticket, service, scopes, Utc::now())
    }

    pub fn create_at(
        &self,
        ticket_granting_ticket: &mut Ticket,
        service: Service,
        scopes: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let authentication = ticket_granting_ticket.authentication().cloned();
        let ticket = self
            .blueprint
            .issue_from(ticket_granting_ticket, &[TicketKind::TicketGranting], now)?
            .with_service(service)
            .with_scopes(scopes);
        Ok(with_optional_authentication(ticket, authentication))
    }
}

/// Issues refresh tokens bound to an access token
#[derive(Clone)]
pub struct OAuthRefreshTokenFactory {
    pub(super) blueprint: Blueprint,
}

impl OAuthRefreshTokenFactory {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }

    pub fn create(&self, access_token: &mut Ticket, scopes: BTreeSet<String>) -> Result<Ticket> {
        self.create_at(access_token, scopes, Utc::now())
    }

    /// Scopes default to those of the access token when none are requested
    pub fn create_at(
        &self,
        access_token: &mut Ticket,
        scopes: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let scopes = if scopes.is_empty() {
            access_token.scopes().clone()
        } else {
            scopes
        };
        let service = access_token.service().cloned();
        let authentication = access_token.authentication().cloned();

        let mut ticket = self
            .blueprint
            .issue_from(access_token, &[TicketKind::OAuthAccessToken], now)?
            .with_scopes(scopes);
        if let Some(service) = service {
            ticket = ticket.with_service(service);
        }
        Ok(with_optional_authentication(ticket, authentication))
    }
}

fn with_optional_authentication(
    ticket: Ticket,
    authentication: Option<crate::authentication::Authentication>,
) -> Ticket {
    match authentication {
        Some(authentication) => ticket.with_authentication(authentication),
        None => ticket,
    }
}
