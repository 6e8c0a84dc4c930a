//! Ticket factories
//!
//! One small factory per ticket kind, each bound to its catalog definition
//! and an id generator, plus [`DefaultTicketFactory`] which owns all of them
//! and dispatches a [`TicketRequest`] by kind.
//!
//! Factories never touch storage. Issuing a child ticket mutates the parent
//! passed in (new descendant, one more use); persisting both is the caller's
//! job.

mod cas;
mod oauth;
mod transient;

pub use cas::{
    ProxyGrantingTicketFactory, ProxyTicketFactory, ServiceTicketFactory,
    TicketGrantingTicketFactory,
};
pub use oauth::{OAuthAccessTokenFactory, OAuthCodeFactory, OAuthRefreshTokenFactory};
pub use transient::TransientSessionTicketFactory;

use crate::authentication::{Authentication, Service};
use crate::catalog::{TicketCatalog, TicketDefinition};
use crate::errors::{Error, Result};
use crate::expiration::CascadeMode;
use crate::id::{DefaultUniqueTicketIdGenerator, UniqueTicketIdGenerator};
use crate::ticket::{Lineage, Properties, Ticket, TicketKind};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Common surface of the per-kind factories
pub trait TicketFactory: Send + Sync {
    fn kind(&self) -> TicketKind;

    fn definition(&self) -> &TicketDefinition;
}

/// What every per-kind factory is built from
#[derive(Clone)]
pub(crate) struct Blueprint {
    definition: TicketDefinition,
    id_generator: Arc<dyn UniqueTicketIdGenerator>,
    cascade_mode: CascadeMode,
}

impl Blueprint {
    pub(crate) fn new(
        catalog: &TicketCatalog,
        kind: TicketKind,
        id_generator: Arc<dyn UniqueTicketIdGenerator>,
    ) -> Result<Self> {
        Ok(Self {
            definition: catalog.require(kind)?.clone(),
            id_generator,
            cascade_mode: catalog.cascade_mode(),
        })
    }

    pub(crate) fn definition(&self) -> &TicketDefinition {
        &self.definition
    }

    /// New root ticket with a fresh id and policy
    pub(crate) fn fresh(&self, now: DateTime<Utc>) -> Ticket {
        let id = self.id_generator.new_ticket_id(self.definition.prefix());
        Ticket::new(
            id,
            self.definition.kind(),
            self.definition.new_expiration_policy(),
            now,
        )
    }

    /// New ticket issued from `parent`.
    ///
    /// The parent must be live and of one of the `accepted` kinds. It records
    /// the child as a descendant and counts the grant as a use.
    pub(crate) fn issue_from(
        &self,
        parent: &mut Ticket,
        accepted: &[TicketKind],
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        if !accepted.contains(&parent.kind()) {
            return Err(Error::invalid_ticket(
                parent.id(),
                format!(
                    "a {} ticket cannot be issued from a {} ticket",
                    self.definition.kind(),
                    parent.kind()
                ),
            ));
        }
        if parent.is_expired_at(now) {
            return Err(Error::invalid_ticket(parent.id(), "ticket is expired"));
        }

        let mut child = self.fresh(now).with_parent(parent.id().to_string());
        parent.add_descendant(child.id().to_string());
        parent.update_at(now);
        child.attach_lineage(Lineage::new(parent.clone(), self.cascade_mode));

        tracing::debug!(
            ticket_id = %child.id(),
            kind = %child.kind(),
            parent_id = %parent.id(),
            "issued descendant ticket"
        );
        Ok(child)
    }
}

/// Closed set of creation requests understood by [`DefaultTicketFactory`]
#[derive(Debug)]
pub enum TicketRequest<'a> {
    TicketGranting {
        authentication: Authentication,
    },
    Service {
        ticket_granting_ticket: &'a mut Ticket,
        service: Service,
        credential_provided: bool,
    },
    ProxyGranting {
        parent: &'a mut Ticket,
        authentication: Authentication,
    },
    Proxy {
        proxy_granting_ticket: &'a mut Ticket,
        service: Service,
    },
    TransientSession {
        service: Option<Service>,
        properties: Properties,
    },
    OAuthCode {
        ticket_granting_ticket: &'a mut Ticket,
        service: Service,
        scopes: BTreeSet<String>,
    },
    OAuthAccessToken {
        ticket_granting_ticket: &'a mut Ticket,
        service: Service,
        scopes: BTreeSet<String>,
    },
    OAuthRefreshToken {
        access_token: &'a mut Ticket,
        scopes: BTreeSet<String>,
    },
}

impl TicketRequest<'_> {
    /// Kind of ticket this request produces
    pub fn kind(&self) -> TicketKind {
        match self {
            Self::TicketGranting { .. } => TicketKind::TicketGranting,
            Self::Service { .. } => TicketKind::Service,
            Self::ProxyGranting { .. } => TicketKind::ProxyGranting,
            Self::Proxy { .. } => TicketKind::Proxy,
            Self::TransientSession { .. } => TicketKind::TransientSession,
            Self::OAuthCode { .. } => TicketKind::OAuthCode,
            Self::OAuthAccessToken { .. } => TicketKind::OAuthAccessToken,
            Self::OAuthRefreshToken { .. } => TicketKind::OAuthRefreshToken,
        }
    }
}

/// Borrowed handle to one per-kind factory
#[derive(Clone, Copy)]
pub enum FactoryHandle<'a> {
    TicketGranting(&'a TicketGrantingTicketFactory),
    Service(&'a ServiceTicketFactory),
    ProxyGranting(&'a ProxyGrantingTicketFactory),
    Proxy(&'a ProxyTicketFactory),
    TransientSession(&'a TransientSessionTicketFactory),
    OAuthCode(&'a OAuthCodeFactory),
    OAuthAccessToken(&'a OAuthAccessTokenFactory),
    OAuthRefreshToken(&'a OAuthRefreshTokenFactory),
}

impl<'a> FactoryHandle<'a> {
    pub fn as_factory(self) -> &'a dyn TicketFactory {
        match self {
            Self::TicketGranting(f) => f,
            Self::Service(f) => f,
            Self::ProxyGranting(f) => f,
            Self::Proxy(f) => f,
            Self::TransientSession(f) => f,
            Self::OAuthCode(f) => f,
            Self::OAuthAccessToken(f) => f,
            Self::OAuthRefreshToken(f) => f,
        }
    }
}

/// Owns one factory per kind and dispatches creation requests
pub struct DefaultTicketFactory {
    catalog: Arc<TicketCatalog>,
    ticket_granting: TicketGrantingTicketFactory,
    service: ServiceTicketFactory,
    proxy_granting: ProxyGrantingTicketFactory,
    proxy: ProxyTicketFactory,
    transient_session: TransientSessionTicketFactory,
    oauth_code: OAuthCodeFactory,
    oauth_access_token: OAuthAccessTokenFactory,
    oauth_refresh_token: OAuthRefreshTokenFactory,
}

impl DefaultTicketFactory {
    /// Factories for every kind, each with a generator sized by its definition
    pub fn new(catalog: Arc<TicketCatalog>) -> Result<Self> {
        Self::with_id_suffix(catalog, None)
    }

    /// Like [`new`](Self::new), appending a node suffix to every id
    pub fn with_id_suffix(catalog: Arc<TicketCatalog>, suffix: Option<&str>) -> Result<Self> {
        let generator = |kind: TicketKind| -> Result<Arc<dyn UniqueTicketIdGenerator>> {
            let length = catalog.require(kind)?.id_length();
            let generator = DefaultUniqueTicketIdGenerator::new(length)?;
            let generator = match suffix {
                Some(suffix) => generator.with_suffix(suffix)?,
                None => generator,
            };
            Ok(Arc::new(generator))
        };
        let blueprint = |kind: TicketKind| Blueprint::new(&catalog, kind, generator(kind)?);

        Ok(Self {
            ticket_granting: TicketGrantingTicketFactory::new(blueprint(
                TicketKind::TicketGranting,
            )?),
            service: ServiceTicketFactory::new(blueprint(TicketKind::Service)?),
            proxy_granting: ProxyGrantingTicketFactory::new(blueprint(TicketKind::ProxyGranting)?),
            proxy: ProxyTicketFactory::new(blueprint(TicketKind::Proxy)?),
            transient_session: TransientSessionTicketFactory::new(blueprint(
                TicketKind::TransientSession,
            )?),
            oauth_code: OAuthCodeFactory::new(blueprint(TicketKind::OAuthCode)?),
            oauth_access_token: OAuthAccessTokenFactory::new(blueprint(
                TicketKind::OAuthAccessToken,
            )?),
            oauth_refresh_token: OAuthRefreshTokenFactory::new(blueprint(
                TicketKind::OAuthRefreshToken,
            )?),
            catalog,
        })
    }

    pub fn catalog(&self) -> &Arc<TicketCatalog> {
        &self.catalog
    }

    /// Per-kind factory handle
    pub fn get(&self, kind: TicketKind) -> FactoryHandle<'_> {
        match kind {
            TicketKind::TicketGranting => FactoryHandle::TicketGranting(&self.ticket_granting),
            TicketKind::Service => FactoryHandle::Service(&self.service),
            TicketKind::ProxyGranting => FactoryHandle::ProxyGranting(&self.proxy_granting),
            TicketKind::Proxy => FactoryHandle::Proxy(&self.proxy),
            TicketKind::TransientSession => {
                FactoryHandle::TransientSession(&self.transient_session)
            }
            TicketKind::OAuthCode => FactoryHandle::OAuthCode(&self.oauth_code),
            TicketKind::OAuthAccessToken => {
                FactoryHandle::OAuthAccessToken(&self.oauth_access_token)
            }
            TicketKind::OAuthRefreshToken => {
                FactoryHandle::OAuthRefreshToken(&self.oauth_refresh_token)
            }
        }
    }

    pub fn ticket_granting(&self) -> &TicketGrantingTicketFactory {
        &self.ticket_granting
    }

    pub fn service(&self) -> &ServiceTicketFactory {
        &self.service
    }

    pub fn proxy_granting(&self) -> &ProxyGrantingTicketFactory {
        &self.proxy_granting
    }

    pub fn proxy(&self) -> &ProxyTicketFactory {
        &self.proxy
    }

    pub fn transient_session(&self) -> &TransientSessionTicketFactory {
        &self.transient_session
    }

    pub fn oauth_code(&self) -> &OAuthCodeFactory {
        &self.oauth_code
    }

    pub fn oauth_access_token(&self) -> &OAuthAccessTokenFactory {
        &self.oauth_access_token
    }

    pub fn oauth_refresh_token(&self) -> &OAuthRefreshTokenFactory {
        &self.oauth_refresh_token
    }

    pub fn create(&self, request: TicketRequest<'_>) -> Result<Ticket> {
        self.create_at(request, Utc::now())
    }

    pub fn create_at(&self, request: TicketRequest<'_>, now: DateTime<Utc>) -> Result<Ticket> {
        match request {
            TicketRequest::TicketGranting { authentication } => {
                Ok(self.ticket_granting.create_at(authentication, now))
            }
            TicketRequest::Service {
                ticket_granting_ticket,
                service,
                credential_provided,
            } => self.service.create_at(
                ticket_granting_ticket,
                service,
                credential_provided,
                now,
            ),
            TicketRequest::ProxyGranting {
                parent,
                authentication,
            } => self.proxy_granting.create_at(parent, authentication, now),
            TicketRequest::Proxy {
                proxy_granting_ticket,
                service,
            } => self.proxy.create_at(proxy_granting_ticket, service, now),
            TicketRequest::TransientSession {
                service,
                properties,
            } => Ok(self.transient_session.create_at(service, properties, now)),
            TicketRequest::OAuthCode {
                ticket_granting_ticket,
                service,
                scopes,
            } => self
                .oauth_code
                .create_at(ticket_granting_ticket, service, scopes, now),
            TicketRequest::OAuthAccessToken {
                ticket_granting_ticket,
                service,
                scopes,
            } => self
                .oauth_access_token
                .create_at(ticket_granting_ticket, service, scopes, now),
            TicketRequest::OAuthRefreshToken {
                access_token,
                scopes,
            } => self.oauth_refresh_token.create_at(access_token, scopes, now),
        }
    }
}

macro_rules! impl_ticket_factory {
    ($($factory:ty),+ $(,)?) => {
        $(
            impl TicketFactory for $factory {
                fn kind(&self) -> TicketKind {
                    self.blueprint.definition().kind()
                }

                fn definition(&self) -> &TicketDefinition {
                    self.blueprint.definition()
                }
            }
        )+
    };
}

impl_ticket_factory!(
    TicketGrantingTicketFactory,
    ServiceTicketFactory,
    ProxyGrantingTicketFactory,
    ProxyTicketFactory,
    TransientSessionTicketFactory,
    OAuthCodeFactory,
    OAuthAccessTokenFactory,
    OAuthRefreshTokenFactory,
);

#[cfg(test)]
mod tests;
