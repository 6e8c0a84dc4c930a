use super::Blueprint;
use crate::authentication::Service;
use crate::ticket::{Properties, Ticket};
use chrono::{DateTime, Utc};

/// Issues root-less tickets carrying short-lived per-flow state
#[derive(Clone)]
pub struct TransientSessionTicketFactory {
    pub(super) blueprint: Blueprint,
}

impl TransientSessionTicketFactory {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }

    pub fn create(&self, service: Option<Service>, properties: Properties) -> Ticket {
        self.create_at(service, properties, Utc::now())
    }

    pub fn create_at(
        &self,
        service: Option<Service>,
        properties: Properties,
        now: DateTime<Utc>,
    ) -> Ticket {
        let ticket = self.blueprint.fresh(now).with_properties(properties);
        match service {
            Some(service) => ticket.with_service(service),
            None => ticket,
        }
    }
}
