use super::Ticket;
use crate::expiration::CascadeMode;
use chrono::{DateTime, Utc};

/// Resolved parent of a ticket, attached transiently and never persisted.
///
/// An orphaned lineage means the ticket references a parent id that no longer
/// exists in storage.
#[derive(Debug, Clone)]
pub struct Lineage {
    parent: Option<Box<Ticket>>,
    mode: CascadeMode,
}

impl Lineage {
    pub fn new(parent: Ticket, mode: CascadeMode) -> Self {
        Self {
            parent: Some(Box::new(parent)),
            mode,
        }
    }

    pub fn orphaned(mode: CascadeMode) -> Self {
        Self { parent: None, mode }
    }

    pub fn parent(&self) -> Option<&Ticket> {
        self.parent.as_deref()
    }

    pub fn parent_mut(&mut self) -> Option<&mut Ticket> {
        self.parent.as_deref_mut()
    }

    pub fn mode(&self) -> CascadeMode {
        self.mode
    }

    pub fn is_orphaned(&self) -> bool {
        self.parent.is_none()
    }

    /// A purged parent counts as expired
    pub fn is_parent_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.parent {
            Some(parent) => parent.is_expired_at(now),
            None => true,
        }
    }
}
