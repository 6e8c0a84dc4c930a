//! Values handed to the core by authentication handlers and protocol layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Multi-valued attribute map as released by the authentication layer
pub type Attributes = BTreeMap<String, Vec<String>>;

/// Authenticated subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.insert(name.into(), values);
        self
    }
}

/// Result of a successful authentication, opaque to the core beyond the
/// principal id and attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub principal: Principal,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    pub authentication_date: DateTime<Utc>,
}

impl Authentication {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            attributes: Attributes::new(),
            authentication_date: Utc::now(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.insert(name.into(), values);
        self
    }

    pub fn principal_id(&self) -> &str {
        &self.principal.id
    }
}

/// Relying party a ticket is issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_service_id: Option<u64>,
}

impl Service {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            registered_service_id: None,
        }
    }

    pub fn registered(mut self, registered_service_id: u64) -> Self {
        self.registered_service_id = Some(registered_service_id);
        self
    }
}
