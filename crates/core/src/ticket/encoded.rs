use super::{Ticket, TicketKind};
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Storage envelope for a cipher-protected ticket.
///
/// Only the id, the routing prefix and the opaque payload are readable; the
/// ticket itself has to be decoded by the cipher that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTicket {
    id: String,
    prefix: String,
    #[serde(with = "base64_bytes")]
    encoded_ticket: Vec<u8>,
}

impl EncodedTicket {
    pub fn new(id: impl Into<String>, prefix: impl Into<String>, encoded_ticket: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            prefix: prefix.into(),
            encoded_ticket,
        }
    }

    /// Plain id or its digest, depending on registry configuration
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn encoded_ticket(&self) -> &[u8] {
        &self.encoded_ticket
    }

    pub fn into_encoded_ticket(self) -> Vec<u8> {
        self.encoded_ticket
    }
}

/// What a storage adapter actually persists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", content = "ticket", rename_all = "snake_case")]
pub enum TicketRecord {
    Plain(Box<Ticket>),
    Encoded(EncodedTicket),
}

impl TicketRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::Plain(ticket) => ticket.id(),
            Self::Encoded(encoded) => encoded.id(),
        }
    }

    pub fn is_encoded(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }

    /// Borrow the ticket; encoded envelopes must be decoded first
    pub fn as_ticket(&self) -> Result<&Ticket> {
        match self {
            Self::Plain(ticket) => Ok(ticket),
            Self::Encoded(encoded) => Err(Error::unsupported(
                "as_ticket",
                format!("ticket '{}' is encoded and must be decoded first", encoded.id()),
            )),
        }
    }

    /// Kind of the wrapped ticket; encoded envelopes must be decoded first
    pub fn kind(&self) -> Result<TicketKind> {
        self.as_ticket().map(Ticket::kind)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::serialization(self.id(), e))
    }

    pub fn from_json(key: &str, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::serialization(key, e))
    }
}

impl From<Ticket> for TicketRecord {
    fn from(ticket: Ticket) -> Self {
        Self::Plain(Box::new(ticket))
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
