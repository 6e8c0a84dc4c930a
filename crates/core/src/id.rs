//! Ticket id generation
//!
//! Ids look like `ST-h2RkQ0x8...` or, with a node suffix configured,
//! `TGT-3hd8...-node1`. Only `[A-Za-z0-9-]` ever appears, so an id is usable
//! verbatim as a REST path segment, SQL key or document id.

use crate::errors::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Separator between prefix, random part and suffix
pub const SEPARATOR: char = '-';

/// Default length of the random part (about 190 bits of entropy)
pub const DEFAULT_ID_LENGTH: usize = 32;

/// Shortest random part accepted by the generator (about 95 bits)
pub const MIN_ID_LENGTH: usize = 16;

/// Produces unique, unguessable ticket ids
pub trait UniqueTicketIdGenerator: Send + Sync {
    fn new_ticket_id(&self, prefix: &str) -> String;
}

/// Stateless generator drawing the random part from the OS CSPRNG
#[derive(Debug, Clone)]
pub struct DefaultUniqueTicketIdGenerator {
    length: usize,
    suffix: Option<String>,
}

impl Default for DefaultUniqueTicketIdGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_ID_LENGTH,
            suffix: None,
        }
    }
}

impl DefaultUniqueTicketIdGenerator {
    pub fn new(length: usize) -> Result<Self> {
        if length < MIN_ID_LENGTH {
            return Err(Error::configuration(format!(
                "ticket id length {length} is below the minimum of {MIN_ID_LENGTH}"
            )));
        }
        Ok(Self {
            length,
            suffix: None,
        })
    }

    /// Append a node identifier so ids from different nodes never collide
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Result<Self> {
        let suffix = suffix.into();
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::configuration(format!(
                "ticket id suffix '{suffix}' must be non-empty and alphanumeric"
            )));
        }
        self.suffix = Some(suffix);
        Ok(self)
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl UniqueTicketIdGenerator for DefaultUniqueTicketIdGenerator {
    fn new_ticket_id(&self, prefix: &str) -> String {
        let random: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();

        match &self.suffix {
            Some(suffix) => format!("{prefix}{SEPARATOR}{random}{SEPARATOR}{suffix}"),
            None => format!("{prefix}{SEPARATOR}{random}"),
        }
    }
}

/// Text before the first separator, used to classify an arbitrary id
pub fn prefix_of(ticket_id: &str) -> Option<&str> {
    ticket_id
        .split_once(SEPARATOR)
        .map(|(prefix, _)| prefix)
        .filter(|prefix| !prefix.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_carries_prefix_and_separator() {
        let generator = DefaultUniqueTicketIdGenerator::default();
        let id = generator.new_ticket_id("ST");
        assert!(id.starts_with("ST-"));
        assert_eq!(id.len(), "ST-".len() + DEFAULT_ID_LENGTH);
        assert_eq!(prefix_of(&id), Some("ST"));
    }

    #[test]
    fn test_suffix_is_appended() {
        let generator = DefaultUniqueTicketIdGenerator::new(20)
            .unwrap()
            .with_suffix("node1")
            .unwrap();
        let id = generator.new_ticket_id("TGT");
        assert!(id.starts_with("TGT-"));
        assert!(id.ends_with("-node1"));
    }

    #[test]
    fn test_rejects_short_length_and_bad_suffix() {
        assert!(DefaultUniqueTicketIdGenerator::new(8).is_err());
        assert!(DefaultUniqueTicketIdGenerator::default()
            .with_suffix("node/1")
            .is_err());
    }

    #[test]
    fn test_ids_do_not_repeat() {
        let generator = DefaultUniqueTicketIdGenerator::new(MIN_ID_LENGTH).unwrap();
        let ids: HashSet<String> = (0..10_000)
            .map(|_| generator.new_ticket_id("ST"))
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_prefix_of_rejects_unprefixed_ids() {
        assert_eq!(prefix_of("nodash"), None);
        assert_eq!(prefix_of("-leading"), None);
    }

    proptest! {
        #[test]
        fn prop_ids_are_storage_safe(length in MIN_ID_LENGTH..128usize) {
            let generator = DefaultUniqueTicketIdGenerator::new(length).unwrap();
            let id = generator.new_ticket_id("PGT");
            prop_assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == SEPARATOR));
            prop_assert_eq!(prefix_of(&id), Some("PGT"));
        }
    }
}
