//! Expiration policies and the deployment-wide cascade switch
//!
//! Policies are plain values attached to a ticket at creation and persisted
//! with it. Evaluation always takes an explicit `now` so callers can reason
//! about boundaries without sleeping.

use crate::ticket::Ticket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How descendant tickets relate to the expiry of their parent.
///
/// A single value of this type is held by the catalog and consulted both by
/// `ExpirationPolicy::Descendant` evaluation and by registry cascade deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeMode {
    /// Descendants expire with their parent and are deleted with it
    #[default]
    Dependent,
    /// Descendants live on their own timeout and survive parent deletion
    Sovereign,
}

impl CascadeMode {
    #[must_use]
    pub const fn is_dependent(self) -> bool {
        matches!(self, Self::Dependent)
    }
}

impl fmt::Display for CascadeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependent => write!(f, "dependent"),
            Self::Sovereign => write!(f, "sovereign"),
        }
    }
}

impl std::str::FromStr for CascadeMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dependent" => Ok(Self::Dependent),
            "sovereign" => Ok(Self::Sovereign),
            other => Err(crate::Error::configuration(format!(
                "unknown cascade mode '{other}', expected 'dependent' or 'sovereign'"
            ))),
        }
    }
}

/// Liveness predicate over a ticket's timestamps and counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ExpirationPolicy {
    /// Always live
    NeverExpires,
    /// Hard lifetime since creation and/or idle lifetime since last use
    Timeout {
        #[serde(default, with = "optional_millis")]
        time_to_live: Option<Duration>,
        #[serde(default, with = "optional_millis")]
        time_to_idle: Option<Duration>,
    },
    /// Expires after `max_uses` uses or `time_to_live`, whichever first
    MultiUse {
        max_uses: u64,
        #[serde(with = "millis")]
        time_to_live: Duration,
    },
    /// Parent-tied lifetime layered over a standalone policy
    Descendant { standalone: Box<ExpirationPolicy> },
}

impl ExpirationPolicy {
    #[must_use]
    pub const fn never() -> Self {
        Self::NeverExpires
    }

    /// Hard and idle timeout, whichever elapses first
    #[must_use]
    pub const fn timeout(time_to_live: Duration, time_to_idle: Duration) -> Self {
        Self::Timeout {
            time_to_live: Some(time_to_live),
            time_to_idle: Some(time_to_idle),
        }
    }

    #[must_use]
    pub const fn hard_timeout(time_to_live: Duration) -> Self {
        Self::Timeout {
            time_to_live: Some(time_to_live),
            time_to_idle: None,
        }
    }

    #[must_use]
    pub const fn idle_timeout(time_to_idle: Duration) -> Self {
        Self::Timeout {
            time_to_live: None,
            time_to_idle: Some(time_to_idle),
        }
    }

    #[must_use]
    pub const fn multi_use(max_uses: u64, time_to_live: Duration) -> Self {
        Self::MultiUse {
            max_uses,
            time_to_live,
        }
    }

    #[must_use]
    pub fn descendant(standalone: ExpirationPolicy) -> Self {
        Self::Descendant {
            standalone: Box::new(standalone),
        }
    }

    /// Short name used in logs and the CLI catalog listing
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NeverExpires => "never-expires",
            Self::Timeout { .. } => "timeout",
            Self::MultiUse { .. } => "multi-use",
            Self::Descendant { .. } => "descendant",
        }
    }

    /// Longest time a ticket under this policy can stay live without being
    /// used again. `None` means unbounded.
    #[must_use]
    pub fn maximum_lifetime(&self) -> Option<Duration> {
        match self {
            Self::NeverExpires => None,
            Self::Timeout {
                time_to_live,
                time_to_idle,
            } => time_to_live.or(*time_to_idle),
            Self::MultiUse { time_to_live, .. } => Some(*time_to_live),
            Self::Descendant { standalone } => standalone.maximum_lifetime(),
        }
    }

    /// Decide whether `ticket` is expired at `now` according to this policy
    /// alone. The ticket's manual expired flag is handled by the ticket.
    #[must_use]
    pub fn is_expired(&self, ticket: &Ticket, now: DateTime<Utc>) -> bool {
        match self {
            Self::NeverExpires => false,
            Self::Timeout {
                time_to_live,
                time_to_idle,
            } => {
                let hard = time_to_live
                    .is_some_and(|ttl| elapsed(ticket.creation_time(), now) > ttl);
                let idle = time_to_idle
                    .is_some_and(|tti| elapsed(ticket.last_time_used(), now) > tti);
                hard || idle
            }
            Self::MultiUse {
                max_uses,
                time_to_live,
            } => {
                ticket.count_of_uses() >= *max_uses
                    || elapsed(ticket.creation_time(), now) > *time_to_live
            }
            Self::Descendant { standalone } => {
                let cascaded = ticket.lineage().is_some_and(|lineage| {
                    lineage.mode().is_dependent() && lineage.is_parent_expired(now)
                });
                cascaded || standalone.is_expired(ticket, now)
            }
        }
    }
}

impl fmt::Display for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverExpires => write!(f, "never-expires"),
            Self::Timeout {
                time_to_live,
                time_to_idle,
            } => write!(
                f,
                "timeout(ttl={}, idle={})",
                format_optional(*time_to_live),
                format_optional(*time_to_idle)
            ),
            Self::MultiUse {
                max_uses,
                time_to_live,
            } => write!(f, "multi-use(uses={max_uses}, ttl={}s)", time_to_live.as_secs()),
            Self::Descendant { standalone } => write!(f, "descendant({standalone})"),
        }
    }
}

fn format_optional(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{}s", d.as_secs()),
        None => "-".to_string(),
    }
}

fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests;
