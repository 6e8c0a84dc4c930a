use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of ticket kinds known to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    /// Root credential of an SSO session
    TicketGranting,
    /// One-shot ticket proving a login to a service
    Service,
    /// Service ticket issued to a proxying service
    Proxy,
    /// Lets a service obtain proxy tickets on behalf of the user
    ProxyGranting,
    /// Root-less carrier of short-lived per-flow state
    TransientSession,
    /// OAuth authorization code
    OAuthCode,
    OAuthAccessToken,
    OAuthRefreshToken,
}

impl TicketKind {
    pub const ALL: [TicketKind; 8] = [
        Self::TicketGranting,
        Self::Service,
        Self::Proxy,
        Self::ProxyGranting,
        Self::TransientSession,
        Self::OAuthCode,
        Self::OAuthAccessToken,
        Self::OAuthRefreshToken,
    ];

    /// Stable identifier used in storage columns and configuration keys
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TicketGranting => "ticket_granting",
            Self::Service => "service",
            Self::Proxy => "proxy",
            Self::ProxyGranting => "proxy_granting",
            Self::TransientSession => "transient_session",
            Self::OAuthCode => "oauth_code",
            Self::OAuthAccessToken => "oauth_access_token",
            Self::OAuthRefreshToken => "oauth_refresh_token",
        }
    }

    #[must_use]
    pub const fn default_prefix(self) -> &'static str {
        match self {
            Self::TicketGranting => "TGT",
            Self::Service => "ST",
            Self::Proxy => "PT",
            Self::ProxyGranting => "PGT",
            Self::TransientSession => "TST",
            Self::OAuthCode => "OC",
            Self::OAuthAccessToken => "AT",
            Self::OAuthRefreshToken => "RT",
        }
    }

    #[must_use]
    pub const fn default_storage_name(self) -> &'static str {
        match self {
            Self::TicketGranting => "ticket_granting_tickets",
            Self::Service => "service_tickets",
            Self::Proxy => "proxy_tickets",
            Self::ProxyGranting => "proxy_granting_tickets",
            Self::TransientSession => "transient_session_tickets",
            Self::OAuthCode => "oauth_codes",
            Self::OAuthAccessToken => "oauth_access_tokens",
            Self::OAuthRefreshToken => "oauth_refresh_tokens",
        }
    }

    /// Kinds that never reference a parent
    #[must_use]
    pub const fn is_root(self) -> bool {
        matches!(self, Self::TicketGranting | Self::TransientSession)
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| crate::Error::configuration(format!("unknown ticket kind '{s}'")))
    }
}
