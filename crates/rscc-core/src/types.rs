//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StatusError;

/// Which side of a session this process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Exposes the local desktop
    Sharer,
    /// Connects to a shared desktop
    Viewer,
    /// Direct outgoing call to an address-book entry, no key server involved
    Direct,
}

impl Role {
    /// Whether this role exposes the local desktop
    pub fn is_sharer(self) -> bool {
        matches!(self, Role::Sharer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sharer => write!(f, "sharer"),
            Role::Viewer => write!(f, "viewer"),
            Role::Direct => write!(f, "direct"),
        }
    }
}

/// Severity of a status message.
///
/// The ordinal values are a contract with the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    #[default]
    Idle = 0,
    Initializing = 1,
    Success = 2,
    Fail = 3,
}

impl Severity {
    /// Ordinal index
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Style class used when rendering a status box of this severity
    pub fn style_class(self) -> &'static str {
        match self {
            Severity::Idle => "statusBox",
            Severity::Initializing => "statusBoxInitialize",
            Severity::Success => "statusBoxSuccess",
            Severity::Fail => "statusBoxFail",
        }
    }
}

impl TryFrom<i64> for Severity {
    type Error = StatusError;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Severity::Idle),
            1 => Ok(Severity::Initializing),
            2 => Ok(Severity::Success),
            3 => Ok(Severity::Fail),
            other => Err(StatusError::SeverityOutOfRange(other)),
        }
    }
}

/// Human-readable progress of the current session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStatus {
    pub text: String,
    pub severity: Severity,
}

impl SessionStatus {
    /// Create a status from typed parts
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }

    /// Create a status from untyped parts, rejecting missing text and
    /// severity indices outside 0..=3
    pub fn from_parts(text: Option<&str>, severity_index: i64) -> Result<Self, StatusError> {
        let severity = Severity::try_from(severity_index)?;
        let text = text.ok_or(StatusError::MissingText)?;
        Ok(Self::new(text, severity))
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.text)
    }
}

/// How the relay is started relative to the remote-desktop service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Accept the remote peer (sharer side)
    Listen,
    /// Dial out to the remote peer (viewer side)
    Connect,
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayMode::Listen => write!(f, "listen"),
            RelayMode::Connect => write!(f, "connect"),
        }
    }
}

/// Which peer opens the relayed transport.
///
/// Both peers derive the same value from their mirrored traversal outcomes:
/// the viewer's "local succeeded" is the sharer's "remote succeeded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayInitiator {
    Viewer,
    Sharer,
}

impl fmt::Display for RelayInitiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayInitiator::Viewer => write!(f, "viewer"),
            RelayInitiator::Sharer => write!(f, "sharer"),
        }
    }
}

/// Result of fallback tier selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FallbackDecision {
    /// Use the port already forwarded through the key server
    NoRelay,
    /// Start the relay in listen mode
    RelayListen(RelayInitiator),
    /// Start the relay in connect mode
    RelayConnect(RelayInitiator),
}

impl FallbackDecision {
    /// Whether a relay has to be started
    pub fn uses_relay(self) -> bool {
        !matches!(self, FallbackDecision::NoRelay)
    }

    /// Relay mode and initiator, if a relay is needed
    pub fn relay(self) -> Option<(RelayMode, RelayInitiator)> {
        match self {
            FallbackDecision::NoRelay => None,
            FallbackDecision::RelayListen(initiator) => Some((RelayMode::Listen, initiator)),
            FallbackDecision::RelayConnect(initiator) => Some((RelayMode::Connect, initiator)),
        }
    }
}

impl fmt::Display for FallbackDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackDecision::NoRelay => write!(f, "no relay"),
            FallbackDecision::RelayListen(i) => write!(f, "relay listen ({} initiates)", i),
            FallbackDecision::RelayConnect(i) => write!(f, "relay connect ({} initiates)", i),
        }
    }
}

/// What the handshake service learned about the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandshakeOutcome {
    /// The peer answered the rendezvous
    pub peer_responded: bool,
    /// NAT traversal succeeded on this side
    pub local_traversal_succeeded: bool,
    /// NAT traversal succeeded on the peer's side
    pub remote_traversal_succeeded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_accepts_known_indices() {
        for (index, expected) in [
            (0, Severity::Idle),
            (1, Severity::Initializing),
            (2, Severity::Success),
            (3, Severity::Fail),
        ] {
            let severity = Severity::try_from(index).unwrap();
            assert_eq!(severity, expected);
            assert_eq!(i64::from(severity.index()), index);
        }
    }

    #[test]
    fn test_severity_rejects_out_of_range() {
        assert_eq!(
            Severity::try_from(-1),
            Err(StatusError::SeverityOutOfRange(-1))
        );
        assert_eq!(Severity::try_from(4), Err(StatusError::SeverityOutOfRange(4)));
    }

    #[test]
    fn test_status_from_parts() {
        let status = SessionStatus::from_parts(Some("Key successfully generated"), 2).unwrap();
        assert_eq!(status.severity, Severity::Success);
        assert_eq!(status.severity.style_class(), "statusBoxSuccess");

        assert_eq!(
            SessionStatus::from_parts(None, 1),
            Err(StatusError::MissingText)
        );
        assert_eq!(
            SessionStatus::from_parts(Some("text"), 4),
            Err(StatusError::SeverityOutOfRange(4))
        );
    }

    #[test]
    fn test_fallback_decision_relay() {
        assert_eq!(FallbackDecision::NoRelay.relay(), None);
        assert_eq!(
            FallbackDecision::RelayConnect(RelayInitiator::Sharer).relay(),
            Some((RelayMode::Connect, RelayInitiator::Sharer))
        );
        assert!(FallbackDecision::RelayListen(RelayInitiator::Viewer).uses_relay());
    }
}
