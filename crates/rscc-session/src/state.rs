//! Connection establishment state

use std::fmt;

use rscc_core::{FallbackDecision, HandshakeOutcome, Role, SessionStatus, Severity};

/// Coarse lifecycle phase derived from the state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Establishing,
    Active,
    Failed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Establishing => write!(f, "establishing"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Snapshot of the single active session.
///
/// Owned by the orchestrator, which publishes a new snapshot on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionEstablishmentState {
    /// Role of the current session, `None` before the first flow ran
    pub role: Option<Role>,
    /// Session key, empty when none is assigned
    pub key: String,
    pub local_traversal_succeeded: bool,
    pub remote_traversal_succeeded: bool,
    /// The peer answered the handshake; consumed once the sharer is listening
    pub peer_responded: bool,
    pub establishment_in_progress: bool,
    /// The viewer reported an established remote-desktop session
    pub session_running: bool,
    pub server_process_running: bool,
    pub viewer_process_running: bool,
    /// The last key-server setup succeeded
    pub key_server_connected: bool,
    /// Tier in effect while a relay is running
    pub relay: Option<FallbackDecision>,
    /// Teardown ran after the last flow started
    pub torn_down: bool,
    pub status: SessionStatus,
}

impl ConnectionEstablishmentState {
    /// Record the handshake outcome flags
    pub fn apply_outcome(&mut self, outcome: &HandshakeOutcome) {
        self.peer_responded = outcome.peer_responded;
        self.local_traversal_succeeded = outcome.local_traversal_succeeded;
        self.remote_traversal_succeeded = outcome.remote_traversal_succeeded;
    }

    /// Whether a relay is running for this session
    pub fn relay_active(&self) -> bool {
        self.relay.is_some()
    }

    /// Lifecycle phase; a torn-down session never counts as establishing
    pub fn phase(&self) -> SessionPhase {
        if self.establishment_in_progress && !self.torn_down {
            SessionPhase::Establishing
        } else if self.status.severity == Severity::Fail {
            SessionPhase::Failed
        } else if self.session_running
            || self.server_process_running
            || self.viewer_process_running
        {
            SessionPhase::Active
        } else {
            SessionPhase::Idle
        }
    }
}
