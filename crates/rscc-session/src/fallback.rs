//! Fallback tier selection
//!
//! Decides from the two traversal outcomes whether a relay is started and in
//! which direction. When neither side traversed its NAT the session goes
//! through the port the key server already forwards, so [`FallbackDecision::NoRelay`]
//! never aborts a session.

use rscc_core::{FallbackDecision, RelayInitiator, Role};

/// Pick the relay tier for `role`.
///
/// The initiator names the peer whose traversal succeeded and that therefore
/// opens the relayed transport. Both peers evaluate the same outcome pair
/// from opposite sides, so a sharer's `(local, remote)` cell always pairs
/// with the viewer's `(remote, local)` cell.
pub fn select_tier(role: Role, local: bool, remote: bool) -> FallbackDecision {
    match role {
        Role::Sharer => match (local, remote) {
            (true, true) => FallbackDecision::RelayListen(RelayInitiator::Viewer),
            (true, false) => FallbackDecision::RelayListen(RelayInitiator::Sharer),
            (false, true) => FallbackDecision::RelayListen(RelayInitiator::Viewer),
            (false, false) => FallbackDecision::NoRelay,
        },
        Role::Viewer => match (local, remote) {
            (true, _) => FallbackDecision::RelayConnect(RelayInitiator::Viewer),
            (false, true) => FallbackDecision::RelayConnect(RelayInitiator::Sharer),
            (false, false) => FallbackDecision::NoRelay,
        },
        // Direct calls never negotiate a traversal
        Role::Direct => FallbackDecision::NoRelay,
    }
}
