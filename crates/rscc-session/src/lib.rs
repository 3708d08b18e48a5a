//! rscc-session: Connection orchestration for rscc
//!
//! Holds the state machine that establishes a remote-desktop session
//! between a sharer and a viewer identified by a session key:
//!
//! - [`fallback`] picks the relay tier from the traversal outcome
//! - [`ConnectionOrchestrator`] runs the sharer, viewer, direct-call and
//!   listening-viewer flows and publishes [`ConnectionEstablishmentState`]
//! - [`ConnectionOrchestrator::kill_connection`] tears a session down
//!
//! All process and network work goes through the collaborator traits in
//! `rscc_core::traits`.

pub mod fallback;
mod flows;
pub mod orchestrator;
pub mod state;
mod teardown;

pub use fallback::select_tier;
pub use orchestrator::ConnectionOrchestrator;
pub use state::{ConnectionEstablishmentState, SessionPhase};
