//! rscc-core: Core types and configuration for rscc
//!
//! This crate provides the session key codec, status and tier types,
//! configuration, the address book, and the traits through which the
//! session orchestrator drives its external collaborators.

pub mod config;
pub mod error;
pub mod key;
pub mod scripts;
pub mod traits;
pub mod types;

pub use error::{ConfigError, KeyError, RsccError, ServiceError, StatusError};
pub use key::SessionKey;
pub use types::{
    FallbackDecision, HandshakeOutcome, RelayInitiator, RelayMode, Role, SessionStatus, Severity,
};
