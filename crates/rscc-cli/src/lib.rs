//! rscc: Command-line client for remote support sessions
//!
//! Provides the `rscc` binary for sharing a desktop under a session key,
//! joining a shared desktop, calling supporters directly, and managing the
//! address book and configuration.

pub mod commands;
pub mod output;
pub mod runtime;
