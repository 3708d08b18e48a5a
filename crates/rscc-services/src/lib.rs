//! rscc-services: Process-backed collaborators for rscc
//!
//! Implements the core collaborator traits by running external programs:
//! the key-server shell scripts, the VNC server and viewer, and the
//! handshake and relay helpers. Every long-running child is supervised by
//! a [`process::ManagedProcess`] and killed when its handle is dropped.

pub mod factory;
pub mod handshake;
pub mod process;
pub mod relay;
pub mod runner;
pub mod vnc;

pub use factory::ProcessServiceFactory;
pub use handshake::HelperHandshake;
pub use process::ManagedProcess;
pub use relay::HelperRelay;
pub use runner::ShellCommandRunner;
pub use vnc::{VncServerHandler, VncViewerHandler};
