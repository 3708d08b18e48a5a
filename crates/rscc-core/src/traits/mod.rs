//! Collaborator traits consumed by the orchestrator

mod command;
mod service;

pub use command::{CommandOutput, CommandRunner};
pub use service::{
    HandshakeService, RelayService, RemoteDesktopServer, RemoteDesktopViewer, ServiceFactory,
};
