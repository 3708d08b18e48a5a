//! Long-running service traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::types::{HandshakeOutcome, RelayInitiator, RelayMode, Role};

/// Rendezvous with the peer through the key server, including NAT traversal.
///
/// One instance per session.
#[async_trait]
pub trait HandshakeService: Send + Sync {
    /// Start the handshake in the background
    async fn start(&self) -> Result<(), ServiceError>;

    /// Wait for the handshake to finish
    async fn join(&self) -> Result<HandshakeOutcome, ServiceError>;

    /// Abort the handshake and release its resources
    async fn close(&self) -> Result<(), ServiceError>;
}

/// Local proxy forwarding remote-desktop traffic over the traversal transport
#[async_trait]
pub trait RelayService: Send + Sync {
    /// Start relaying; returns once the relay is running
    async fn start(&self) -> Result<(), ServiceError>;

    /// Local port the viewer connects to while the relay is active
    fn proxy_port(&self) -> u16;

    /// Stop relaying
    async fn close(&self) -> Result<(), ServiceError>;
}

/// The remote-desktop server process on the sharer's machine
#[async_trait]
pub trait RemoteDesktopServer: Send + Sync {
    /// Start the server listening on the local remote-desktop port
    async fn start_listening(&self) -> Result<(), ServiceError>;

    /// Start the server connecting out to a listening viewer.
    ///
    /// Returns whether the connection was established.
    async fn start_reverse(
        &self,
        address: &str,
        port: u16,
        encrypted: bool,
    ) -> Result<bool, ServiceError>;

    /// Kill the server process
    async fn kill(&self) -> Result<(), ServiceError>;

    /// Whether the server process is alive
    fn is_process_running(&self) -> bool;
}

/// The remote-desktop viewer process
#[async_trait]
pub trait RemoteDesktopViewer: Send + Sync {
    /// Start the viewer waiting for reverse connections
    async fn start_listening(&self) -> Result<(), ServiceError>;

    /// Start the viewer connecting to `host:port`
    async fn start_connecting(&self, host: &str, port: u16) -> Result<(), ServiceError>;

    /// Kill the viewer process
    async fn kill(&self) -> Result<(), ServiceError>;

    /// Whether the viewer process is alive
    fn is_process_running(&self) -> bool;

    /// Whether the viewer has an established remote-desktop session.
    ///
    /// Set asynchronously by the viewer itself.
    fn is_session_running(&self) -> bool;
}

/// Creates the per-session service instances
pub trait ServiceFactory: Send + Sync {
    /// New handshake for `role`
    fn handshake(&self, role: Role) -> Arc<dyn HandshakeService>;

    /// New relay in `mode`, opened by `initiator`
    fn relay(&self, mode: RelayMode, initiator: RelayInitiator) -> Arc<dyn RelayService>;

    /// New remote-desktop server handler
    fn server(&self) -> Arc<dyn RemoteDesktopServer>;

    /// New remote-desktop viewer handler
    fn viewer(&self) -> Arc<dyn RemoteDesktopViewer>;
}
