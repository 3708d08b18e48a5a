//! Session teardown

use tokio_util::sync::CancellationToken;

use crate::orchestrator::ConnectionOrchestrator;

impl ConnectionOrchestrator {
    /// Tear down everything the current session started.
    ///
    /// Idempotent and safe from any state. A flow that is still running
    /// stops at its next step without starting anything else. Each step only acts on resources that exist; failures are
    /// logged and the remaining steps still run. The key is always revoked at
    /// the key server and then cleared.
    pub async fn kill_connection(&self) {
        let (handshake, relay) = {
            let mut resources = self.lock_resources();
            std::mem::replace(&mut resources.abort, CancellationToken::new()).cancel();
            (resources.handshake.take(), resources.relay.take())
        };

        if let Some(handshake) = handshake {
            tracing::info!("Closing handshake");
            if let Err(e) = handshake.close().await {
                tracing::warn!("Failed to close handshake: {}", e);
            }
        }

        if let Some(relay) = relay {
            tracing::info!("Closing relay");
            if let Err(e) = relay.close().await {
                tracing::warn!("Failed to close relay: {}", e);
            }
        }

        if self.server.is_process_running() {
            tracing::info!("Stopping VNC server");
            if let Err(e) = self.server.kill().await {
                tracing::warn!("Failed to stop VNC server: {}", e);
            }
        }

        if self.viewer.is_process_running() {
            tracing::info!("Stopping VNC viewer");
            if let Err(e) = self.viewer.kill().await {
                tracing::warn!("Failed to stop VNC viewer: {}", e);
            }
        }

        let key = self.key();
        tracing::info!("Revoking key at the key server");
        self.run_script(&self.scripts.stop(&key)).await;

        self.update(|state| {
            state.key.clear();
            state.relay = None;
            state.torn_down = true;
        });
        self.refresh();
        tracing::info!("Connection torn down");
    }
}
