//! Session establishment flows

use rscc_core::config::Supporter;
use rscc_core::{ConfigError, HandshakeOutcome, Role, ServiceError, SessionKey, Severity};

use tokio_util::sync::CancellationToken;

use crate::orchestrator::{ensure_live, ConnectionOrchestrator};

/// Loopback host the viewer dials; both the relay proxy and the key-server
/// tunnel end on this machine.
const VIEWER_HOST: &str = "localhost";

/// Key printed by the share script: its last non-empty output line
fn key_from_output(stdout: &str) -> String {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

impl ConnectionOrchestrator {
    /// Share the local desktop.
    ///
    /// Requests a key, waits for a viewer to answer the handshake and then
    /// starts the VNC server, plus a relay when traversal succeeded.
    /// [`ConnectionOrchestrator::kill_connection`] aborts it at any step.
    pub async fn request_session(&self) {
        let abort = self.session_token();
        self.update(|state| {
            state.role = Some(Role::Sharer);
            state.establishment_in_progress = true;
            state.torn_down = false;
        });
        self.report("Setting up keyserver...", Severity::Initializing);
        self.setup_key_server().await;

        self.report("Requesting key from server...", Severity::Initializing);
        let Some(output) = self.run_script(&self.scripts.share()).await else {
            // Establishment stays flagged as in progress
            return;
        };

        let key = key_from_output(&output.stdout);
        if abort.is_cancelled() {
            // Teardown ran before this key was known
            self.run_script(&self.scripts.stop(&key)).await;
            return self.abandon("Session request");
        }
        tracing::info!("Key generated: {}", rscc_core::key::format(&key));
        self.update(|state| state.key = key);
        self.report("Key generated", Severity::Success);

        match self.serve_peer(&abort).await {
            Ok(()) => {}
            Err(e) if abort.is_cancelled() => {
                tracing::debug!("Sharing stopped: {}", e);
                return self.abandon("Session request");
            }
            Err(e) => {
                tracing::error!("Sharing failed: {}", e);
                self.kill_connection().await;
                self.report(format!("Connection failed: {}", e), Severity::Fail);
            }
        }

        self.update(|state| state.establishment_in_progress = false);
    }

    async fn serve_peer(&self, abort: &CancellationToken) -> Result<(), ServiceError> {
        let outcome = self.run_handshake(Role::Sharer, abort).await?;
        if !outcome.peer_responded {
            tracing::info!("Peer did not respond, VNC server not started");
            return Ok(());
        }

        self.server.start_listening().await?;
        if abort.is_cancelled() {
            self.discard_server().await;
            return Err(ServiceError::Closed("session"));
        }
        self.refresh();

        tokio::select! {
            _ = tokio::time::sleep(self.config.timing.settle_delay) => {}
            _ = abort.cancelled() => {}
        }
        ensure_live(abort)?;

        let decision = self.decide_tier(Role::Sharer, &outcome);
        self.start_relay(decision, abort).await?;

        self.report("VNC server waits for incoming connection", Severity::Success);
        self.update(|state| state.peer_responded = false);
        Ok(())
    }

    /// Connect to the desktop shared under `key`.
    pub async fn join_session(&self, key: SessionKey) {
        let abort = self.session_token();
        self.update(|state| {
            state.role = Some(Role::Viewer);
            state.key = key.as_str().to_string();
            state.establishment_in_progress = true;
            state.torn_down = false;
        });
        self.report("Contacting keyserver...", Severity::Initializing);
        self.setup_key_server().await;

        self.report("Verifying key...", Severity::Initializing);
        let verified = self.run_script(&self.scripts.connect(key.as_str())).await;
        if abort.is_cancelled() {
            return self.abandon("Session join");
        }
        if verified.is_none() {
            self.report(
                format!("Key {} could not be verified by the server.", key.display()),
                Severity::Fail,
            );
            self.update(|state| state.establishment_in_progress = false);
            return;
        }

        let outcome = match self.run_handshake(Role::Viewer, &abort).await {
            Ok(outcome) => outcome,
            Err(_) if abort.is_cancelled() => return self.abandon("Session join"),
            Err(e) => {
                tracing::error!("Handshake failed, continuing without traversal: {}", e);
                HandshakeOutcome::default()
            }
        };

        let decision = self.decide_tier(Role::Viewer, &outcome);
        let proxy_port = match self.start_relay(decision, &abort).await {
            Ok(port) => port,
            Err(_) if abort.is_cancelled() => return self.abandon("Session join"),
            Err(e) => {
                tracing::error!("Relay failed: {}", e);
                self.kill_connection().await;
                self.report(format!("Connection failed: {}", e), Severity::Fail);
                self.update(|state| state.establishment_in_progress = false);
                return;
            }
        };

        self.report("Starting VNC viewer...", Severity::Initializing);
        let port = proxy_port.unwrap_or(self.config.vnc.port);
        let connected = self.connect_viewer(port, &abort).await;
        if abort.is_cancelled() {
            self.discard_viewer().await;
            return self.abandon("Session join");
        }
        if connected {
            let text = if proxy_port.is_some() {
                "VNC connection established using relay"
            } else {
                "VNC connection established over server"
            };
            self.report(text, Severity::Success);
        } else {
            tracing::warn!(
                "VNC viewer did not report a session after {} attempts",
                self.config.timing.connect_attempts
            );
        }

        self.update(|state| state.establishment_in_progress = false);
    }

    /// Dial the viewer until it reports a session or the attempts run out
    async fn connect_viewer(&self, port: u16, abort: &CancellationToken) -> bool {
        let timing = &self.config.timing;
        let mut attempts = 0;

        while !abort.is_cancelled()
            && !self.viewer_session_running()
            && attempts < timing.connect_attempts
        {
            attempts += 1;
            tracing::debug!(
                "VNC viewer attempt {}/{} to {}:{}",
                attempts,
                timing.connect_attempts,
                VIEWER_HOST,
                port
            );
            if let Err(e) = self.viewer.start_connecting(VIEWER_HOST, port).await {
                tracing::warn!("VNC viewer attempt {} failed: {}", attempts, e);
            }
            tokio::select! {
                _ = tokio::time::sleep(timing.connect_retry_interval) => {}
                _ = abort.cancelled() => {}
            }
        }

        !abort.is_cancelled() && self.viewer_session_running()
    }

    fn viewer_session_running(&self) -> bool {
        self.refresh();
        self.viewer.is_session_running()
    }

    /// Stop a server that came up after teardown had already run
    async fn discard_server(&self) {
        if self.server.is_process_running() {
            if let Err(e) = self.server.kill().await {
                tracing::warn!("Failed to stop VNC server: {}", e);
            }
        }
        self.refresh();
    }

    /// Stop a viewer that came up after teardown had already run
    async fn discard_viewer(&self) {
        if self.viewer.is_process_running() {
            if let Err(e) = self.viewer.kill().await {
                tracing::warn!("Failed to stop VNC viewer: {}", e);
            }
        }
        self.refresh();
    }

    /// Start the VNC server connecting out to a listening viewer.
    ///
    /// A missing or zero port falls back to the configured direct-call port.
    pub async fn call_direct(&self, address: &str, port: Option<u16>, encrypted: bool) {
        let port = port
            .filter(|port| *port > 0)
            .unwrap_or(self.config.direct_call_port);

        let abort = self.session_token();
        self.update(|state| {
            state.role = Some(Role::Direct);
            state.establishment_in_progress = true;
            state.torn_down = false;
        });
        self.report(
            format!("Connecting to {}:{}", address, port),
            Severity::Initializing,
        );

        let connected = match self.server.start_reverse(address, port, encrypted).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::error!("Reverse connection to {}:{} failed: {}", address, port, e);
                false
            }
        };
        if abort.is_cancelled() {
            self.discard_server().await;
            return self.abandon("Direct call");
        }
        self.refresh();

        if connected {
            self.report("Connected", Severity::Success);
        } else {
            self.report("Connection failed", Severity::Fail);
        }
        self.update(|state| state.establishment_in_progress = false);
    }

    /// [`ConnectionOrchestrator::call_direct`] for an address-book entry
    pub async fn call_supporter(&self, supporter: &Supporter) -> Result<(), ConfigError> {
        let port = supporter.port_number()?;
        tracing::info!("Calling supporter {}", supporter.description);
        self.call_direct(&supporter.address, port, supporter.encrypted)
            .await;
        Ok(())
    }

    /// Tear the current session down and share again under a new key
    pub async fn refresh_key(&self) {
        self.report("Refreshing key...", Severity::Initializing);
        self.kill_connection().await;
        self.request_session().await;
    }

    /// Run the VNC viewer in listening mode, independent of any key
    pub async fn start_viewer_service(&self) {
        self.update(|state| {
            state.establishment_in_progress = true;
            state.torn_down = false;
        });
        self.report("Starting VNC viewer as service...", Severity::Initializing);

        match self.viewer.start_listening().await {
            Ok(()) => self.report("VNC viewer service is running", Severity::Success),
            Err(e) => {
                tracing::error!("VNC viewer service failed to start: {}", e);
                self.report("VNC viewer service could not be started", Severity::Fail);
            }
        }
        self.refresh();
        self.update(|state| state.establishment_in_progress = false);
    }

    /// Stop the listening VNC viewer
    pub async fn stop_viewer_service(&self) {
        self.update(|state| state.establishment_in_progress = true);

        if let Err(e) = self.viewer.kill().await {
            tracing::debug!("Stopping VNC viewer service: {}", e);
        }
        self.refresh();
        self.report("VNC viewer service is stopped", Severity::Initializing);
        self.update(|state| state.establishment_in_progress = false);
    }
}
