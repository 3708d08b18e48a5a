//! Connection orchestrator
//!
//! The [`ConnectionOrchestrator`] owns the state of the one active session and
//! is the only component that mutates it. Flows and teardown live in
//! [`crate::flows`] and [`crate::teardown`]; this module holds the shared
//! plumbing they build on.
//!
//! # State publication
//!
//! Every change is published through a `tokio::sync::watch` channel before
//! the mutating call returns. Observers call [`ConnectionOrchestrator::subscribe`]
//! and await changes instead of polling.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use rscc_core::config::RsccConfig;
use rscc_core::scripts::{KeyServerScripts, ScriptCommand};
use rscc_core::traits::{
    CommandOutput, CommandRunner, HandshakeService, RelayService, RemoteDesktopServer,
    RemoteDesktopViewer, ServiceFactory,
};
use rscc_core::{
    ConfigError, FallbackDecision, HandshakeOutcome, Role, ServiceError, SessionStatus, Severity,
    StatusError,
};

use crate::fallback::select_tier;
use crate::state::ConnectionEstablishmentState;

/// Per-session service instances that teardown has to close
#[derive(Default)]
pub(crate) struct SessionResources {
    pub(crate) handshake: Option<Arc<dyn HandshakeService>>,
    pub(crate) relay: Option<Arc<dyn RelayService>>,
    /// Cancelled by teardown, then replaced for the next session
    pub(crate) abort: CancellationToken,
}

/// Error out once teardown has cancelled `abort`
pub(crate) fn ensure_live(abort: &CancellationToken) -> Result<(), ServiceError> {
    if abort.is_cancelled() {
        Err(ServiceError::Closed("session"))
    } else {
        Ok(())
    }
}

/// Drives session establishment for both roles.
///
/// Public entry points run to completion and report their outcome through
/// [`SessionStatus`]; none of them returns an error except for invalid
/// arguments. [`ConnectionOrchestrator::kill_connection`] may be called at
/// any time, including while another flow is still running.
pub struct ConnectionOrchestrator {
    pub(crate) config: RsccConfig,
    pub(crate) scripts: KeyServerScripts,
    runner: Arc<dyn CommandRunner>,
    services: Arc<dyn ServiceFactory>,
    pub(crate) server: Arc<dyn RemoteDesktopServer>,
    pub(crate) viewer: Arc<dyn RemoteDesktopViewer>,
    resources: Mutex<SessionResources>,
    state: watch::Sender<ConnectionEstablishmentState>,
}

impl ConnectionOrchestrator {
    /// Create an orchestrator; rejects configuration it cannot work with
    pub fn new(
        config: RsccConfig,
        runner: Arc<dyn CommandRunner>,
        services: Arc<dyn ServiceFactory>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let scripts = KeyServerScripts::from_config(&config);
        let server = services.server();
        let viewer = services.viewer();
        let (state, _) = watch::channel(ConnectionEstablishmentState::default());

        Ok(Self {
            config,
            scripts,
            runner,
            services,
            server,
            viewer,
            resources: Mutex::new(SessionResources::default()),
            state,
        })
    }

    pub fn config(&self) -> &RsccConfig {
        &self.config
    }

    /// Receiver of state snapshots
    pub fn subscribe(&self) -> watch::Receiver<ConnectionEstablishmentState> {
        self.state.subscribe()
    }

    /// Current state snapshot
    pub fn state(&self) -> ConnectionEstablishmentState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status.clone()
    }

    /// Current session key, empty when none is assigned
    pub fn key(&self) -> String {
        self.state.borrow().key.clone()
    }

    /// Replace the status from untyped parts.
    ///
    /// Rejects a missing text or a severity index outside `0..=3`.
    pub fn set_status(&self, text: Option<&str>, severity_index: i64) -> Result<(), StatusError> {
        let status = SessionStatus::from_parts(text, severity_index)?;
        self.publish_status(status);
        Ok(())
    }

    pub(crate) fn report(&self, text: impl Into<String>, severity: Severity) {
        self.publish_status(SessionStatus::new(text, severity));
    }

    fn publish_status(&self, status: SessionStatus) {
        tracing::debug!("Status: {}", status);
        self.state.send_modify(|state| state.status = status);
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut ConnectionEstablishmentState)) {
        self.state.send_modify(f);
    }

    /// Copy the process flags reported by the server and viewer into the state
    pub fn refresh(&self) {
        let server_running = self.server.is_process_running();
        let viewer_running = self.viewer.is_process_running();
        let session_running = self.viewer.is_session_running();

        self.state.send_if_modified(|state| {
            let changed = state.server_process_running != server_running
                || state.viewer_process_running != viewer_running
                || state.session_running != session_running;
            state.server_process_running = server_running;
            state.viewer_process_running = viewer_running;
            state.session_running = session_running;
            changed
        });
    }

    pub(crate) fn lock_resources(&self) -> MutexGuard<'_, SessionResources> {
        self.resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Token a flow checks to notice a teardown that happened after it started
    pub(crate) fn session_token(&self) -> CancellationToken {
        self.lock_resources().abort.clone()
    }

    /// End a flow that teardown has aborted
    pub(crate) fn abandon(&self, flow: &str) {
        tracing::info!("{} aborted by teardown", flow);
        self.update(|state| state.establishment_in_progress = false);
    }

    /// Run a key-server script; failures are logged and yield `None`
    pub(crate) async fn run_script(&self, command: &ScriptCommand) -> Option<CommandOutput> {
        match self.runner.run(command).await {
            Ok(output) if output.success() => Some(output),
            Ok(output) => {
                tracing::error!(
                    "Command failed: {} (exit code {})",
                    command,
                    output.exit_code
                );
                None
            }
            Err(e) => {
                tracing::error!("Command failed: {}: {}", command, e);
                None
            }
        }
    }

    /// Point the scripts at the key server.
    ///
    /// A failure is only logged; the calling flow carries on.
    pub(crate) async fn setup_key_server(&self) {
        if self.run_script(&self.scripts.setup()).await.is_some() {
            self.update(|state| state.key_server_connected = true);
        }
    }

    /// Start a fresh handshake for `role` and wait for its outcome
    pub(crate) async fn run_handshake(
        &self,
        role: Role,
        abort: &CancellationToken,
    ) -> Result<HandshakeOutcome, ServiceError> {
        let handshake = self.services.handshake(role);
        let previous = {
            let mut resources = self.lock_resources();
            ensure_live(abort)?;
            resources.handshake.replace(handshake.clone())
        };
        if let Some(previous) = previous {
            tracing::warn!("Previous handshake was not torn down, closing it");
            if let Err(e) = previous.close().await {
                tracing::warn!("Failed to close previous handshake: {}", e);
            }
        }

        tracing::info!("Starting {} handshake", role);
        handshake.start().await?;

        let outcome = match self.config.timing.handshake_timeout {
            Some(limit) => match tokio::time::timeout(limit, handshake.join()).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!("Handshake did not finish within {:?}", limit);
                    if let Err(e) = handshake.close().await {
                        tracing::warn!("Failed to close handshake: {}", e);
                    }
                    return Err(ServiceError::Timeout("handshake"));
                }
            },
            None => handshake.join().await?,
        };
        ensure_live(abort)?;

        self.update(|state| state.apply_outcome(&outcome));
        Ok(outcome)
    }

    /// Relay tier for `role`, honoring forced server mode
    pub(crate) fn decide_tier(&self, role: Role, outcome: &HandshakeOutcome) -> FallbackDecision {
        if self.config.forcing_server_mode {
            tracing::debug!("Server mode forced, not using a relay");
            return FallbackDecision::NoRelay;
        }
        select_tier(
            role,
            outcome.local_traversal_succeeded,
            outcome.remote_traversal_succeeded,
        )
    }

    /// Start the relay `decision` asks for.
    ///
    /// Returns the relay's local proxy port, or `None` for [`FallbackDecision::NoRelay`].
    /// A relay that finishes starting after teardown is closed again.
    pub(crate) async fn start_relay(
        &self,
        decision: FallbackDecision,
        abort: &CancellationToken,
    ) -> Result<Option<u16>, ServiceError> {
        ensure_live(abort)?;
        let Some((mode, initiator)) = decision.relay() else {
            tracing::info!("No relay needed, using the key server forwarded port");
            return Ok(None);
        };

        let relay = self.services.relay(mode, initiator);
        let previous = {
            let mut resources = self.lock_resources();
            ensure_live(abort)?;
            resources.relay.replace(relay.clone())
        };
        if let Some(previous) = previous {
            tracing::warn!("Previous relay was not torn down, closing it");
            if let Err(e) = previous.close().await {
                tracing::warn!("Failed to close previous relay: {}", e);
            }
        }

        tracing::info!("Starting relay: {}", decision);
        relay.start().await?;
        if abort.is_cancelled() {
            if let Err(e) = relay.close().await {
                tracing::warn!("Failed to close relay: {}", e);
            }
            return Err(ServiceError::Closed("session"));
        }
        self.update(|state| state.relay = Some(decision));
        Ok(Some(relay.proxy_port()))
    }
}
