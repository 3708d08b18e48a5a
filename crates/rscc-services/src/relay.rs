//! Relay helper
//!
//! The relay forwards the VNC stream over the traversed UDP path. It is a
//! long-running helper: it stays up until killed.

use std::sync::Mutex;

use async_trait::async_trait;

use rscc_core::config::RsccConfig;
use rscc_core::traits::RelayService;
use rscc_core::{RelayInitiator, RelayMode, ServiceError};

use crate::process::ManagedProcess;

/// Runs the relay helper for one session
pub struct HelperRelay {
    program: String,
    args: Vec<String>,
    proxy_port: u16,
    process: Mutex<Option<ManagedProcess>>,
}

impl HelperRelay {
    pub fn new(program: impl Into<String>, args: Vec<String>, proxy_port: u16) -> Self {
        Self {
            program: program.into(),
            args,
            proxy_port,
            process: Mutex::new(None),
        }
    }

    pub fn from_config(config: &RsccConfig, mode: RelayMode, initiator: RelayInitiator) -> Self {
        let traversal = &config.traversal;
        let args = vec![
            "--mode".to_string(),
            mode.to_string(),
            "--initiator".to_string(),
            initiator.to_string(),
            "--proxy-port".to_string(),
            traversal.proxy_port.to_string(),
            "--vnc-port".to_string(),
            config.vnc.port.to_string(),
            "--ice-port".to_string(),
            traversal.ice_port.to_string(),
            "--udp-package-size".to_string(),
            traversal.udp_package_size.to_string(),
        ];
        Self::new(config.programs.relay.clone(), args, traversal.proxy_port)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ManagedProcess>> {
        self.process.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RelayService for HelperRelay {
    async fn start(&self) -> Result<(), ServiceError> {
        let mut process = self.lock();
        if process.as_ref().map(ManagedProcess::is_running).unwrap_or(false) {
            return Ok(());
        }
        let spawned = ManagedProcess::spawn("relay", &self.program, &self.args, None)?;
        tracing::info!(
            "Relay started on proxy port {} (pid {:?})",
            self.proxy_port,
            spawned.pid()
        );
        *process = Some(spawned);
        Ok(())
    }

    fn proxy_port(&self) -> u16 {
        self.proxy_port
    }

    async fn close(&self) -> Result<(), ServiceError> {
        let process = self.lock().take();
        if let Some(process) = process {
            process.kill().await;
            tracing::info!("Relay stopped");
        }
        Ok(())
    }
}
