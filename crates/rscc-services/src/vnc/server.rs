//! VNC server handler

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use rscc_core::config::RsccConfig;
use rscc_core::traits::RemoteDesktopServer;
use rscc_core::ServiceError;

use crate::process::ManagedProcess;

/// Settings for [`VncServerHandler`]
#[derive(Debug, Clone)]
pub struct VncServerSettings {
    /// Server executable
    pub program: String,
    /// Local port to listen on
    pub port: u16,
    /// A reverse connection that survives this long counts as established
    pub reverse_grace: Duration,
}

impl VncServerSettings {
    pub fn from_config(config: &RsccConfig) -> Self {
        Self {
            program: config.programs.vnc_server.clone(),
            port: config.vnc.port,
            reverse_grace: config.timing.reverse_connect_grace,
        }
    }

    fn listen_args(&self) -> Vec<String> {
        vec![
            "-localhost".to_string(),
            "-rfbport".to_string(),
            self.port.to_string(),
            "-forever".to_string(),
            "-nopw".to_string(),
        ]
    }

    fn reverse_args(&self, address: &str, port: u16, encrypted: bool) -> Vec<String> {
        let mut args = vec![
            "-connect_or_exit".to_string(),
            format!("{}:{}", address, port),
            "-nopw".to_string(),
        ];
        if encrypted {
            args.push("-ssl".to_string());
            args.push("ANON".to_string());
        }
        args
    }
}

/// Starts and stops the VNC server process
pub struct VncServerHandler {
    settings: VncServerSettings,
    process: Mutex<Option<ManagedProcess>>,
}

impl VncServerHandler {
    pub fn new(settings: VncServerSettings) -> Self {
        Self {
            settings,
            process: Mutex::new(None),
        }
    }

    fn take_process(&self) -> Option<ManagedProcess> {
        self.process
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    fn store_process(&self, process: ManagedProcess) {
        *self
            .process
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(process);
    }

    async fn replace_running(&self) {
        if let Some(old) = self.take_process() {
            if old.is_running() {
                tracing::info!("Stopping previous VNC server process");
                old.kill().await;
            }
        }
    }
}

#[async_trait]
impl RemoteDesktopServer for VncServerHandler {
    async fn start_listening(&self) -> Result<(), ServiceError> {
        self.replace_running().await;

        let process = ManagedProcess::spawn(
            "vnc-server",
            &self.settings.program,
            &self.settings.listen_args(),
            None,
        )?;
        tracing::info!(
            "VNC server listening on localhost:{} (pid {:?})",
            self.settings.port,
            process.pid()
        );
        self.store_process(process);
        Ok(())
    }

    async fn start_reverse(
        &self,
        address: &str,
        port: u16,
        encrypted: bool,
    ) -> Result<bool, ServiceError> {
        self.replace_running().await;

        tracing::info!(
            "VNC server connecting to {}:{} (encrypted: {})",
            address,
            port,
            encrypted
        );
        let process = ManagedProcess::spawn(
            "vnc-server",
            &self.settings.program,
            &self.settings.reverse_args(address, port, encrypted),
            None,
        )?;

        let established =
            match tokio::time::timeout(self.settings.reverse_grace, process.wait_exit()).await {
                Err(_) => true,
                Ok(code) => {
                    tracing::warn!(
                        "Reverse connection to {}:{} ended early (exit code {:?})",
                        address,
                        port,
                        code
                    );
                    false
                }
            };

        self.store_process(process);
        Ok(established)
    }

    async fn kill(&self) -> Result<(), ServiceError> {
        match self.take_process() {
            Some(process) => {
                process.kill().await;
                tracing::info!("VNC server stopped");
                Ok(())
            }
            None => Err(ServiceError::NotRunning("VNC server")),
        }
    }

    fn is_process_running(&self) -> bool {
        self.process
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(ManagedProcess::is_running)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> VncServerSettings {
        VncServerSettings {
            program: "x11vnc".to_string(),
            port: 5900,
            reverse_grace: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_listen_args_bind_localhost() {
        let args = settings().listen_args();
        assert!(args.contains(&"-localhost".to_string()));
        let port_flag = args.iter().position(|a| a == "-rfbport").unwrap();
        assert_eq!(args[port_flag + 1], "5900");
    }

    #[test]
    fn test_reverse_args() {
        let plain = settings().reverse_args("helpdesk.example.org", 5500, false);
        assert_eq!(plain[1], "helpdesk.example.org:5500");
        assert!(!plain.contains(&"-ssl".to_string()));

        let encrypted = settings().reverse_args("helpdesk.example.org", 5500, true);
        assert!(encrypted.contains(&"-ssl".to_string()));
    }
}
