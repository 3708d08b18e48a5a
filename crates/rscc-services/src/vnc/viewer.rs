//! VNC viewer handler

use std::sync::Mutex;

use async_trait::async_trait;

use rscc_core::config::RsccConfig;
use rscc_core::traits::RemoteDesktopViewer;
use rscc_core::ServiceError;

use crate::process::ManagedProcess;

/// Settings for [`VncViewerHandler`]
#[derive(Debug, Clone)]
pub struct VncViewerSettings {
    /// Viewer executable
    pub program: String,
    /// Output line that signals an established session
    pub connected_marker: String,
    pub view_only: bool,
    pub bgr233: bool,
    pub compression: u8,
    pub quality: u8,
}

impl VncViewerSettings {
    pub fn from_config(config: &RsccConfig) -> Self {
        Self {
            program: config.programs.vnc_viewer.clone(),
            connected_marker: config.programs.viewer_connected_marker.clone(),
            view_only: config.vnc.view_only,
            bgr233: config.vnc.bgr233,
            compression: config.vnc.compression,
            quality: config.vnc.quality,
        }
    }

    fn rendering_args(&self) -> Vec<String> {
        let mut args = vec![
            "-compresslevel".to_string(),
            self.compression.to_string(),
            "-quality".to_string(),
            self.quality.to_string(),
        ];
        if self.view_only {
            args.push("-viewonly".to_string());
        }
        if self.bgr233 {
            args.push("-bgr233".to_string());
        }
        args
    }

    fn listen_args(&self) -> Vec<String> {
        let mut args = self.rendering_args();
        args.push("-listen".to_string());
        args
    }

    fn connect_args(&self, host: &str, port: u16) -> Vec<String> {
        let mut args = self.rendering_args();
        // Double colon: raw TCP port rather than display number
        args.push(format!("{}::{}", host, port));
        args
    }
}

/// Starts and stops the VNC viewer process
pub struct VncViewerHandler {
    settings: VncViewerSettings,
    process: Mutex<Option<ManagedProcess>>,
}

impl VncViewerHandler {
    pub fn new(settings: VncViewerSettings) -> Self {
        Self {
            settings,
            process: Mutex::new(None),
        }
    }

    fn with_process<T>(&self, f: impl FnOnce(Option<&ManagedProcess>) -> T) -> T {
        let guard = self
            .process
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(guard.as_ref())
    }

    fn take_process(&self) -> Option<ManagedProcess> {
        self.process
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    fn spawn(&self, args: Vec<String>) -> Result<(), ServiceError> {
        let process = ManagedProcess::spawn(
            "vnc-viewer",
            &self.settings.program,
            &args,
            Some(self.settings.connected_marker.clone()),
        )?;
        *self
            .process
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(process);
        Ok(())
    }
}

#[async_trait]
impl RemoteDesktopViewer for VncViewerHandler {
    async fn start_listening(&self) -> Result<(), ServiceError> {
        if let Some(old) = self.take_process() {
            old.kill().await;
        }
        self.spawn(self.settings.listen_args())?;
        tracing::info!("VNC viewer listening for reverse connections");
        Ok(())
    }

    async fn start_connecting(&self, host: &str, port: u16) -> Result<(), ServiceError> {
        if self.is_process_running() {
            // Previous attempt is still negotiating
            tracing::debug!("VNC viewer already running, not starting another");
            return Ok(());
        }
        tracing::info!("VNC viewer connecting to {}:{}", host, port);
        self.spawn(self.settings.connect_args(host, port))
    }

    async fn kill(&self) -> Result<(), ServiceError> {
        match self.take_process() {
            Some(process) => {
                process.kill().await;
                tracing::info!("VNC viewer stopped");
                Ok(())
            }
            None => Err(ServiceError::NotRunning("VNC viewer")),
        }
    }

    fn is_process_running(&self) -> bool {
        self.with_process(|p| p.map(ManagedProcess::is_running).unwrap_or(false))
    }

    fn is_session_running(&self) -> bool {
        self.with_process(|p| p.map(ManagedProcess::marker_seen).unwrap_or(false))
    }
}
