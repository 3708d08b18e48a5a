//! Handshake helper
//!
//! The rendezvous and NAT traversal run in an external helper program. It
//! is started with the session role and traversal settings, and prints its
//! outcome as a single JSON object on the last line of stdout:
//!
//! ```text
//! {"peer_responded":true,"local_traversal_succeeded":false,"remote_traversal_succeeded":true}
//! ```

use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rscc_core::config::RsccConfig;
use rscc_core::traits::HandshakeService;
use rscc_core::{HandshakeOutcome, Role, ServiceError};

type HandshakeTask = JoinHandle<Result<HandshakeOutcome, ServiceError>>;

/// Runs the handshake helper for one session
pub struct HelperHandshake {
    program: String,
    args: Vec<String>,
    task: Mutex<Option<HandshakeTask>>,
    cancel: CancellationToken,
}

impl HelperHandshake {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            task: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Helper invocation for `role` using the traversal settings
    pub fn from_config(config: &RsccConfig, role: Role) -> Self {
        let traversal = &config.traversal;
        let args = vec![
            "--role".to_string(),
            role.to_string(),
            "--ice-port".to_string(),
            traversal.ice_port.to_string(),
            "--stun-port".to_string(),
            traversal.stun_server_port.to_string(),
            "--stun-servers".to_string(),
            traversal.stun_servers.join(";"),
            "--udp-package-size".to_string(),
            traversal.udp_package_size.to_string(),
        ];
        Self::new(config.programs.handshake.clone(), args)
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<HandshakeTask>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Parse the helper's stdout
pub fn parse_outcome(program: &str, stdout: &str) -> Result<HandshakeOutcome, ServiceError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ServiceError::MalformedOutput {
            program: program.to_string(),
            message: "no output".to_string(),
        })?;

    serde_json::from_str(line).map_err(|e| ServiceError::MalformedOutput {
        program: program.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl HandshakeService for HelperHandshake {
    async fn start(&self) -> Result<(), ServiceError> {
        let mut task = self.lock_task();
        if task.is_some() {
            tracing::warn!("Handshake already started");
            return Ok(());
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ServiceError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        tracing::debug!("Handshake helper started (pid {:?})", child.id());

        let program = self.program.clone();
        let cancel = self.cancel.clone();
        *task = Some(tokio::spawn(async move {
            // Dropping the child on cancellation kills it
            let output = tokio::select! {
                output = child.wait_with_output() => output?,
                _ = cancel.cancelled() => return Err(ServiceError::Closed("handshake")),
            };

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!("Handshake helper failed: {}", stderr.trim());
                return Err(ServiceError::Exited {
                    program,
                    code: output.status.code(),
                });
            }

            let outcome = parse_outcome(&program, &String::from_utf8_lossy(&output.stdout))?;
            tracing::info!(
                "Handshake finished: peer responded {}, local traversal {}, remote traversal {}",
                outcome.peer_responded,
                outcome.local_traversal_succeeded,
                outcome.remote_traversal_succeeded
            );
            Ok(outcome)
        }));
        Ok(())
    }

    async fn join(&self) -> Result<HandshakeOutcome, ServiceError> {
        let task = self
            .lock_task()
            .take()
            .ok_or(ServiceError::NotRunning("handshake"))?;

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ServiceError::Closed("handshake")),
            Err(e) => Err(ServiceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            ))),
        }
    }

    async fn close(&self) -> Result<(), ServiceError> {
        self.cancel.cancel();
        tracing::debug!("Handshake closed");
        Ok(())
    }
}
