//! Supervised child processes
//!
//! A [`ManagedProcess`] owns a spawned child, forwards its output to the
//! log, tracks whether it is still alive and whether a marker line has been
//! printed. Dropping the handle kills the child.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use rscc_core::ServiceError;

/// A running child process
pub struct ManagedProcess {
    /// Short name used in log lines
    name: &'static str,
    /// OS process id, if the platform reported one
    pid: Option<u32>,
    /// True until the child has exited
    running: watch::Receiver<bool>,
    /// True once a line containing the marker has been printed
    marker: watch::Receiver<bool>,
    /// Exit code once the child has exited (`None` inside when killed by a signal)
    exit: watch::Receiver<Option<Option<i32>>>,
    /// Kills the child when cancelled
    cancel: CancellationToken,
}

impl ManagedProcess {
    /// Spawn `program` with `args`.
    ///
    /// When `marker` is given, any stdout/stderr line containing it flips
    /// [`ManagedProcess::marker_seen`] to true.
    pub fn spawn(
        name: &'static str,
        program: &str,
        args: &[String],
        marker: Option<String>,
    ) -> Result<Self, ServiceError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ServiceError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let pid = child.id();
        tracing::debug!("Started {} ({}) with pid {:?}", name, program, pid);

        let (running_tx, running_rx) = watch::channel(true);
        let (marker_tx, marker_rx) = watch::channel(false);
        let (exit_tx, exit_rx) = watch::channel(None);
        let marker_tx = Arc::new(marker_tx);
        let marker = marker.map(Arc::new);
        let cancel = CancellationToken::new();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(watch_output(name, stdout, marker.clone(), marker_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(watch_output(name, stderr, marker.clone(), marker_tx.clone()));
        }

        let supervisor_cancel = cancel.clone();
        tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = supervisor_cancel.cancelled() => None,
            };
            let status = match exited {
                Some(status) => status,
                None => {
                    tracing::debug!("Killing {}", name);
                    if let Err(e) = child.start_kill() {
                        tracing::warn!("Failed to signal {}: {}", name, e);
                    }
                    child.wait().await
                }
            };

            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!("Failed to reap {}: {}", name, e);
                    None
                }
            };
            tracing::debug!("{} exited with code {:?}", name, code);

            marker_tx.send_replace(false);
            exit_tx.send_replace(Some(code));
            running_tx.send_replace(false);
        });

        Ok(Self {
            name,
            pid,
            running: running_rx,
            marker: marker_rx,
            exit: exit_rx,
            cancel,
        })
    }

    /// Short name of the process
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// OS process id
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the child is still alive
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Whether the marker has been printed and the child is still alive
    pub fn marker_seen(&self) -> bool {
        // Output may still be drained after the exit was published
        *self.marker.borrow() && self.is_running()
    }

    /// Receiver that follows [`ManagedProcess::marker_seen`]
    pub fn subscribe_marker(&self) -> watch::Receiver<bool> {
        self.marker.clone()
    }

    /// Wait for the child to exit and return its exit code
    pub async fn wait_exit(&self) -> Option<i32> {
        let mut exit = self.exit.clone();
        let code = match exit.wait_for(|code| code.is_some()).await {
            Ok(code) => (*code).flatten(),
            Err(_) => None,
        };
        code
    }

    /// Kill the child and wait until it has been reaped
    pub async fn kill(&self) {
        self.cancel.cancel();
        let mut running = self.running.clone();
        // The supervisor drops the sender only after publishing `false`
        let _ = running.wait_for(|alive| !*alive).await;
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn watch_output<R>(
    name: &'static str,
    stream: R,
    marker: Option<Arc<String>>,
    marker_tx: Arc<watch::Sender<bool>>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::trace!("[{}] {}", name, line);
                if let Some(marker) = &marker {
                    if line.contains(marker.as_str()) {
                        tracing::debug!("{} reported: {}", name, line);
                        marker_tx.send_replace(true);
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped reading {} output: {}", name, e);
                break;
            }
        }
    }
}
