//! Session command implementations
//!
//! Each command runs one orchestrator flow while printing status updates,
//! keeps an established session alive until it ends or the user interrupts,
//! and always tears the session down before returning.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::output::{print_info, print_status, print_success, print_warning};
use crate::runtime::wait_while_active;
use rscc_core::config::Supporter;
use rscc_core::{SessionKey, SessionStatus, Severity};
use rscc_session::{ConnectionEstablishmentState, ConnectionOrchestrator, SessionPhase};

/// Print status and key changes as they are published
fn spawn_status_printer(
    mut state: watch::Receiver<ConnectionEstablishmentState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_status = SessionStatus::default();
        let mut last_key = String::new();

        while state.changed().await.is_ok() {
            let (status, key) = {
                let snapshot = state.borrow_and_update();
                (snapshot.status.clone(), snapshot.key.clone())
            };

            if key != last_key && !key.is_empty() {
                print_success(&format!(
                    "Session key: {}",
                    rscc_core::key::format(&key)
                ));
            }
            last_key = key;

            if status != last_status && !status.text.is_empty() {
                print_status(&status);
                last_status = status;
            }
        }
    })
}

/// Run `flow`; on shutdown tear the session down and let the flow unwind.
///
/// Returns whether the user interrupted.
async fn run_flow<F>(
    orchestrator: &ConnectionOrchestrator,
    flow: F,
    shutdown: &CancellationToken,
) -> bool
where
    F: Future<Output = ()>,
{
    tokio::pin!(flow);

    let interrupted = tokio::select! {
        _ = &mut flow => false,
        _ = shutdown.cancelled() => true,
    };

    if interrupted {
        print_warning("Interrupted, closing the connection...");
        orchestrator.kill_connection().await;
        flow.await;
    }
    interrupted
}

/// Keep an active session open, then tear it down and report the outcome
async fn finish(
    orchestrator: &ConnectionOrchestrator,
    printer: JoinHandle<()>,
    interrupted: bool,
    shutdown: &CancellationToken,
) -> Result<()> {
    if !interrupted && orchestrator.state().phase() == SessionPhase::Active {
        print_info("Session is running. Press Ctrl+C to end it.");
        wait_while_active(orchestrator, shutdown).await;
    }

    let status = orchestrator.status();
    orchestrator.kill_connection().await;
    // Let the printer catch up before stopping it
    tokio::task::yield_now().await;
    printer.abort();

    // Stopping on request is not a failure
    if !interrupted && status.severity == Severity::Fail {
        anyhow::bail!("{}", status.text);
    }
    Ok(())
}

/// Share this desktop under a new key
pub async fn request_command(
    orchestrator: Arc<ConnectionOrchestrator>,
    shutdown: CancellationToken,
) -> Result<()> {
    let printer = spawn_status_printer(orchestrator.subscribe());
    print_info("Waiting for a viewer. Press Ctrl+C to stop sharing.");

    let interrupted = run_flow(&orchestrator, orchestrator.request_session(), &shutdown).await;
    finish(&orchestrator, printer, interrupted, &shutdown).await
}

/// Connect to the desktop shared under `key`
pub async fn join_command(
    orchestrator: Arc<ConnectionOrchestrator>,
    key: SessionKey,
    shutdown: CancellationToken,
) -> Result<()> {
    let printer = spawn_status_printer(orchestrator.subscribe());

    let interrupted =
        run_flow(&orchestrator, orchestrator.join_session(key), &shutdown).await;
    if !interrupted && !orchestrator.state().session_running {
        print_warning("The VNC viewer did not report a session");
    }
    finish(&orchestrator, printer, interrupted, &shutdown).await
}

/// Where a direct call goes
pub enum CallTarget {
    Address {
        address: String,
        port: Option<u16>,
        encrypted: bool,
    },
    Supporter(Supporter),
}

/// Connect the VNC server out to a listening supporter
pub async fn call_command(
    orchestrator: Arc<ConnectionOrchestrator>,
    target: CallTarget,
    shutdown: CancellationToken,
) -> Result<()> {
    let printer = spawn_status_printer(orchestrator.subscribe());

    let interrupted = match &target {
        CallTarget::Address {
            address,
            port,
            encrypted,
        } => {
            let flow = orchestrator.call_direct(address, *port, *encrypted);
            run_flow(&orchestrator, flow, &shutdown).await
        }
        CallTarget::Supporter(supporter) => {
            // Reject a broken entry before anything is started
            supporter.port_number()?;
            let flow = async {
                if let Err(e) = orchestrator.call_supporter(supporter).await {
                    tracing::error!("Cannot call supporter: {}", e);
                }
            };
            run_flow(&orchestrator, flow, &shutdown).await
        }
    };

    finish(&orchestrator, printer, interrupted, &shutdown).await
}

/// Run the VNC viewer as a listening service until interrupted
pub async fn listen_command(
    orchestrator: Arc<ConnectionOrchestrator>,
    shutdown: CancellationToken,
) -> Result<()> {
    let printer = spawn_status_printer(orchestrator.subscribe());

    orchestrator.start_viewer_service().await;
    let status = orchestrator.status();
    if status.severity == Severity::Success {
        print_info("Waiting for incoming connections. Press Ctrl+C to stop.");
        shutdown.cancelled().await;
    }

    orchestrator.stop_viewer_service().await;
    tokio::task::yield_now().await;
    printer.abort();

    if status.severity == Severity::Fail {
        anyhow::bail!("{}", status.text);
    }
    Ok(())
}
