//! Teardown and status publication tests

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use rscc_core::{Severity, StatusError};
use rscc_session::{ConnectionOrchestrator, SessionPhase};

use common::*;

#[tokio::test]
async fn test_kill_connection_when_idle() {
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::new(outcome(false, false, false)));
    let orchestrator = orchestrator(test_config(), runner.clone(), factory.clone());

    orchestrator.kill_connection().await;

    let commands = runner.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].script_name(), "port_stop.sh");
    assert_eq!(commands[0].args, [""]);
    assert!(orchestrator.key().is_empty());
    assert_eq!(factory.server.kill_calls.load(Ordering::SeqCst), 0);
    assert_eq!(factory.viewer.kill_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_kill_connection_is_idempotent() {
    let runner = Arc::new(RecordingRunner::failing(1));
    let factory = Arc::new(MockFactory::new(outcome(false, false, false)));
    let orchestrator = orchestrator(test_config(), runner.clone(), factory);

    orchestrator.kill_connection().await;
    orchestrator.kill_connection().await;

    assert_eq!(runner.script_names(), ["port_stop.sh", "port_stop.sh"]);
    assert_eq!(orchestrator.state().phase(), SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_kill_connection_stops_everything() {
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::new(outcome(true, true, true)));
    let orchestrator = orchestrator(test_config(), runner.clone(), factory.clone());

    orchestrator.request_session().await;
    assert_eq!(orchestrator.state().phase(), SessionPhase::Active);

    orchestrator.kill_connection().await;

    let state = orchestrator.state();
    assert!(state.key.is_empty());
    assert_eq!(state.relay, None);
    assert!(!state.server_process_running);
    assert_eq!(factory.server.kill_calls.load(Ordering::SeqCst), 1);
    assert_eq!(factory.relays()[0].close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        factory.last_handshake().unwrap().close_calls.load(Ordering::SeqCst),
        1
    );

    let stop = runner.commands().pop().unwrap();
    assert_eq!(stop.script_name(), "port_stop.sh");
    assert_eq!(stop.args, [SHARED_KEY]);

    // A second teardown finds nothing left to close
    orchestrator.kill_connection().await;
    assert_eq!(factory.server.kill_calls.load(Ordering::SeqCst), 1);
    assert_eq!(factory.relays()[0].close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_kill_connection_aborts_running_handshake() {
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::with_behavior(HandshakeBehavior::Hang));
    let orchestrator = Arc::new(orchestrator(test_config(), runner.clone(), factory.clone()));

    let flow = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.request_session().await }
    });

    // Wait until the flow is blocked on the handshake
    let mut state = orchestrator.subscribe();
    state
        .wait_for(|state| state.status.text == "Key generated")
        .await
        .unwrap();
    while factory.handshake_count() == 0 {
        tokio::task::yield_now().await;
    }

    orchestrator.kill_connection().await;
    flow.await.unwrap();

    // An abort is not a failure and revokes the key only once
    let state = orchestrator.state();
    assert!(!state.establishment_in_progress);
    assert_ne!(state.status.severity, Severity::Fail);
    assert!(state.key.is_empty());
    assert_eq!(state.phase(), SessionPhase::Idle);
    assert_eq!(factory.server.listen_calls.load(Ordering::SeqCst), 0);
    assert_eq!(runner.script_names(), ["use.sh", "port_share.sh", "port_stop.sh"]);
    assert_eq!(runner.commands()[2].args, [SHARED_KEY]);
}

#[tokio::test(start_paused = true)]
async fn test_kill_connection_during_settle_delay_stops_request() {
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::new(outcome(true, true, true)));
    let orchestrator = Arc::new(orchestrator(test_config(), runner, factory.clone()));

    let flow = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.request_session().await }
    });

    // The flow is parked in the settle delay once the server listens
    while factory.server.listen_calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    orchestrator.kill_connection().await;
    flow.await.unwrap();

    let state = orchestrator.state();
    assert!(factory.relays().is_empty());
    assert_eq!(state.relay, None);
    assert!(state.key.is_empty());
    assert!(!state.server_process_running);
    assert_ne!(state.status.text, "VNC server waits for incoming connection");
    assert_eq!(state.phase(), SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_kill_connection_during_handshake_stops_join() {
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::with_behavior(HandshakeBehavior::Hang));
    let orchestrator = Arc::new(orchestrator(test_config(), runner, factory.clone()));

    let key = rscc_core::SessionKey::parse("987654321").unwrap();
    let flow = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.join_session(key).await }
    });

    while factory.handshake_count() == 0 {
        tokio::task::yield_now().await;
    }

    orchestrator.kill_connection().await;
    flow.await.unwrap();

    let state = orchestrator.state();
    assert!(factory.viewer.connect_calls.lock().unwrap().is_empty());
    assert!(!state.viewer_process_running);
    assert!(factory.relays().is_empty());
    assert!(!state.establishment_in_progress);
    assert_ne!(state.status.text, "Starting VNC viewer...");
    assert_eq!(state.phase(), SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_kill_connection_stops_viewer_retries() {
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::new(outcome(true, false, false)));
    let orchestrator = Arc::new(orchestrator(test_config(), runner, factory.clone()));

    let key = rscc_core::SessionKey::parse("987654321").unwrap();
    let flow = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.join_session(key).await }
    });

    while factory.viewer.connect_calls.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }

    orchestrator.kill_connection().await;
    flow.await.unwrap();

    assert_eq!(factory.viewer.connect_calls.lock().unwrap().len(), 1);
    assert!(!factory.viewer.running.load(Ordering::SeqCst));
    assert!(!orchestrator.state().establishment_in_progress);
}

#[tokio::test]
async fn test_kill_connection_after_failed_share_is_idle() {
    let runner = Arc::new(RecordingRunner::failing(1));
    let factory = Arc::new(MockFactory::new(outcome(false, false, false)));
    let orchestrator = orchestrator(test_config(), runner, factory);

    orchestrator.request_session().await;
    assert!(orchestrator.state().establishment_in_progress);
    assert_eq!(orchestrator.state().phase(), SessionPhase::Establishing);

    orchestrator.kill_connection().await;

    let state = orchestrator.state();
    assert!(state.establishment_in_progress);
    assert_eq!(state.phase(), SessionPhase::Idle);
}

#[test]
fn test_set_status_bounds() {
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::new(outcome(false, false, false)));
    let orchestrator = orchestrator(test_config(), runner, factory);

    for index in 0..=3 {
        orchestrator.set_status(Some("ok"), index).unwrap();
        assert_eq!(orchestrator.status().severity.index() as i64, index);
    }

    assert!(matches!(
        orchestrator.set_status(Some("bad"), -1),
        Err(StatusError::SeverityOutOfRange(-1))
    ));
    assert!(matches!(
        orchestrator.set_status(Some("bad"), 4),
        Err(StatusError::SeverityOutOfRange(4))
    ));
    assert!(matches!(
        orchestrator.set_status(None, 1),
        Err(StatusError::MissingText)
    ));
    // Rejected calls leave the status untouched
    assert_eq!(orchestrator.status().text, "ok");
    assert_eq!(orchestrator.status().severity, Severity::Fail);
}

#[test]
fn test_subscribers_see_status_before_return() {
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::new(outcome(false, false, false)));
    let orchestrator = orchestrator(test_config(), runner, factory);

    let mut receiver = orchestrator.subscribe();
    orchestrator.set_status(Some("Requesting key from server..."), 1).unwrap();

    assert!(receiver.has_changed().unwrap());
    let state = receiver.borrow_and_update();
    assert_eq!(state.status.text, "Requesting key from server...");
    assert_eq!(state.status.severity.style_class(), "statusBoxInitialize");
}

#[test]
fn test_new_rejects_invalid_config() {
    let mut config = test_config();
    config.timing.connect_attempts = 0;
    let runner = Arc::new(RecordingRunner::succeeding());
    let factory = Arc::new(MockFactory::new(outcome(false, false, false)));

    assert!(ConnectionOrchestrator::new(config, runner, factory).is_err());
}
