//! Recording mocks for the orchestrator's collaborators

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rscc_core::config::RsccConfig;
use rscc_core::scripts::ScriptCommand;
use rscc_core::traits::{
    CommandOutput, CommandRunner, HandshakeService, RelayService, RemoteDesktopServer,
    RemoteDesktopViewer, ServiceFactory,
};
use rscc_core::{HandshakeOutcome, RelayInitiator, RelayMode, Role, ServiceError};
use rscc_session::ConnectionOrchestrator;

pub const SHARED_KEY: &str = "123456789";

/// Config pointing the scripts at a fixed directory
pub fn test_config() -> RsccConfig {
    let mut config = RsccConfig::default();
    config.programs.scripts_dir = PathBuf::from("/opt/rscc/scripts");
    config
}

/// Runner that records every command and answers per script name
#[derive(Default)]
pub struct RecordingRunner {
    responses: Mutex<HashMap<String, CommandOutput>>,
    default_exit_code: i32,
    commands: Mutex<Vec<ScriptCommand>>,
}

impl RecordingRunner {
    /// Every script succeeds; `port_share.sh` prints [`SHARED_KEY`]
    pub fn succeeding() -> Self {
        let runner = Self::default();
        runner.respond("port_share.sh", 0, &format!("{}\n", SHARED_KEY));
        runner
    }

    /// Every script exits with `code`
    pub fn failing(code: i32) -> Self {
        Self {
            default_exit_code: code,
            ..Self::default()
        }
    }

    pub fn respond(&self, script: &str, exit_code: i32, stdout: &str) {
        self.responses.lock().unwrap().insert(
            script.to_string(),
            CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
            },
        );
    }

    pub fn commands(&self) -> Vec<ScriptCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn script_names(&self) -> Vec<String> {
        self.commands().iter().map(ScriptCommand::script_name).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &ScriptCommand) -> Result<CommandOutput, ServiceError> {
        self.commands.lock().unwrap().push(command.clone());
        let response = self.responses.lock().unwrap().get(&command.script_name()).cloned();
        Ok(response.unwrap_or(CommandOutput {
            exit_code: self.default_exit_code,
            stdout: String::new(),
        }))
    }
}

/// What a mock handshake does when joined
#[derive(Clone)]
pub enum HandshakeBehavior {
    Finish(HandshakeOutcome),
    Fail,
    /// Never finishes on its own; only `close` ends it
    Hang,
}

pub struct MockHandshake {
    behavior: HandshakeBehavior,
    closed: tokio::sync::watch::Sender<bool>,
    pub started: AtomicBool,
    pub close_calls: AtomicUsize,
}

impl MockHandshake {
    fn new(behavior: HandshakeBehavior) -> Self {
        let (closed, _) = tokio::sync::watch::channel(false);
        Self {
            behavior,
            closed,
            started: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl HandshakeService for MockHandshake {
    async fn start(&self) -> Result<(), ServiceError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn join(&self) -> Result<HandshakeOutcome, ServiceError> {
        match &self.behavior {
            HandshakeBehavior::Finish(outcome) => Ok(*outcome),
            HandshakeBehavior::Fail => Err(ServiceError::Exited {
                program: "rscc-handshake".to_string(),
                code: Some(1),
            }),
            HandshakeBehavior::Hang => {
                let mut closed = self.closed.subscribe();
                let _ = closed.wait_for(|closed| *closed).await;
                Err(ServiceError::Closed("handshake"))
            }
        }
    }

    async fn close(&self) -> Result<(), ServiceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.send_replace(true);
        Ok(())
    }
}

pub struct MockRelay {
    pub mode: RelayMode,
    pub initiator: RelayInitiator,
    fail_start: bool,
    pub started: AtomicBool,
    pub close_calls: AtomicUsize,
}

#[async_trait]
impl RelayService for MockRelay {
    async fn start(&self) -> Result<(), ServiceError> {
        if self.fail_start {
            return Err(ServiceError::Exited {
                program: "rscc-relay".to_string(),
                code: Some(1),
            });
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn proxy_port(&self) -> u16 {
        2601
    }

    async fn close(&self) -> Result<(), ServiceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockServer {
    pub running: AtomicBool,
    pub listen_calls: AtomicUsize,
    pub kill_calls: AtomicUsize,
    pub reverse_calls: Mutex<Vec<(String, u16, bool)>>,
    pub reverse_result: AtomicBool,
}

#[async_trait]
impl RemoteDesktopServer for MockServer {
    async fn start_listening(&self) -> Result<(), ServiceError> {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn start_reverse(
        &self,
        address: &str,
        port: u16,
        encrypted: bool,
    ) -> Result<bool, ServiceError> {
        self.reverse_calls
            .lock()
            .unwrap()
            .push((address.to_string(), port, encrypted));
        let connected = self.reverse_result.load(Ordering::SeqCst);
        self.running.store(connected, Ordering::SeqCst);
        Ok(connected)
    }

    async fn kill(&self) -> Result<(), ServiceError> {
        self.kill_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_process_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Viewer whose session comes up on a given connect attempt
#[derive(Default)]
pub struct MockViewer {
    /// Attempt that establishes the session; `0` never connects
    pub connect_on_attempt: AtomicUsize,
    pub connect_calls: Mutex<Vec<(String, u16)>>,
    pub listen_calls: AtomicUsize,
    pub kill_calls: AtomicUsize,
    pub running: AtomicBool,
    pub session: AtomicBool,
}

#[async_trait]
impl RemoteDesktopViewer for MockViewer {
    async fn start_listening(&self) -> Result<(), ServiceError> {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn start_connecting(&self, host: &str, port: u16) -> Result<(), ServiceError> {
        let mut calls = self.connect_calls.lock().unwrap();
        calls.push((host.to_string(), port));
        self.running.store(true, Ordering::SeqCst);
        let target = self.connect_on_attempt.load(Ordering::SeqCst);
        if target != 0 && calls.len() >= target {
            self.session.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn kill(&self) -> Result<(), ServiceError> {
        self.kill_calls.fetch_add(1, Ordering::SeqCst);
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::NotRunning("VNC viewer"));
        }
        self.session.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_process_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_session_running(&self) -> bool {
        self.session.load(Ordering::SeqCst)
    }
}

/// Factory handing out mocks and remembering what it created
pub struct MockFactory {
    pub handshake_behavior: Mutex<HandshakeBehavior>,
    pub fail_relay_start: AtomicBool,
    pub server: Arc<MockServer>,
    pub viewer: Arc<MockViewer>,
    pub handshakes: Mutex<Vec<(Role, Arc<MockHandshake>)>>,
    pub relays: Mutex<Vec<Arc<MockRelay>>>,
}

impl MockFactory {
    pub fn new(outcome: HandshakeOutcome) -> Self {
        Self::with_behavior(HandshakeBehavior::Finish(outcome))
    }

    pub fn with_behavior(behavior: HandshakeBehavior) -> Self {
        Self {
            handshake_behavior: Mutex::new(behavior),
            fail_relay_start: AtomicBool::new(false),
            server: Arc::new(MockServer::default()),
            viewer: Arc::new(MockViewer::default()),
            handshakes: Mutex::new(Vec::new()),
            relays: Mutex::new(Vec::new()),
        }
    }

    pub fn handshake_count(&self) -> usize {
        self.handshakes.lock().unwrap().len()
    }

    pub fn last_handshake(&self) -> Option<Arc<MockHandshake>> {
        self.handshakes.lock().unwrap().last().map(|(_, h)| h.clone())
    }

    pub fn relays(&self) -> Vec<Arc<MockRelay>> {
        self.relays.lock().unwrap().clone()
    }
}

impl ServiceFactory for MockFactory {
    fn handshake(&self, role: Role) -> Arc<dyn HandshakeService> {
        let behavior = self.handshake_behavior.lock().unwrap().clone();
        let handshake = Arc::new(MockHandshake::new(behavior));
        self.handshakes.lock().unwrap().push((role, handshake.clone()));
        handshake
    }

    fn relay(&self, mode: RelayMode, initiator: RelayInitiator) -> Arc<dyn RelayService> {
        let relay = Arc::new(MockRelay {
            mode,
            initiator,
            fail_start: self.fail_relay_start.load(Ordering::SeqCst),
            started: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        });
        self.relays.lock().unwrap().push(relay.clone());
        relay
    }

    fn server(&self) -> Arc<dyn RemoteDesktopServer> {
        self.server.clone()
    }

    fn viewer(&self) -> Arc<dyn RemoteDesktopViewer> {
        self.viewer.clone()
    }
}

pub fn outcome(peer: bool, local: bool, remote: bool) -> HandshakeOutcome {
    HandshakeOutcome {
        peer_responded: peer,
        local_traversal_succeeded: local,
        remote_traversal_succeeded: remote,
    }
}

/// Orchestrator wired to the given mocks
pub fn orchestrator(
    config: RsccConfig,
    runner: Arc<RecordingRunner>,
    factory: Arc<MockFactory>,
) -> ConnectionOrchestrator {
    ConnectionOrchestrator::new(config, runner, factory).unwrap()
}
