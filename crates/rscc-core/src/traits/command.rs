//! Command runner trait

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::scripts::ScriptCommand;

/// Exit code and captured stdout of a finished command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
}

impl CommandOutput {
    /// Whether the command exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command to completion.
///
/// Calls for one session are made sequentially, never concurrently.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` and wait for it to exit
    async fn run(&self, command: &ScriptCommand) -> Result<CommandOutput, ServiceError>;
}
