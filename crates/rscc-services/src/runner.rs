//! Shell command runner

use async_trait::async_trait;
use tokio::process::Command;

use rscc_core::scripts::ScriptCommand;
use rscc_core::traits::{CommandOutput, CommandRunner};
use rscc_core::ServiceError;

/// Runs key-server scripts as child processes and captures their stdout
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner;

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &ScriptCommand) -> Result<CommandOutput, ServiceError> {
        tracing::debug!("Running {}", command);

        let output = Command::new(&command.program)
            .args(&command.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ServiceError::Spawn {
                program: command.program.display().to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!("{} stderr: {}", command.script_name(), stderr.trim());
        }

        Ok(CommandOutput {
            // Killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
