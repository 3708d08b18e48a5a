//! Key-server script invocations
//!
//! The key server is driven through shell scripts that live in the scripts
//! directory. Each invocation is a program path plus plain string arguments.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::RsccConfig;

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ScriptCommand {
    /// Build a command for `script` inside `dir`
    pub fn new(dir: &Path, script: &str, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: dir.join(script),
            args: args.into_iter().collect(),
        }
    }

    /// File name of the script, used in log lines
    pub fn script_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Builds the four key-server commands from configuration
#[derive(Debug, Clone)]
pub struct KeyServerScripts {
    dir: PathBuf,
    setup: String,
    share: String,
    connect: String,
    stop: String,
    key_server_ip: String,
    key_server_http_port: String,
    vnc_port: u16,
}

impl KeyServerScripts {
    pub fn from_config(config: &RsccConfig) -> Self {
        Self {
            dir: config.programs.scripts_dir.clone(),
            setup: config.programs.setup_script.clone(),
            share: config.programs.share_script.clone(),
            connect: config.programs.connect_script.clone(),
            stop: config.programs.stop_script.clone(),
            key_server_ip: config.key_server.ip.clone(),
            key_server_http_port: config.key_server.http_port.clone(),
            vnc_port: config.vnc.port,
        }
    }

    /// Configure the connection to the key server
    pub fn setup(&self) -> ScriptCommand {
        ScriptCommand::new(
            &self.dir,
            &self.setup,
            [self.key_server_ip.clone(), self.key_server_http_port.clone()],
        )
    }

    /// Share the local VNC port; prints the new key
    pub fn share(&self) -> ScriptCommand {
        ScriptCommand::new(&self.dir, &self.share, [self.vnc_port.to_string()])
    }

    /// Connect the local VNC port to the sharer identified by `key`
    pub fn connect(&self, key: &str) -> ScriptCommand {
        ScriptCommand::new(
            &self.dir,
            &self.connect,
            [self.vnc_port.to_string(), key.to_string()],
        )
    }

    /// Revoke `key` and drop its forwarded ports
    pub fn stop(&self, key: &str) -> ScriptCommand {
        ScriptCommand::new(&self.dir, &self.stop, [key.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripts() -> KeyServerScripts {
        let mut config = RsccConfig::default();
        config.programs.scripts_dir = PathBuf::from("/opt/rscc/scripts");
        KeyServerScripts::from_config(&config)
    }

    #[test]
    fn test_setup_command() {
        let cmd = scripts().setup();
        assert_eq!(cmd.to_string(), "/opt/rscc/scripts/use.sh 86.119.39.89 800");
        assert_eq!(cmd.script_name(), "use.sh");
    }

    #[test]
    fn test_share_and_connect_commands() {
        assert_eq!(
            scripts().share().to_string(),
            "/opt/rscc/scripts/port_share.sh 5900"
        );
        assert_eq!(
            scripts().connect("123456789").args,
            vec!["5900".to_string(), "123456789".to_string()]
        );
    }

    #[test]
    fn test_stop_command_ends_with_key() {
        let cmd = scripts().stop("123456789");
        assert!(cmd.to_string().ends_with("port_stop.sh 123456789"));
    }

    #[test]
    fn test_stop_command_with_empty_key() {
        let cmd = scripts().stop("");
        assert_eq!(cmd.args, vec![String::new()]);
    }
}
