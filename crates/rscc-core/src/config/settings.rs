//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::{duration_secs, option_duration_secs};
use crate::error::ConfigError;

/// Configuration for the rscc client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsccConfig {
    /// Key server connection details
    pub key_server: KeyServerConfig,

    /// Remote-desktop (VNC) settings
    pub vnc: VncConfig,

    /// NAT traversal and relay settings
    pub traversal: TraversalConfig,

    /// Orchestration timing
    pub timing: TimingConfig,

    /// External helper programs
    pub programs: ProgramsConfig,

    /// Always go through the key server, never start a relay
    pub forcing_server_mode: bool,

    /// Port used for direct calls when the target has none
    pub direct_call_port: u16,
}

impl Default for RsccConfig {
    fn default() -> Self {
        Self {
            key_server: KeyServerConfig::default(),
            vnc: VncConfig::default(),
            traversal: TraversalConfig::default(),
            timing: TimingConfig::default(),
            programs: ProgramsConfig::default(),
            forcing_server_mode: false,
            direct_call_port: 5500,
        }
    }
}

impl RsccConfig {
    /// Reject values the orchestrator cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_server.ip.trim().is_empty() {
            return Err(ConfigError::Invalid("key_server.ip is empty".to_string()));
        }
        let ports = [
            ("vnc.port", self.vnc.port),
            ("traversal.ice_port", self.traversal.ice_port),
            ("traversal.proxy_port", self.traversal.proxy_port),
            ("traversal.stun_server_port", self.traversal.stun_server_port),
            ("direct_call_port", self.direct_call_port),
        ];
        if let Some((name, _)) = ports.iter().find(|(_, port)| *port == 0) {
            return Err(ConfigError::Invalid(format!("{} must not be 0", name)));
        }
        if self.traversal.stun_servers.is_empty() {
            return Err(ConfigError::Invalid(
                "traversal.stun_servers must list at least one server".to_string(),
            ));
        }
        if self.timing.connect_attempts == 0 {
            return Err(ConfigError::Invalid(
                "timing.connect_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Key server connection details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyServerConfig {
    /// Key server address
    pub ip: String,

    /// Key server HTTP port, passed verbatim to the setup script
    pub http_port: String,
}

impl Default for KeyServerConfig {
    fn default() -> Self {
        Self {
            ip: "86.119.39.89".to_string(),
            http_port: "800".to_string(),
        }
    }
}

/// Remote-desktop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VncConfig {
    /// Local port of the VNC server
    pub port: u16,

    /// Viewer does not send input events
    pub view_only: bool,

    /// Viewer requests 8-bit BGR233 colour
    pub bgr233: bool,

    /// Compression level (0-9)
    pub compression: u8,

    /// JPEG quality level (0-9)
    pub quality: u8,
}

impl Default for VncConfig {
    fn default() -> Self {
        Self {
            port: 5900,
            view_only: false,
            bgr233: false,
            compression: 6,
            quality: 6,
        }
    }
}

/// NAT traversal and relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Port used for the ICE negotiation
    pub ice_port: u16,

    /// Local port of the relay proxy
    pub proxy_port: u16,

    /// UDP datagram size used by the relay
    pub udp_package_size: u32,

    /// STUN server port
    pub stun_server_port: u16,

    /// STUN servers, tried in order
    pub stun_servers: Vec<String>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            ice_port: 5050,
            proxy_port: 2601,
            udp_package_size: 10000,
            stun_server_port: 3478,
            stun_servers: vec![
                "numb.viagenie.ca".to_string(),
                "stun.ekiga.net".to_string(),
                "stun.gmx.net".to_string(),
                "stun.1und1.de".to_string(),
            ],
        }
    }
}

/// Orchestration timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after starting the VNC server before starting the relay
    #[serde(with = "duration_secs")]
    pub settle_delay: Duration,

    /// Pause between viewer connect attempts
    #[serde(with = "duration_secs")]
    pub connect_retry_interval: Duration,

    /// Maximum number of viewer connect attempts
    pub connect_attempts: u32,

    /// Upper bound for waiting on the handshake (unbounded when absent)
    #[serde(
        with = "option_duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub handshake_timeout: Option<Duration>,

    /// How long a reverse connection must survive to count as established
    #[serde(with = "duration_secs")]
    pub reverse_connect_grace: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            connect_retry_interval: Duration::from_secs(1),
            connect_attempts: 10,
            handshake_timeout: None,
            reverse_connect_grace: Duration::from_secs(2),
        }
    }
}

/// External helper programs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramsConfig {
    /// Directory holding the key-server scripts
    pub scripts_dir: PathBuf,

    /// Script that configures the key server connection
    pub setup_script: String,

    /// Script that shares a local port and prints the new key
    pub share_script: String,

    /// Script that connects to a shared port by key
    pub connect_script: String,

    /// Script that revokes a key
    pub stop_script: String,

    /// VNC server executable
    pub vnc_server: String,

    /// VNC viewer executable
    pub vnc_viewer: String,

    /// Viewer output line that signals an established session
    pub viewer_connected_marker: String,

    /// Rendezvous/traversal helper; prints a JSON outcome and exits
    pub handshake: String,

    /// Relay helper; runs until killed
    pub relay: String,
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            scripts_dir: super::default_config_dir().join("docker-build_p2p"),
            setup_script: "use.sh".to_string(),
            share_script: "port_share.sh".to_string(),
            connect_script: "port_connect.sh".to_string(),
            stop_script: "port_stop.sh".to_string(),
            vnc_server: "x11vnc".to_string(),
            vnc_viewer: "vncviewer".to_string(),
            viewer_connected_marker: "Connected to RFB server".to_string(),
            handshake: "rscc-handshake".to_string(),
            relay: "rscc-relay".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RsccConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.vnc.port, 5900);
        assert_eq!(config.traversal.proxy_port, 2601);
        assert_eq!(config.timing.connect_attempts, 10);
        assert_eq!(config.timing.settle_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = RsccConfig::default();
        config.vnc.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vnc.port"));
    }

    #[test]
    fn test_validate_rejects_empty_stun_list() {
        let mut config = RsccConfig::default();
        config.traversal.stun_servers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = RsccConfig::default();
        config.timing.connect_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RsccConfig = toml::from_str(
            r#"
            forcing_server_mode = true

            [vnc]
            port = 5901

            [timing]
            handshake_timeout = 30
            "#,
        )
        .unwrap();

        assert!(config.forcing_server_mode);
        assert_eq!(config.vnc.port, 5901);
        assert_eq!(config.vnc.quality, 6);
        assert_eq!(config.key_server.http_port, "800");
        assert_eq!(config.timing.handshake_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.timing.connect_attempts, 10);
    }
}
