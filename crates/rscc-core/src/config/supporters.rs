//! Address book of supporters that can be called directly

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default address book file name
pub const SUPPORTERS_FILE_NAME: &str = "supporters.toml";

/// Default list shipped next to the scripts
pub const DEFAULT_SUPPORTERS_FILE_NAME: &str = "rscc-defaults.toml";

/// An address-book entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supporter {
    /// Display name
    pub description: String,

    /// Publicly reachable host or IP
    pub address: String,

    /// Port the supporter's viewer listens on; empty means the default port
    #[serde(default)]
    pub port: String,

    /// Encrypt the reverse connection
    #[serde(default)]
    pub encrypted: bool,

    /// Support from this entry is billed
    #[serde(default)]
    pub chargeable: bool,
}

impl Supporter {
    /// Parsed port, `None` when the entry leaves it empty
    pub fn port_number(&self) -> Result<Option<u16>, ConfigError> {
        let port = self.port.trim();
        if port.is_empty() {
            return Ok(None);
        }
        port.parse::<u16>()
            .ok()
            .filter(|p| *p > 0)
            .map(Some)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "Supporter '{}' has an invalid port: {}",
                    self.description, self.port
                ))
            })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SupporterFile {
    #[serde(default)]
    supporter: Vec<Supporter>,
}

/// Loads and saves the address book
#[derive(Debug, Clone)]
pub struct SupporterStore {
    path: PathBuf,
    defaults_path: PathBuf,
}

impl SupporterStore {
    /// Create a store backed by `path`, falling back to `defaults_path`
    pub fn new(path: impl Into<PathBuf>, defaults_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            defaults_path: defaults_path.into(),
        }
    }

    /// Store using the standard file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join(SUPPORTERS_FILE_NAME),
            dir.join(DEFAULT_SUPPORTERS_FILE_NAME),
        )
    }

    /// Store in the default configuration directory
    pub fn default_location() -> Self {
        Self::in_dir(&super::default_config_dir())
    }

    /// Path of the user's address book
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the address book.
    ///
    /// A missing or malformed file yields the default list.
    pub fn load(&self) -> Vec<Supporter> {
        match read_supporters(&self.path) {
            Ok(Some(list)) => list,
            Ok(None) => self.defaults(),
            Err(e) => {
                tracing::warn!(
                    "Address book {:?} is invalid ({}), using defaults",
                    self.path,
                    e
                );
                self.defaults()
            }
        }
    }

    /// Default list, empty when no defaults file is installed
    pub fn defaults(&self) -> Vec<Supporter> {
        match read_supporters(&self.defaults_path) {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Default supporters {:?} are invalid: {}", self.defaults_path, e);
                Vec::new()
            }
        }
    }

    /// Persist the address book
    pub fn save(&self, supporters: &[Supporter]) -> Result<(), ConfigError> {
        let file = SupporterFile {
            supporter: supporters.to_vec(),
        };
        super::save_config(&self.path, &file)
    }
}

fn read_supporters(path: &Path) -> Result<Option<Vec<Supporter>>, ConfigError> {
    match super::load_config::<SupporterFile>(path) {
        Ok(file) => Ok(Some(file.supporter)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
