//! Configuration for the node daemon client.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// What to do when a call reports a severed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatalPolicy {
    /// Return the error to the caller.
    #[default]
    Propagate,
    /// Log the error and abort the process.
    Abort,
}

impl std::fmt::Display for FatalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Propagate => write!(f, "propagate"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

impl std::str::FromStr for FatalPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "propagate" => Ok(Self::Propagate),
            "abort" => Ok(Self::Abort),
            other => Err(Error::invalid_config(format!(
                "unknown fatal policy '{other}' (expected 'propagate' or 'abort')"
            ))),
        }
    }
}

/// Configuration for [`NodeClient`](crate::NodeClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Directory holding the per-node daemon sockets.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// File name prefix of a node socket (`<prefix><node>.sock`).
    #[serde(default = "default_socket_prefix")]
    pub socket_prefix: String,

    /// Reaction to a severed channel.
    #[serde(default)]
    pub fatal_policy: FatalPolicy,

    /// Version announced in the compatibility handshake.
    #[serde(default = "default_library_version")]
    pub library_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_dir: default_socket_dir(),
            socket_prefix: default_socket_prefix(),
            fatal_policy: FatalPolicy::default(),
            library_version: default_library_version(),
        }
    }
}

impl ClientConfig {
    /// Create a config with sockets under `dir`.
    pub fn with_socket_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            socket_dir: dir.into(),
            ..Default::default()
        }
    }

    /// Set the socket file prefix.
    #[must_use]
    pub fn socket_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.socket_prefix = prefix.into();
        self
    }

    /// Set the fatal policy.
    #[must_use]
    pub const fn fatal_policy(mut self, policy: FatalPolicy) -> Self {
        self.fatal_policy = policy;
        self
    }

    /// Set the version announced in the handshake.
    #[must_use]
    pub fn library_version(mut self, version: impl Into<String>) -> Self {
        self.library_version = version.into();
        self
    }

    /// Load configuration from environment variables over the defaults.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for an unknown `VEINFO_FATAL_POLICY`.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `VEINFO_SOCKET_DIR`, `VEINFO_SOCKET_PREFIX` and
    /// `VEINFO_FATAL_POLICY` on top of this config.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for an unknown `VEINFO_FATAL_POLICY`.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup("VEINFO_SOCKET_DIR") {
            self.socket_dir = PathBuf::from(dir);
        }

        if let Some(prefix) = lookup("VEINFO_SOCKET_PREFIX") {
            self.socket_prefix = prefix;
        }

        if let Some(policy) = lookup("VEINFO_FATAL_POLICY") {
            self.fatal_policy = policy.parse()?;
        }

        Ok(self)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - [`Error::ConfigReadFailed`] if the file cannot be read
    /// - [`Error::InvalidConfig`] if it is not valid TOML for this struct
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("failed to parse config: {e}")))
    }
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from("/var/opt/nec/ve/veos")
}

fn default_socket_prefix() -> String {
    "veos".to_string()
}

fn default_library_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
