use crate::{
    checker::Checker,
    error::{Error, Result},
    keys::device::DEFAULT_BRIDGE_ADDRESS,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

/// Tool configuration, read from `~/.subnet-cli/config.toml` by default.
///
/// Every field can be overridden from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Node endpoint
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Seconds between confirmation polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Seconds before giving up on confirmation. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_timeout: Option<u64>,

    /// Seconds before a single node request times out
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Software key file
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,

    /// Sign with a hardware device instead of the key file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<LedgerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Address of the local signing bridge
    #[serde(default = "default_bridge_address")]
    pub bridge_address: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            bridge_address: default_bridge_address(),
        }
    }
}

impl LedgerConfig {
    pub fn bridge_socket_addr(&self) -> Result<SocketAddr> {
        self.bridge_address
            .parse()
            .map_err(|e| Error::Config(format!("bridge address {:?}: {e}", self.bridge_address)))
    }
}

fn default_uri() -> String {
    "http://127.0.0.1:9650".to_string()
}

fn default_poll_interval() -> u64 {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from(".subnet-cli.pk")
}

fn default_bridge_address() -> String {
    DEFAULT_BRIDGE_ADDRESS.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            poll_interval: default_poll_interval(),
            poll_timeout: None,
            request_timeout: default_request_timeout(),
            private_key_path: default_private_key_path(),
            ledger: None,
        }
    }
}

impl Config {
    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load config from a file, falling back to defaults when it is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(Error::EmptyUri);
        }
        if self.poll_interval == 0 {
            return Err(Error::InvalidInterval);
        }
        Url::parse(&self.uri)?;
        if let Some(ledger) = &self.ledger {
            ledger.bridge_socket_addr()?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Confirmation checker for these settings.
    pub fn checker(&self) -> Checker {
        let checker = Checker::new(Duration::from_secs(self.poll_interval));
        match self.poll_timeout {
            Some(timeout) => checker.with_timeout(Duration::from_secs(timeout)),
            None => checker,
        }
    }
}

/// Get the default config directory path
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".subnet-cli")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            poll_timeout: Some(60),
            ledger: Some(LedgerConfig::default()),
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "uri = \"https://api.example.network\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.uri, "https://api.example.network");
        assert_eq!(config.poll_interval, 1);
        assert_eq!(config.ledger, None);
        assert_eq!(config.checker().timeout(), None);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validation() {
        assert!(Config::default().validate().is_ok());

        let empty = Config {
            uri: String::new(),
            ..Default::default()
        };
        assert_matches!(empty.validate(), Err(Error::EmptyUri));

        let zero = Config {
            poll_interval: 0,
            ..Default::default()
        };
        assert_matches!(zero.validate(), Err(Error::InvalidInterval));

        let bad_url = Config {
            uri: "not a url".to_string(),
            ..Default::default()
        };
        assert_matches!(bad_url.validate(), Err(Error::Url(_)));

        let bad_bridge = Config {
            ledger: Some(LedgerConfig {
                bridge_address: "nowhere".to_string(),
            }),
            ..Default::default()
        };
        assert_matches!(bad_bridge.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval = \"soon\"\n").unwrap();
        assert_matches!(Config::load(&path), Err(Error::Toml(_)));
    }
}
