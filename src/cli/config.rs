// CLI Configuration - Convert CLI args to node config
// Principle: Clear mapping between user input and internal configuration
//
// Precedence: CLI flag > config file > built-in default

use crate::cli::Cli;
use crate::invariants::InvariantLevel;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the platform data dir
const DATA_DIR_NAME: &str = "ledger-guard";

/// Subdirectory holding the parameter store
const PARAMS_DB_DIR: &str = "params";

/// Complete configuration derived from CLI arguments and the optional config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Base data path
    pub base_path: PathBuf,
    /// Severity applied to invariant violations
    pub invariant_level: InvariantLevel,
}

/// Config file format
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    base_path: Option<PathBuf>,
    #[serde(default)]
    invariant_level: Option<InvariantLevel>,
}

impl NodeConfig {
    /// Create configuration from the parsed CLI
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match cli.config {
            Some(ref path) => Self::load_file(path)?,
            None => FileConfig::default(),
        };

        let base_path = cli
            .base_path
            .clone()
            .or(file.base_path)
            .unwrap_or_else(default_base_path);

        let invariant_level = cli
            .invariant_level
            .or(file.invariant_level)
            .unwrap_or_default();

        debug!(base_path = %base_path.display(), %invariant_level, "Configuration resolved");

        Ok(Self {
            base_path,
            invariant_level,
        })
    }

    /// Location of the RocksDB parameter store
    pub fn params_db_path(&self) -> PathBuf {
        self.base_path.join(PARAMS_DB_DIR)
    }

    fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let file: FileConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(file)
    }
}

/// Platform data directory, falling back to the working directory
pub fn default_base_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["ledger-guard"];
        full.extend_from_slice(args);
        full.extend_from_slice(&["check", "snap.json"]);
        Cli::try_parse_from(full).unwrap()
    }

    fn config_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::from_cli(&cli(&[])).unwrap();
        assert_eq!(config.invariant_level, InvariantLevel::LogOnly);
        assert!(config.base_path.to_string_lossy().contains("ledger-guard"));
        assert!(config.params_db_path().ends_with("params"));
    }

    #[test]
    fn test_file_values_used() {
        let file = config_file(r#"{"base_path": "/tmp/lg", "invariant_level": "fatal"}"#);
        let path = file.path().to_str().unwrap();

        let config = NodeConfig::from_cli(&cli(&["--config", path])).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/tmp/lg"));
        assert_eq!(config.invariant_level, InvariantLevel::Fatal);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = config_file(r#"{"base_path": "/tmp/lg", "invariant_level": "fatal"}"#);
        let path = file.path().to_str().unwrap();

        let config = NodeConfig::from_cli(&cli(&[
            "--config", path, "-d", "/srv/guard", "--invariants", "ignore",
        ]))
        .unwrap();
        assert_eq!(config.base_path, PathBuf::from("/srv/guard"));
        assert_eq!(config.invariant_level, InvariantLevel::Ignore);
    }

    #[test]
    fn test_bad_config_file() {
        let file = config_file(r#"{"invariant_level": "sometimes"}"#);
        let path = file.path().to_str().unwrap();
        let result = NodeConfig::from_cli(&cli(&["--config", path]));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));

        let result = NodeConfig::from_cli(&cli(&["--config", "/no/such/config.json"]));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
