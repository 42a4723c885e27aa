//! TOML configuration loading and validation for the CLI shell: fixture
//! paths, logging, and where the audit trail is written. The planner's own
//! tunables (`PlannerConfiguration`) are loaded separately — see
//! [`crate::planner_config`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub fixture: FixtureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub planner_config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}

fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl CliConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: CliConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.fixture.path.as_os_str().is_empty() {
            return Err(Error::Config("fixture.path must not be empty".into()));
        }
        if self.logging.audit_file.is_empty() {
            return Err(Error::Config("logging.audit_file must not be empty".into()));
        }
        Ok(())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[fixture]
path = "fixture.json"

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
"#
    }

    #[test]
    fn parse_example_config() {
        let config: CliConfig = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.fixture.path, PathBuf::from("fixture.json"));
        assert_eq!(config.logging.audit_file, "audit.jsonl");
    }

    #[test]
    fn logging_defaults_when_omitted() {
        let config: CliConfig = toml::from_str("[fixture]\npath = \"f.json\"\n").unwrap();
        assert_eq!(config.logging.dir, "./logs");
        assert_eq!(config.logging.audit_file, "audit.jsonl");
    }

    #[test]
    fn validate_catches_empty_audit_file() {
        let mut config: CliConfig = toml::from_str(example_toml()).unwrap();
        config.logging.audit_file = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn audit_path_joins_dir_and_file() {
        let config: CliConfig = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.audit_path(), PathBuf::from("./logs/audit.jsonl"));
    }
}
