use crate::error::{MongoFsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_NAME: &str = "mongodb";
pub const DEFAULT_SEPARATOR: char = '/';

/// Settings for a MongoFs instance, read from a YAML file and overridden by
/// command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// `mongodb://` or `mongodb+srv://` URI of a live server.
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Extended JSON fixture served from memory instead of a server.
    #[serde(default)]
    pub fixture: Option<PathBuf>,
    /// Instance name, used as the volume label.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_separator")]
    pub separator: char,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            connection_string: None,
            fixture: None,
            name: default_name(),
            separator: default_separator(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Parse a config.yaml file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Check every setting and report all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        match (&self.connection_string, &self.fixture) {
            (Some(_), Some(_)) => {
                errors.push("Set either a connection string or a fixture, not both".to_string())
            }
            (None, None) => errors.push("A connection string or a fixture is required".to_string()),
            (Some(uri), None) => {
                if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
                    errors.push(format!("Invalid connection string: {uri}"));
                }
            }
            (None, Some(_)) => {}
        }

        if self.name.trim().is_empty() {
            errors.push("Name is empty".to_string());
        }

        if self.separator == '.' {
            errors.push("Separator cannot be '.'".to_string());
        }

        if !errors.is_empty() {
            return Err(MongoFsError::Config(format!(
                "Options are invalid:\n  - {}",
                errors.join("\n  - ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.separator, '/');
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
connection_string: "mongodb://localhost:27017"
name: prod
separator: '\'
log:
  level: debug
  file: /tmp/mongofs.log
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.connection_string.as_deref(),
            Some("mongodb://localhost:27017")
        );
        assert_eq!(config.name, "prod");
        assert_eq!(config.separator, '\\');
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.file, Some(PathBuf::from("/tmp/mongofs.log")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fixture_config_is_valid() {
        let config = Config {
            fixture: Some(PathBuf::from("fixture.json")),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let config = Config {
            connection_string: Some("localhost:27017".into()),
            name: "  ".into(),
            separator: '.',
            ..Config::default()
        };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("Invalid connection string"));
        assert!(message.contains("Name is empty"));
        assert!(message.contains("Separator"));
    }

    #[test]
    fn test_validate_source_exclusivity() {
        assert!(Config::default().validate().is_err());

        let both = Config {
            connection_string: Some("mongodb+srv://cluster.example.net".into()),
            fixture: Some(PathBuf::from("fixture.json")),
            ..Config::default()
        };
        let message = both.validate().unwrap_err().to_string();
        assert!(message.contains("not both"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, MongoFsError::Io(_)));
    }
}
