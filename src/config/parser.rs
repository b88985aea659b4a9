use super::types::{FleetConfig, APP_DIR_NAME};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAMES: [&str; 2] = ["fleet.yaml", "fleet.yml"];

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Find a config file from the current directory upward, then in the
    /// user config directory.
    pub fn find_config_file(&self) -> Result<PathBuf> {
        let current_dir = std::env::current_dir()?;
        if let Ok(path) = Self::find_config_in_dir(&current_dir) {
            return Ok(path);
        }

        if let Some(user_dir) = dirs::config_dir() {
            let user_config = user_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAMES[0]);
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        Err(Error::Config(
            "Could not find fleet.yaml in current directory, any parent, or the user config directory"
                .to_string(),
        ))
    }

    pub fn find_config_in_dir(dir: &Path) -> Result<PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        if let Some(parent) = dir.parent() {
            return Self::find_config_in_dir(parent);
        }

        Err(Error::Config(format!(
            "Could not find fleet.yaml in {} or any parent",
            dir.display()
        )))
    }

    /// Load config from file path
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<FleetConfig> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config = self.parse_config(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path if given, else the discovered file, else defaults.
    pub fn load_or_default(&self, explicit: Option<&Path>) -> Result<FleetConfig> {
        match explicit {
            Some(path) => self.load_config(path),
            None => match self.find_config_file() {
                Ok(path) => {
                    tracing::debug!("Using config file {}", path.display());
                    self.load_config(path)
                }
                Err(_) => {
                    tracing::debug!("No config file found, using defaults");
                    Ok(FleetConfig::default())
                }
            },
        }
    }

    /// Parse config from YAML string
    pub fn parse_config(&self, content: &str) -> Result<FleetConfig> {
        if content.trim().is_empty() {
            return Ok(FleetConfig::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| Error::Parse(format!("Failed to parse YAML config: {}", e)))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
server_defaults:
  default_port: 9100
  restart_on_failure: false

monitor:
  interval: 30s
  initial_delay: 500ms
"#;

        let config = Parser::new().parse_config(yaml).unwrap();

        assert_eq!(config.server_defaults.default_port, 9100);
        assert_eq!(config.server_defaults.max_memory_mb, 512);
        assert_eq!(config.server_defaults.restart_policy(), "no");
        assert_eq!(config.monitor.interval, Duration::from_secs(30));
        assert_eq!(config.monitor.initial_delay, Duration::from_millis(500));
        assert_eq!(config.monitor.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.logging.buffer_size, 1000);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Parser::new().parse_config("  \n").unwrap();
        assert_eq!(config, FleetConfig::default());
    }

    #[test]
    fn test_bad_duration_rejected() {
        let err = Parser::new()
            .parse_config("monitor:\n  interval: whenever\n")
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
