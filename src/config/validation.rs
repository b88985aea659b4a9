use super::FleetConfig;
use crate::docker::client::memory_limit_bytes;
use crate::error::{Error, Result};

impl FleetConfig {
    /// Reject settings the reconciler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.server_defaults.default_port == 0 {
            return Err(Error::Validation(
                "server_defaults.default_port must be between 1 and 65535".to_string(),
            ));
        }

        if memory_limit_bytes(self.server_defaults.max_memory_mb).is_err() {
            return Err(Error::Validation(format!(
                "server_defaults.max_memory_mb of {} does not fit in a byte count",
                self.server_defaults.max_memory_mb
            )));
        }

        if self.monitor.interval.is_zero() {
            return Err(Error::Validation(
                "monitor.interval must be greater than zero".to_string(),
            ));
        }

        if self.logging.buffer_size == 0 {
            return Err(Error::Validation(
                "logging.buffer_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FleetConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_values() {
        let mut config = FleetConfig::default();
        config.server_defaults.default_port = 0;
        assert!(matches!(config.validate(), Err(Error::Validation(_))));

        let mut config = FleetConfig::default();
        config.monitor.interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = FleetConfig::default();
        config.logging.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_memory_limit() {
        let mut config = FleetConfig::default();
        config.server_defaults.max_memory_mb = 9_000_000_000_000;
        assert!(matches!(config.validate(), Err(Error::Validation(_))));

        config.server_defaults.max_memory_mb = 0;
        assert!(config.validate().is_ok());
    }
}
