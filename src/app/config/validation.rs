use super::{Config, ConfigError, InstanceConfig};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate timeouts
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(input) = &self.input {
            if !input.exists() {
                return Err(ConfigError::InvalidConfig(format!(
                    "Input file does not exist: {}",
                    input.display()
                )));
            }
        }

        Ok(())
    }
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "host must not be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "port must be greater than 0".to_string(),
            ));
        }

        if self.buffer_max_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "buffer_max_size must be greater than 0".to_string(),
            ));
        }

        // The write URL must be buildable from host and port
        self.write_url()?;

        Ok(())
    }
}
