//! Application configuration management.

use serde::Deserialize;

/// Environment variable consulted for the ledger endpoint when no config layer sets it.
pub const ENDPOINT_ENV_VAR: &str = "CALA_API_ENDPOINT";

/// Message reported when no endpoint could be resolved.
pub const MISSING_ENDPOINT: &str = "Required endpoint could not be found. Please set `ledger.endpoint` \
     in the configuration file, `LEDGERFORM__LEDGER__ENDPOINT`, or the `CALA_API_ENDPOINT` \
     environment variable.";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Remote ledger configuration.
    pub ledger: LedgerConfig,
}

/// Remote ledger connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// GraphQL endpoint of the ledger service.
    pub endpoint: String,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Page size used when listing account-set members.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    100
}

impl LedgerConfig {
    /// Creates a configuration for `endpoint` with default timeouts and paging.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from config files and environment.
    ///
    /// Layers, lowest priority first: the `CALA_API_ENDPOINT` fallback,
    /// `config/default`, `config/{RUN_MODE}`, then `LEDGERFORM__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or no endpoint is set.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LEDGERFORM").separator("__"));

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV_VAR) {
            builder = builder.set_default("ledger.endpoint", endpoint)?;
        }

        let config = builder.build()?;
        if config.get_string("ledger.endpoint").is_err() {
            return Err(config::ConfigError::Message(MISSING_ENDPOINT.to_string()));
        }

        let app: Self = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.ledger.endpoint.trim().is_empty() {
            return Err(config::ConfigError::Message(MISSING_ENDPOINT.to_string()));
        }
        if self.ledger.page_size == 0 {
            return Err(config::ConfigError::Message(
                "ledger.page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERRIDE_VAR: &str = "LEDGERFORM__LEDGER__ENDPOINT";

    #[test]
    fn test_endpoint_falls_back_to_cala_env() {
        temp_env::with_vars(
            [
                (ENDPOINT_ENV_VAR, Some("http://localhost:2252/graphql")),
                (OVERRIDE_VAR, None),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ledger.endpoint, "http://localhost:2252/graphql");
                assert_eq!(config.ledger.timeout_secs, 30);
                assert_eq!(config.ledger.page_size, 100);
            },
        );
    }

    #[test]
    fn test_prefixed_env_wins_over_fallback() {
        temp_env::with_vars(
            [
                (ENDPOINT_ENV_VAR, Some("http://fallback/graphql")),
                (OVERRIDE_VAR, Some("http://primary/graphql")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ledger.endpoint, "http://primary/graphql");
            },
        );
    }

    #[test]
    fn test_missing_endpoint_is_reported() {
        temp_env::with_vars_unset([ENDPOINT_ENV_VAR, OVERRIDE_VAR], || {
            let err = AppConfig::load().unwrap_err();
            assert!(err.to_string().contains("Required endpoint could not be found"));
        });
    }

    #[test]
    fn test_ledger_config_defaults() {
        let config = LedgerConfig::new("http://ledger/graphql");
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.page_size, 100);
    }
}
