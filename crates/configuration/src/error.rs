use thiserror::Error;

/// Represents all possible errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Wraps errors from the `config` crate when loading or parsing the configuration.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    /// Occurs when configuration values fail validation.
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// Occurs when the tracing subscriber cannot be installed.
    #[error("Failed to initialize tracing: {0}")]
    TracingInit(String),
}
