use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{BakeoffSettings, LoggingSettings, RubricSettings, Settings};

/// Loads the application configuration from `wirewatch.toml` (or the
/// given file). A missing file is not an error: every section carries
/// defaults, so a bare installation runs with the stock policy.
pub fn load_config(path: Option<&str>) -> Result<Settings, ConfigError> {
    let file = path.unwrap_or("wirewatch.toml");
    let builder = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let rate = settings.bakeoff.review_rate;
    if !(rate > 0.0 && rate <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "bakeoff.review_rate must be in (0, 1], got {rate}"
        )));
    }
    for (name, value) in [
        ("rubric.min_recall_at_review_rate", settings.rubric.min_recall_at_review_rate),
        ("rubric.min_precision_at_review_rate", settings.rubric.min_precision_at_review_rate),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be in [0, 1], got {value}"
            )));
        }
    }
    Ok(())
}

/// Installs the global tracing subscriber with the configured filter.
pub fn init_tracing(logging: &LoggingSettings) -> Result<(), ConfigError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConfigError::TracingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = load_config(Some("/nonexistent/wirewatch.toml")).unwrap();
        assert_eq!(settings.bakeoff.review_rate, 0.005);
        assert_eq!(settings.rubric.min_recall_at_review_rate, 0.65);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn rubric_settings_map_onto_the_engine_config() {
        let settings = Settings::default();
        let rubric = settings.rubric.to_rubric_config();
        assert_eq!(rubric.constraints.min_precision_at_review_rate, 0.08);
        assert_eq!(rubric.weights.recall_at_review_rate, 0.40);
    }
}
