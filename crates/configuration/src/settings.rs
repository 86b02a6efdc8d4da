use core_types::{RubricConfig, RubricConstraints, RubricWeights};
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub bakeoff: BakeoffSettings,
    pub rubric: RubricSettings,
}

/// Controls the tracing subscriber installed at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive, e.g. "info" or "wirewatch=debug".
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Defaults applied to bake-off requests launched from the CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BakeoffSettings {
    /// Fraction of rows a downstream reviewer will examine.
    pub review_rate: f64,
    pub seed: u64,
    /// Train candidates across threads instead of one at a time.
    pub parallel: bool,
}

impl Default for BakeoffSettings {
    fn default() -> Self {
        Self { review_rate: 0.005, seed: 42, parallel: false }
    }
}

/// Champion-selection policy; mirrors the engine's `RubricConfig`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RubricSettings {
    pub min_recall_at_review_rate: f64,
    pub min_precision_at_review_rate: f64,
    pub weight_recall: f64,
    pub weight_pr_auc: f64,
    pub weight_precision: f64,
    pub weight_stability: f64,
    pub weight_explainability: f64,
}

impl Default for RubricSettings {
    fn default() -> Self {
        Self {
            min_recall_at_review_rate: 0.65,
            min_precision_at_review_rate: 0.08,
            weight_recall: 0.40,
            weight_pr_auc: 0.25,
            weight_precision: 0.15,
            weight_stability: 0.10,
            weight_explainability: 0.10,
        }
    }
}

impl RubricSettings {
    pub fn to_rubric_config(&self) -> RubricConfig {
        RubricConfig {
            constraints: RubricConstraints {
                min_recall_at_review_rate: self.min_recall_at_review_rate,
                min_precision_at_review_rate: self.min_precision_at_review_rate,
            },
            weights: RubricWeights {
                recall_at_review_rate: self.weight_recall,
                pr_auc: self.weight_pr_auc,
                precision_at_review_rate: self.weight_precision,
                stability: self.weight_stability,
                explainability: self.weight_explainability,
            },
        }
    }
}
