use crate::enums::{AlgorithmId, Contribution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-column mean and standard deviation captured at training time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub mean: f64,
    pub std: f64,
}

/// Training-time statistics that must be reused verbatim at scoring time.
///
/// Created exactly once while building the training matrix, read-only
/// afterward, and embedded inside every serialized model artifact under
/// the `normContext` key. `BTreeMap` keeps the serialized form stable so
/// identical training inputs produce byte-identical artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationContext {
    pub numeric_stats: BTreeMap<String, NumericStats>,
    pub categorical_mappings: BTreeMap<String, Vec<String>>,
}

/// Tunables accepted by every trainer. Unset fields fall back to the
/// algorithm's own defaults, so a candidate only overrides what it cares
/// about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hyperparams {
    pub epochs: Option<usize>,
    pub learning_rate: Option<f64>,
    pub c: Option<f64>,
    pub max_depth: Option<usize>,
    pub min_samples_split: Option<usize>,
    pub min_samples_leaf: Option<usize>,
    pub n_estimators: Option<usize>,
    pub seed: u64,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Self {
            epochs: None,
            learning_rate: None,
            c: None,
            max_depth: None,
            min_samples_split: None,
            min_samples_leaf: None,
            n_estimators: None,
            seed: 42,
        }
    }
}

/// One entry in a bake-off's candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub algorithm: AlgorithmId,
    #[serde(default)]
    pub hyperparams: Hyperparams,
}

/// The evaluation rubric's view of a trained candidate. Every value is
/// in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResult {
    pub pr_auc: f64,
    pub recall_at_review_rate: f64,
    pub precision_at_review_rate: f64,
    pub f1: f64,
    pub stability: f64,
    pub explainability: f64,
}

impl MetricsResult {
    /// Zero-valued metrics used as the placeholder for a failed candidate.
    pub fn zeroed() -> Self {
        Self {
            pr_auc: 0.0,
            recall_at_review_rate: 0.0,
            precision_at_review_rate: 0.0,
            f1: 0.0,
            stability: 0.0,
            explainability: 0.0,
        }
    }
}

/// Hard constraints a candidate must satisfy before it can be ranked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricConstraints {
    pub min_recall_at_review_rate: f64,
    pub min_precision_at_review_rate: f64,
}

/// Weights of the rubric's scoring function. They need not sum to 1 but
/// must be finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricWeights {
    pub recall_at_review_rate: f64,
    pub pr_auc: f64,
    pub precision_at_review_rate: f64,
    pub stability: f64,
    pub explainability: f64,
}

/// Caller-provided champion-selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubricConfig {
    pub constraints: RubricConstraints,
    pub weights: RubricWeights,
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            constraints: RubricConstraints {
                min_recall_at_review_rate: 0.65,
                min_precision_at_review_rate: 0.08,
            },
            weights: RubricWeights {
                recall_at_review_rate: 0.40,
                pr_auc: 0.25,
                precision_at_review_rate: 0.15,
                stability: 0.10,
                explainability: 0.10,
            },
        }
    }
}

/// A human-readable tag attached to a finding, derived from feature-name
/// patterns and contribution magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonCode {
    pub code: String,
    pub description: String,
    pub contribution: Contribution,
}

/// A single flagged wire produced by the scoring pipeline. `rank` is
/// 1-based in descending score order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub wire_id: String,
    pub rank: usize,
    pub score: f64,
    pub predicted_label: u8,
    pub reason_codes: Vec<ReasonCode>,
}

/// Precision/recall/F1 measured against ground-truth labels at the
/// scoring threshold, rounded to 4 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelledMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Aggregate output of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringSummary {
    pub review_rate: f64,
    pub threshold_used: f64,
    pub flagged_count: usize,
    pub row_count: usize,
    pub metrics_if_labels_present: Option<LabelledMetrics>,
    pub global_shap_top_features: Vec<(String, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rubric_matches_policy_defaults() {
        let rubric = RubricConfig::default();
        assert_eq!(rubric.constraints.min_recall_at_review_rate, 0.65);
        assert_eq!(rubric.constraints.min_precision_at_review_rate, 0.08);
        let w = rubric.weights;
        assert!(
            (w.recall_at_review_rate + w.pr_auc + w.precision_at_review_rate
                + w.stability
                + w.explainability
                - 1.0)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn norm_context_serializes_with_camel_case_keys() {
        let mut ctx = NormalizationContext::default();
        ctx.numeric_stats
            .insert("Amount".into(), NumericStats { mean: 10.0, std: 2.0 });
        ctx.categorical_mappings
            .insert("Country".into(), vec!["US".into(), "GB".into()]);
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("numericStats").is_some());
        assert!(json.get("categoricalMappings").is_some());
    }
}
