use crate::align::align_features;
use crate::error::ScoringError;
use core_types::{
    CoreError, DatasetFormat, Finding, LabelledMetrics, ScoringRunStatus, ScoringSummary,
};
use dataset::{detect_label_column, infer_schema, ParsedDataset};
use explain::{global_shap, local_shap, GlobalShap, ReasonCodeEngine};
use features::{build_features, FeatureMode};
use metrics::engine::descending_order;
use models::error::ModelError;
use models::{deserialize_artifact, TrainedModel};
use ndarray::Array2;
use std::collections::BTreeMap;
use storage::{BlobStore, RunRepository};
use uuid::Uuid;

pub mod align;
pub mod error;
pub mod output;

const DEFAULT_REVIEW_RATE: f64 = 0.005;
const DEFAULT_MAX_EXPLAINED: usize = 200;
const SUMMARY_TOP_FEATURES: usize = 10;

/// One scoring request: where the bytes live, how many rows the
/// downstream reviewers can absorb, and optionally a fixed threshold.
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    pub dataset_url: String,
    pub format: DatasetFormat,
    pub artifact_url: String,
    pub review_rate: f64,
    pub threshold: Option<f64>,
    /// Local explanations are computed for at most this many flagged rows.
    pub max_explained: usize,
    pub scored_output_url: Option<String>,
}

impl ScoringRequest {
    pub fn new(dataset_url: impl Into<String>, format: DatasetFormat, artifact_url: impl Into<String>) -> Self {
        Self {
            dataset_url: dataset_url.into(),
            format,
            artifact_url: artifact_url.into(),
            review_rate: DEFAULT_REVIEW_RATE,
            threshold: None,
            max_explained: DEFAULT_MAX_EXPLAINED,
            scored_output_url: None,
        }
    }
}

/// Everything one scoring run produces.
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    pub run_id: Uuid,
    pub summary: ScoringSummary,
    pub findings: Vec<Finding>,
    pub scored_csv: Vec<u8>,
}

/// The scoring pipeline: load, deserialize, align, predict, threshold,
/// explain, emit. SHAP failures are downgraded to warnings; findings are
/// then emitted without explanations.
pub struct ScoringPipeline {
    blob: BlobStore,
    repo: RunRepository,
}

impl ScoringPipeline {
    pub fn new(blob: BlobStore, repo: RunRepository) -> Self {
        Self { blob, repo }
    }

    pub async fn run(&self, request: &ScoringRequest) -> Result<ScoringOutcome, ScoringError> {
        let run_id = Uuid::new_v4();
        self.repo.create_scoring_run(run_id).await?;

        match self.execute(run_id, request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(%run_id, error = %e, "scoring run failed");
                let _ = self
                    .repo
                    .update_scoring_status(run_id, ScoringRunStatus::Failed, Some(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        request: &ScoringRequest,
    ) -> Result<ScoringOutcome, ScoringError> {
        if !(request.review_rate > 0.0 && request.review_rate <= 1.0) {
            return Err(ScoringError::InvalidReviewRate(request.review_rate));
        }

        // 1. Load bytes and reconstruct the model.
        let dataset_bytes = self
            .blob
            .get(&request.dataset_url)
            .await
            .map_err(|e| ScoringError::Load(e.to_string()))?;
        let artifact_bytes = self
            .blob
            .get(&request.artifact_url)
            .await
            .map_err(|e| ScoringError::Load(e.to_string()))?;

        let parsed = dataset::parse_bytes(&dataset_bytes, request.format)
            .map_err(|e| ScoringError::Load(e.to_string()))?;
        let (model, context) = deserialize_artifact(&artifact_bytes).map_err(|e| match e {
            ModelError::Core(core) => ScoringError::Core(core),
            other => ScoringError::Load(other.to_string()),
        })?;
        let context = context.ok_or_else(|| {
            CoreError::ArtifactCorruption("missing required key 'normContext'".to_string())
        })?;

        self.repo
            .update_scoring_status(run_id, ScoringRunStatus::Validated, None)
            .await?;

        // 2. Rebuild features with the training-time context and align
        // them to the artifact's feature order.
        let schema = infer_schema(&parsed);
        let label_column = detect_label_column(&parsed.headers);
        let built = build_features(
            &parsed,
            &schema,
            label_column.as_deref(),
            FeatureMode::Scoring(&context),
        )
        .map_err(|e| ScoringError::Align(e.to_string()))?;
        let labels = built.y.clone();
        let scoring_names = built.feature_names.clone();

        self.repo
            .update_scoring_status(run_id, ScoringRunStatus::Scoring, None)
            .await?;

        let aligned = align_features(built.x, &scoring_names, &model.feature_names);
        if aligned.ncols() != model.feature_names.len() {
            return Err(ScoringError::Predict(format!(
                "aligned matrix has {} columns but the model expects {}",
                aligned.ncols(),
                model.feature_names.len()
            )));
        }

        // 3. Predict and derive the review threshold.
        let scores = model.predict_batch(&aligned.view());
        let threshold = request
            .threshold
            .unwrap_or_else(|| quantile_threshold(&scores, request.review_rate));
        let flagged_count = scores.iter().filter(|s| **s >= threshold).count();
        tracing::info!(
            %run_id,
            rows = scores.len(),
            flagged = flagged_count,
            threshold,
            "scoring complete"
        );

        // 4. Explanations. Failures here must not sink the run.
        let column_means = column_means(&aligned);
        let global = match global_shap(&model, &aligned.view(), &column_means, None) {
            Ok(global) => Some(global),
            Err(e) => {
                tracing::warn!(error = %e, "global SHAP failed; continuing without it");
                None
            }
        };
        let findings = self.build_findings(
            &parsed,
            &model,
            &aligned,
            &column_means,
            &scores,
            threshold,
            request.max_explained,
            global.as_ref(),
        );

        // 5. Emit the scored table and the summary.
        let scored_csv = output::scored_csv(&parsed, &scores, threshold)?;
        if let Some(url) = &request.scored_output_url {
            self.blob.put(url, &scored_csv).await?;
        }

        let summary = ScoringSummary {
            review_rate: request.review_rate,
            threshold_used: threshold,
            flagged_count,
            row_count: scores.len(),
            metrics_if_labels_present: labels
                .as_deref()
                .map(|y| labelled_metrics(&scores, y, threshold)),
            global_shap_top_features: global
                .as_ref()
                .map(|g| g.ranked.iter().take(SUMMARY_TOP_FEATURES).cloned().collect())
                .unwrap_or_default(),
        };

        self.repo.finish_scoring_run(run_id, summary.clone()).await?;
        Ok(ScoringOutcome { run_id, summary, findings, scored_csv })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_findings(
        &self,
        parsed: &ParsedDataset,
        model: &TrainedModel,
        aligned: &Array2<f64>,
        column_means: &[f64],
        scores: &[f64],
        threshold: f64,
        max_explained: usize,
        global: Option<&GlobalShap>,
    ) -> Vec<Finding> {
        let reason_engine = match ReasonCodeEngine::builtin() {
            Ok(engine) => Some(engine),
            Err(e) => {
                tracing::warn!(error = %e, "reason-code engine unavailable");
                None
            }
        };
        let importance = global.map(normalized_importance).unwrap_or_default();
        let wire_id_column = detect_wire_id_column(&parsed.headers);

        let mut findings = Vec::new();
        for (rank, &row_index) in descending_order(scores)
            .iter()
            .filter(|&&i| scores[i] >= threshold)
            .take(max_explained)
            .enumerate()
        {
            let row: Vec<f64> = aligned.row(row_index).to_vec();
            let shap = match local_shap(model, &row, column_means) {
                Ok(explanation) => Some(explanation),
                Err(e) => {
                    tracing::warn!(row = row_index, error = %e, "local SHAP failed");
                    None
                }
            };
            let reason_codes = reason_engine
                .as_ref()
                .map(|engine| {
                    engine.codes_for_row(
                        &model.feature_names,
                        &row,
                        shap.as_ref().map(|s| s.contributions.as_slice()),
                        &importance,
                    )
                })
                .unwrap_or_default();

            let wire_id = wire_id_column
                .as_deref()
                .and_then(|col| parsed.rows[row_index].get(col))
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("row-{row_index}"));

            findings.push(Finding {
                wire_id,
                rank: rank + 1,
                score: scores[row_index],
                predicted_label: 1,
                reason_codes,
            });
        }
        findings
    }
}

/// The score at the `review_rate` quantile of the descending score
/// distribution: position max(0, floor(rate * n) - 1).
pub fn quantile_threshold(scores: &[f64], review_rate: f64) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let position = (review_rate * sorted.len() as f64).floor() as i64 - 1;
    let position = position.max(0) as usize;
    sorted[position.min(sorted.len() - 1)]
}

fn detect_wire_id_column(headers: &[String]) -> Option<String> {
    const KNOWN: [&str; 6] =
        ["wireid", "wire_id", "id", "transactionid", "transaction_id", "reference"];
    headers
        .iter()
        .find(|h| KNOWN.contains(&h.to_lowercase().as_str()))
        .cloned()
}

fn column_means(x: &Array2<f64>) -> Vec<f64> {
    let n = x.nrows().max(1) as f64;
    (0..x.ncols()).map(|j| x.column(j).sum() / n).collect()
}

fn normalized_importance(global: &GlobalShap) -> BTreeMap<String, f64> {
    let total: f64 = global.mean_abs.values().sum();
    if total <= 0.0 {
        return global.mean_abs.clone();
    }
    global
        .mean_abs
        .iter()
        .map(|(name, value)| (name.clone(), value / total))
        .collect()
}

fn labelled_metrics(scores: &[f64], labels: &[f64], threshold: f64) -> LabelledMetrics {
    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut false_negatives = 0usize;
    for (score, label) in scores.iter().zip(labels.iter()) {
        let predicted = *score >= threshold;
        let actual = *label >= 0.5;
        match (predicted, actual) {
            (true, true) => true_positives += 1,
            (true, false) => false_positives += 1,
            (false, true) => false_negatives += 1,
            (false, false) => {}
        }
    }
    let precision = if true_positives + false_positives > 0 {
        true_positives as f64 / (true_positives + false_positives) as f64
    } else {
        0.0
    };
    let recall = if true_positives + false_negatives > 0 {
        true_positives as f64 / (true_positives + false_negatives) as f64
    } else {
        0.0
    };
    LabelledMetrics {
        precision: round4(precision),
        recall: round4(recall),
        f1: round4(metrics::f1_score(precision, recall)),
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_sits_at_the_review_rate_quantile() {
        // 1000 evenly spread scores in (0, 1]
        let scores: Vec<f64> = (1..=1000).map(|i| i as f64 / 1000.0).collect();
        let threshold = quantile_threshold(&scores, 0.01);
        assert!((threshold - 0.991).abs() < 1e-9);
        let flagged = scores.iter().filter(|s| **s >= threshold).count();
        assert!((10..=11).contains(&flagged));
    }

    #[test]
    fn tiny_review_rates_still_flag_the_top_row() {
        let scores = [0.2, 0.9, 0.5];
        let threshold = quantile_threshold(&scores, 0.001);
        assert_eq!(threshold, 0.9);
    }

    #[test]
    fn labelled_metrics_round_to_four_decimals() {
        let scores = [0.9, 0.8, 0.1, 0.2, 0.3];
        let labels = [1.0, 0.0, 1.0, 0.0, 0.0];
        let m = labelled_metrics(&scores, &labels, 0.5);
        assert!((m.precision - 0.5).abs() < 1e-12);
        assert!((m.recall - 0.5).abs() < 1e-12);
        assert!((m.f1 - 0.5).abs() < 1e-12);
    }
}
