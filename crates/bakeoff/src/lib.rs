use crate::error::BakeoffError;
use crate::progress::{emit, Progress, ProgressSender};
use core_types::{
    BakeoffStatus, CandidateSpec, CoreError, DatasetFormat, MetricsResult, NormalizationContext,
    RubricConfig,
};
use dataset::{detect_label_column, infer_schema};
use features::{build_features, validate_binary_labels, FeatureMode};
use ndarray::ArrayView2;
use rayon::prelude::*;
use rubric::{long_report, short_summary, NarrativeInput, RubricOutcome};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use storage::{BlobStore, RunRepository, UpsertOutcome};
use uuid::Uuid;

pub mod error;
pub mod progress;

const DEFAULT_REVIEW_RATE: f64 = 0.005;

/// The standard candidate field: one of each supported ensemble-level
/// algorithm with default hyperparameters.
pub fn default_candidates() -> Vec<CandidateSpec> {
    use core_types::AlgorithmId::*;
    [LogReg, DecisionTree, RandomForest, ExtraTrees, GradientBoosted]
        .into_iter()
        .map(|algorithm| CandidateSpec { algorithm, hyperparams: Default::default() })
        .collect()
}

/// One bake-off request: a dataset, a candidate list, and the selection
/// policy. Candidate order is preserved end to end so indices in the
/// outcome match the input.
#[derive(Debug, Clone)]
pub struct BakeoffRequest {
    pub dataset_url: String,
    pub format: DatasetFormat,
    pub label_column: Option<String>,
    pub candidates: Vec<CandidateSpec>,
    pub rubric: RubricConfig,
    pub review_rate: f64,
    /// Train candidates across threads. Each candidate owns its
    /// generator and shares the matrix read-only.
    pub parallel: bool,
    /// When set, every candidate artifact is written to
    /// `<prefix>/candidate-<index>.json`.
    pub artifact_url_prefix: Option<String>,
}

impl BakeoffRequest {
    pub fn new(dataset_url: impl Into<String>, format: DatasetFormat) -> Self {
        Self {
            dataset_url: dataset_url.into(),
            format,
            label_column: None,
            candidates: default_candidates(),
            rubric: RubricConfig::default(),
            review_rate: DEFAULT_REVIEW_RATE,
            parallel: false,
            artifact_url_prefix: None,
        }
    }
}

/// A trained (or failed) candidate. Failures keep their slot with
/// zeroed metrics and an error-marked artifact so the rubric still runs
/// over the full field.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub spec: CandidateSpec,
    pub metrics: MetricsResult,
    pub importance: BTreeMap<String, f64>,
    pub artifact: Vec<u8>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BakeoffOutcome {
    pub bakeoff_id: Uuid,
    pub candidates: Vec<CandidateResult>,
    pub ranking: RubricOutcome,
    pub summary: String,
    pub report: String,
    pub champion_artifact_url: Option<String>,
}

/// Orchestrates one bake-off: parse once, build features once, train
/// every candidate, apply the rubric, emit the narrative. Individual
/// candidate failures are downgraded to placeholders; the bake-off
/// itself fails only when every candidate does.
pub struct BakeoffRunner {
    blob: BlobStore,
    repo: RunRepository,
}

impl BakeoffRunner {
    pub fn new(blob: BlobStore, repo: RunRepository) -> Self {
        Self { blob, repo }
    }

    pub async fn run(
        &self,
        request: &BakeoffRequest,
        progress: Option<ProgressSender>,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<BakeoffOutcome, BakeoffError> {
        if !(request.review_rate > 0.0 && request.review_rate <= 1.0) {
            return Err(BakeoffError::InvalidReviewRate(request.review_rate));
        }
        if request.candidates.is_empty() {
            return Err(BakeoffError::NoCandidates);
        }

        let bakeoff_id = Uuid::new_v4();
        self.repo.create_bakeoff(bakeoff_id, request.candidates.clone()).await?;

        match self.execute(bakeoff_id, request, progress, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(%bakeoff_id, error = %e, "bake-off failed");
                let _ = self
                    .repo
                    .update_bakeoff_status(bakeoff_id, BakeoffStatus::Failed, Some(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        bakeoff_id: Uuid,
        request: &BakeoffRequest,
        progress: Option<ProgressSender>,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<BakeoffOutcome, BakeoffError> {
        self.repo
            .update_bakeoff_status(bakeoff_id, BakeoffStatus::Running, None)
            .await?;

        // Parse the dataset and build the training matrix exactly once;
        // all candidates share it read-only.
        let bytes = self.blob.get(&request.dataset_url).await?;
        let parsed = dataset::parse_bytes(&bytes, request.format)?;
        let schema = infer_schema(&parsed);
        let label_column = request
            .label_column
            .clone()
            .or_else(|| detect_label_column(&parsed.headers))
            .ok_or_else(|| CoreError::InvalidInput("no label column found".to_string()))?;
        let built = build_features(&parsed, &schema, Some(&label_column), FeatureMode::Training)?;
        let y = built
            .y
            .ok_or_else(|| CoreError::InvalidInput("label column produced no labels".to_string()))?;
        validate_binary_labels(&y)?;
        tracing::info!(
            %bakeoff_id,
            samples = built.x.nrows(),
            features = built.x.ncols(),
            candidates = request.candidates.len(),
            label = %label_column,
            "bake-off training started"
        );

        let total = request.candidates.len();
        let is_cancelled = || cancel.as_ref().map(|c| c.load(Ordering::Relaxed)).unwrap_or(false);

        let results: Vec<CandidateResult> = if request.parallel {
            let done = AtomicUsize::new(0);
            request
                .candidates
                .par_iter()
                .map(|spec| {
                    let result = if is_cancelled() {
                        placeholder(spec, "cancelled before training".to_string())
                    } else {
                        train_candidate(
                            spec,
                            &built.x.view(),
                            &y,
                            &built.feature_names,
                            &built.context,
                            request.review_rate,
                        )
                    };
                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    emit(
                        progress.as_ref(),
                        Progress {
                            done: finished,
                            total,
                            current_algorithm: spec.algorithm.tag().to_string(),
                        },
                    );
                    result
                })
                .collect()
        } else {
            let mut results = Vec::with_capacity(total);
            for (index, spec) in request.candidates.iter().enumerate() {
                // Cancellation is cooperative and only observed here, at
                // the candidate boundary.
                if is_cancelled() {
                    return Err(BakeoffError::Cancelled { done: index, total });
                }
                let result = train_candidate(
                    spec,
                    &built.x.view(),
                    &y,
                    &built.feature_names,
                    &built.context,
                    request.review_rate,
                );
                emit(
                    progress.as_ref(),
                    Progress {
                        done: index + 1,
                        total,
                        current_algorithm: spec.algorithm.tag().to_string(),
                    },
                );
                results.push(result);
            }
            results
        };

        if request.parallel && is_cancelled() {
            let done = results.iter().filter(|r| r.error.is_none()).count();
            return Err(BakeoffError::Cancelled { done, total });
        }

        // Record candidates in order; a replayed index resynchronizes the
        // counter instead of erroring.
        let mut recorded = 0usize;
        for (index, result) in results.iter().enumerate() {
            let payload = json!({
                "algorithm": result.spec.algorithm.tag(),
                "hyperparams": result.spec.hyperparams,
                "metrics": result.metrics,
                "error": result.error,
            });
            match self.repo.upsert_candidate(bakeoff_id, index, payload).await? {
                UpsertOutcome::Inserted => recorded += 1,
                UpsertOutcome::AlreadyPresent => {
                    recorded = self.repo.get_bakeoff(bakeoff_id).await?.candidates_done;
                }
            }
        }
        tracing::debug!(%bakeoff_id, recorded, "candidate rows recorded");

        if results.iter().all(|r| r.error.is_some()) {
            return Err(BakeoffError::AllCandidatesFailed(total));
        }

        let metrics_list: Vec<MetricsResult> = results.iter().map(|r| r.metrics).collect();
        let ranking = rubric::apply(&metrics_list, &request.rubric)?;
        let algorithms: Vec<String> =
            results.iter().map(|r| r.spec.algorithm.tag().to_string()).collect();
        let narrative_input = NarrativeInput {
            algorithms: &algorithms,
            metrics: &metrics_list,
            champion_importance: &results[ranking.champion_index].importance,
        };
        let summary = short_summary(&ranking, &narrative_input);
        let report = long_report(&ranking, &narrative_input, &request.rubric);

        let champion_artifact_url = match &request.artifact_url_prefix {
            Some(prefix) => {
                for (index, result) in results.iter().enumerate() {
                    self.blob
                        .put(&format!("{prefix}/candidate-{index}.json"), &result.artifact)
                        .await?;
                }
                Some(format!("{prefix}/candidate-{}.json", ranking.champion_index))
            }
            None => None,
        };

        self.repo
            .update_bakeoff_status(bakeoff_id, BakeoffStatus::Completed, Some(summary.clone()))
            .await?;
        tracing::info!(%bakeoff_id, champion = %algorithms[ranking.champion_index], "bake-off completed");

        Ok(BakeoffOutcome {
            bakeoff_id,
            candidates: results,
            ranking,
            summary,
            report,
            champion_artifact_url,
        })
    }
}

/// Trains and evaluates one candidate. Every failure mode collapses to a
/// zero-metric placeholder so the caller can keep the slot.
fn train_candidate(
    spec: &CandidateSpec,
    x: &ArrayView2<'_, f64>,
    y: &[f64],
    feature_names: &[String],
    context: &NormalizationContext,
    review_rate: f64,
) -> CandidateResult {
    let model = match models::train(spec.algorithm, x, y, &spec.hyperparams, feature_names) {
        Ok(model) => model,
        Err(e) => {
            tracing::warn!(algorithm = %spec.algorithm, error = %e, "candidate failed to train");
            return placeholder(spec, training_failure(spec, &e.to_string()));
        }
    };

    let scores = model.predict_batch(x);
    let candidate_metrics = match metrics::evaluate(&scores, y, review_rate, spec.algorithm) {
        Ok(m) => m,
        Err(e) => return placeholder(spec, training_failure(spec, &e.to_string())),
    };
    let importance = metrics::permutation_importance(&model, x, y, None);

    match models::serialize_artifact(&model, context) {
        Ok(artifact) => CandidateResult {
            spec: spec.clone(),
            metrics: candidate_metrics,
            importance,
            artifact,
            error: None,
        },
        Err(e) => {
            tracing::warn!(algorithm = %spec.algorithm, error = %e, "candidate failed to serialize");
            placeholder(spec, training_failure(spec, &e.to_string()))
        }
    }
}

fn training_failure(spec: &CandidateSpec, message: &str) -> String {
    CoreError::Training {
        algorithm: spec.algorithm.tag().to_string(),
        message: message.to_string(),
    }
    .to_string()
}

fn placeholder(spec: &CandidateSpec, message: String) -> CandidateResult {
    let artifact = json!({
        "algorithm": spec.algorithm.tag(),
        "error": message.clone(),
    });
    CandidateResult {
        spec: spec.clone(),
        metrics: MetricsResult::zeroed(),
        importance: BTreeMap::new(),
        artifact: artifact.to_string().into_bytes(),
        error: Some(message),
    }
}
