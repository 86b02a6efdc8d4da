use crate::error::StorageError;
use chrono::{DateTime, Utc};
use core_types::{BakeoffStatus, CandidateSpec, ScoringRunStatus, ScoringSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Represents a row in the bake-off table. Progress fields are updated
/// mid-run; candidates are appended in order, never reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BakeoffRow {
    pub bakeoff_id: Uuid,
    pub status: BakeoffStatus,
    pub candidate_count: usize,
    pub candidates_done: usize,
    pub candidate_configs: Vec<CandidateSpec>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Represents a row in the scoring-run table. Once `Scored`, the summary
/// is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRunRow {
    pub run_id: Uuid,
    pub status: ScoringRunStatus,
    pub summary: Option<ScoringSummary>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an idempotent candidate upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// The (bakeoff, index) pair was already written; the caller should
    /// resynchronize its counter from the row instead of erroring.
    AlreadyPresent,
}

#[derive(Debug, Default)]
struct Tables {
    bakeoffs: HashMap<Uuid, BakeoffRow>,
    candidates: HashMap<(Uuid, usize), JsonValue>,
    scoring_runs: HashMap<Uuid, ScoringRunRow>,
}

/// The `RunRepository` provides a high-level, application-specific
/// interface to run state. Writes are transactional at the row level;
/// status transitions are validated against the lifecycle rules.
#[derive(Debug, Clone, Default)]
pub struct RunRepository {
    tables: Arc<Mutex<Tables>>,
}

impl RunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_bakeoff(
        &self,
        bakeoff_id: Uuid,
        candidate_configs: Vec<CandidateSpec>,
    ) -> Result<BakeoffRow, StorageError> {
        let row = BakeoffRow {
            bakeoff_id,
            status: BakeoffStatus::Queued,
            candidate_count: candidate_configs.len(),
            candidates_done: 0,
            candidate_configs,
            message: None,
            created_at: Utc::now(),
        };
        self.tables.lock().await.bakeoffs.insert(bakeoff_id, row.clone());
        Ok(row)
    }

    pub async fn get_bakeoff(&self, bakeoff_id: Uuid) -> Result<BakeoffRow, StorageError> {
        self.tables
            .lock()
            .await
            .bakeoffs
            .get(&bakeoff_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("bakeoff {bakeoff_id}")))
    }

    pub async fn update_bakeoff_status(
        &self,
        bakeoff_id: Uuid,
        status: BakeoffStatus,
        message: Option<String>,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        let row = tables
            .bakeoffs
            .get_mut(&bakeoff_id)
            .ok_or_else(|| StorageError::NotFound(format!("bakeoff {bakeoff_id}")))?;
        if !row.status.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: format!("{:?}", row.status),
                to: format!("{status:?}"),
            });
        }
        row.status = status;
        if message.is_some() {
            row.message = message;
        }
        Ok(())
    }

    /// Idempotent upsert keyed by (bakeoff, candidate index). A repeat
    /// write for an already-trained index leaves the stored payload
    /// untouched and reports `AlreadyPresent` so the caller can resync
    /// its done-counter.
    pub async fn upsert_candidate(
        &self,
        bakeoff_id: Uuid,
        candidate_index: usize,
        payload: JsonValue,
    ) -> Result<UpsertOutcome, StorageError> {
        let mut tables = self.tables.lock().await;
        if !tables.bakeoffs.contains_key(&bakeoff_id) {
            return Err(StorageError::NotFound(format!("bakeoff {bakeoff_id}")));
        }
        let key = (bakeoff_id, candidate_index);
        if tables.candidates.contains_key(&key) {
            tracing::debug!(%bakeoff_id, candidate_index, "candidate already recorded");
            return Ok(UpsertOutcome::AlreadyPresent);
        }
        tables.candidates.insert(key, payload);
        let row = tables
            .bakeoffs
            .get_mut(&bakeoff_id)
            .ok_or_else(|| StorageError::NotFound(format!("bakeoff {bakeoff_id}")))?;
        row.candidates_done += 1;
        Ok(UpsertOutcome::Inserted)
    }

    pub async fn get_candidates(
        &self,
        bakeoff_id: Uuid,
    ) -> Result<Vec<(usize, JsonValue)>, StorageError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<(usize, JsonValue)> = tables
            .candidates
            .iter()
            .filter(|((id, _), _)| *id == bakeoff_id)
            .map(|((_, index), payload)| (*index, payload.clone()))
            .collect();
        rows.sort_by_key(|(index, _)| *index);
        Ok(rows)
    }

    pub async fn create_scoring_run(&self, run_id: Uuid) -> Result<ScoringRunRow, StorageError> {
        let row = ScoringRunRow {
            run_id,
            status: ScoringRunStatus::Created,
            summary: None,
            message: None,
            created_at: Utc::now(),
        };
        self.tables.lock().await.scoring_runs.insert(run_id, row.clone());
        Ok(row)
    }

    pub async fn get_scoring_run(&self, run_id: Uuid) -> Result<ScoringRunRow, StorageError> {
        self.tables
            .lock()
            .await
            .scoring_runs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("scoring run {run_id}")))
    }

    pub async fn update_scoring_status(
        &self,
        run_id: Uuid,
        status: ScoringRunStatus,
        message: Option<String>,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        let row = tables
            .scoring_runs
            .get_mut(&run_id)
            .ok_or_else(|| StorageError::NotFound(format!("scoring run {run_id}")))?;
        if !row.status.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: format!("{:?}", row.status),
                to: format!("{status:?}"),
            });
        }
        row.status = status;
        if message.is_some() {
            row.message = message;
        }
        Ok(())
    }

    /// Records the summary while moving the run to `Scored`. The summary
    /// can only be written once; `Scored` is terminal.
    pub async fn finish_scoring_run(
        &self,
        run_id: Uuid,
        summary: ScoringSummary,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        let row = tables
            .scoring_runs
            .get_mut(&run_id)
            .ok_or_else(|| StorageError::NotFound(format!("scoring run {run_id}")))?;
        if !row.status.can_transition_to(ScoringRunStatus::Scored) {
            return Err(StorageError::InvalidTransition {
                from: format!("{:?}", row.status),
                to: "Scored".to_string(),
            });
        }
        row.status = ScoringRunStatus::Scored;
        row.summary = Some(summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{AlgorithmId, Hyperparams};
    use serde_json::json;

    fn specs() -> Vec<CandidateSpec> {
        vec![
            CandidateSpec { algorithm: AlgorithmId::LogReg, hyperparams: Hyperparams::default() },
            CandidateSpec {
                algorithm: AlgorithmId::DecisionTree,
                hyperparams: Hyperparams::default(),
            },
        ]
    }

    #[tokio::test]
    async fn candidate_upserts_are_idempotent() {
        let repo = RunRepository::new();
        let id = Uuid::new_v4();
        repo.create_bakeoff(id, specs()).await.unwrap();

        let first = repo.upsert_candidate(id, 0, json!({"algorithm": "log_reg"})).await.unwrap();
        assert_eq!(first, UpsertOutcome::Inserted);
        let second = repo.upsert_candidate(id, 0, json!({"algorithm": "other"})).await.unwrap();
        assert_eq!(second, UpsertOutcome::AlreadyPresent);

        let row = repo.get_bakeoff(id).await.unwrap();
        assert_eq!(row.candidates_done, 1);
        // the original payload survived the replay
        let candidates = repo.get_candidates(id).await.unwrap();
        assert_eq!(candidates[0].1["algorithm"], "log_reg");
    }

    #[tokio::test]
    async fn terminal_bakeoff_rejects_further_transitions() {
        let repo = RunRepository::new();
        let id = Uuid::new_v4();
        repo.create_bakeoff(id, specs()).await.unwrap();
        repo.update_bakeoff_status(id, BakeoffStatus::Running, None).await.unwrap();
        repo.update_bakeoff_status(id, BakeoffStatus::Completed, None).await.unwrap();
        let err = repo.update_bakeoff_status(id, BakeoffStatus::Failed, None).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn scoring_run_walks_its_lifecycle() {
        let repo = RunRepository::new();
        let id = Uuid::new_v4();
        repo.create_scoring_run(id).await.unwrap();
        repo.update_scoring_status(id, ScoringRunStatus::Validated, None).await.unwrap();
        repo.update_scoring_status(id, ScoringRunStatus::Scoring, None).await.unwrap();
        let summary = ScoringSummary {
            review_rate: 0.005,
            threshold_used: 0.9,
            flagged_count: 3,
            row_count: 600,
            metrics_if_labels_present: None,
            global_shap_top_features: vec![],
        };
        repo.finish_scoring_run(id, summary.clone()).await.unwrap();

        let row = repo.get_scoring_run(id).await.unwrap();
        assert_eq!(row.status, ScoringRunStatus::Scored);
        assert_eq!(row.summary.unwrap().flagged_count, 3);

        // scored is terminal: no re-scoring, no second summary
        let err = repo.finish_scoring_run(id, summary).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }));
    }
}
