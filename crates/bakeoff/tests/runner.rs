use bakeoff::{BakeoffRequest, BakeoffRunner};
use core_types::{BakeoffStatus, DatasetFormat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{BlobStore, RunRepository};
use tokio::sync::mpsc;

/// 120 deterministic wires, ~10% anomalous with strong signal.
fn wire_csv() -> String {
    let mut csv = String::from("WireId,Amount,InitiatedAt,Country,CallbackPerformed,IsAnomaly\n");
    for i in 0..120 {
        let anomalous = i % 10 == 3;
        let amount = if anomalous { 250_000.0 + (i as f64) * 11.0 } else { 500.0 + (i as f64) * 7.0 };
        let hour = if anomalous { 2 } else { 9 + (i % 8) };
        let country = match (anomalous, i % 3) {
            (true, _) => "KP",
            (false, 0) => "US",
            (false, 1) => "GB",
            _ => "DE",
        };
        csv.push_str(&format!(
            "w-{i},${amount:.2},2024-02-{day:02}T{hour:02}:45:00Z,{country},{cb},{label}\n",
            day = (i % 28) + 1,
            cb = if anomalous { 0 } else { 1 },
            label = if anomalous { 1 } else { 0 },
        ));
    }
    csv
}

async fn dataset_url(dir: &std::path::Path, csv: &str) -> String {
    let path = dir.join("train.csv");
    tokio::fs::write(&path, csv).await.unwrap();
    path.display().to_string()
}

#[tokio::test]
async fn full_bakeoff_trains_ranks_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let url = dataset_url(dir.path(), &wire_csv()).await;
    let repo = RunRepository::new();
    let runner = BakeoffRunner::new(BlobStore::new(), repo.clone());

    let mut request = BakeoffRequest::new(&url, DatasetFormat::Csv);
    request.review_rate = 0.1;
    let (sender, mut receiver) = mpsc::unbounded_channel();

    let outcome = runner.run(&request, Some(sender), None).await.unwrap();

    // all five default candidates, in input order
    assert_eq!(outcome.candidates.len(), 5);
    assert_eq!(outcome.candidates[0].spec.algorithm.tag(), "log_reg");
    assert!(outcome.candidates.iter().all(|c| c.error.is_none()));
    for candidate in &outcome.candidates {
        let m = &candidate.metrics;
        for value in [m.pr_auc, m.recall_at_review_rate, m.precision_at_review_rate, m.stability] {
            assert!((0.0..=1.0).contains(&value));
        }
        let importance_total: f64 = candidate.importance.values().sum();
        assert!((importance_total - 1.0).abs() < 1e-6);
    }

    assert!(outcome.report.contains("# Model Bake-off Report"));
    assert!(!outcome.summary.is_empty());

    // one progress event per candidate, done counts reaching the total
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 5);
    assert_eq!(events.last().unwrap().done, 5);

    // the storage row reflects completion
    let row = repo.get_bakeoff(outcome.bakeoff_id).await.unwrap();
    assert_eq!(row.status, BakeoffStatus::Completed);
    assert_eq!(row.candidates_done, 5);
    let candidates = repo.get_candidates(outcome.bakeoff_id).await.unwrap();
    assert_eq!(candidates.len(), 5);
    assert_eq!(candidates[2].1["algorithm"], "random_forest");
}

#[tokio::test]
async fn champion_selection_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let url = dataset_url(dir.path(), &wire_csv()).await;
    let runner = BakeoffRunner::new(BlobStore::new(), RunRepository::new());

    let mut request = BakeoffRequest::new(&url, DatasetFormat::Csv);
    request.review_rate = 0.1;

    let first = runner.run(&request, None, None).await.unwrap();
    let second = runner.run(&request, None, None).await.unwrap();
    assert_eq!(first.ranking.champion_index, second.ranking.champion_index);
    for (a, b) in first.candidates.iter().zip(second.candidates.iter()) {
        assert_eq!(a.artifact, b.artifact);
    }
}

#[tokio::test]
async fn single_class_dataset_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("Amount,IsAnomaly\n");
    for i in 0..20 {
        csv.push_str(&format!("{},1\n", 100 + i));
    }
    let url = dataset_url(dir.path(), &csv).await;
    let repo = RunRepository::new();
    let runner = BakeoffRunner::new(BlobStore::new(), repo.clone());

    let err = runner
        .run(&BakeoffRequest::new(&url, DatasetFormat::Csv), None, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no negative labels"));
}

#[tokio::test]
async fn cancellation_stops_at_the_candidate_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let url = dataset_url(dir.path(), &wire_csv()).await;
    let repo = RunRepository::new();
    let runner = BakeoffRunner::new(BlobStore::new(), repo.clone());

    let cancel = Arc::new(AtomicBool::new(true));
    cancel.store(true, Ordering::Relaxed);
    let request = BakeoffRequest::new(&url, DatasetFormat::Csv);
    let err = runner.run(&request, None, Some(cancel)).await.unwrap_err();
    assert!(err.to_string().contains("cancelled"));
}

#[tokio::test]
async fn parallel_training_matches_sequential_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let url = dataset_url(dir.path(), &wire_csv()).await;
    let runner = BakeoffRunner::new(BlobStore::new(), RunRepository::new());

    let mut sequential = BakeoffRequest::new(&url, DatasetFormat::Csv);
    sequential.review_rate = 0.1;
    let mut parallel = sequential.clone();
    parallel.parallel = true;

    let a = runner.run(&sequential, None, None).await.unwrap();
    let b = runner.run(&parallel, None, None).await.unwrap();
    assert_eq!(a.ranking.champion_index, b.ranking.champion_index);
    for (left, right) in a.candidates.iter().zip(b.candidates.iter()) {
        assert_eq!(left.artifact, right.artifact);
        assert_eq!(left.metrics, right.metrics);
    }
}
