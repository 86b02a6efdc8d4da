//! Stateless calculators for ranking-quality metrics over anomaly
//! scores. All outputs lie in [0, 1].

use crate::error::MetricsError;
use core_types::{AlgorithmId, MetricsResult};
use std::cmp::Ordering;

/// Area under the precision-recall curve by trapezoidal integration.
/// The walk visits samples in descending score order, recording a
/// (recall, precision) point per sample, with (0, 1) prepended. Zero
/// positives yield 0.
pub fn pr_auc(scores: &[f64], labels: &[f64]) -> f64 {
    let total_positives = labels.iter().filter(|y| **y >= 0.5).count();
    if total_positives == 0 || scores.is_empty() {
        return 0.0;
    }

    let order = descending_order(scores);

    let mut points: Vec<(f64, f64)> = Vec::with_capacity(scores.len() + 1);
    points.push((0.0, 1.0));
    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    for &i in &order {
        if labels[i] >= 0.5 {
            true_positives += 1;
        } else {
            false_positives += 1;
        }
        let recall = true_positives as f64 / total_positives as f64;
        let precision =
            true_positives as f64 / (true_positives + false_positives) as f64;
        points.push((recall, precision));
    }

    let mut area = 0.0;
    for window in points.windows(2) {
        let (r0, p0) = window[0];
        let (r1, p1) = window[1];
        if r1 > r0 {
            area += (r1 - r0) * (p0 + p1) / 2.0;
        }
    }
    area.clamp(0.0, 1.0)
}

/// Fraction of all positives caught in the top `review_rate` slice.
pub fn recall_at_review_rate(scores: &[f64], labels: &[f64], review_rate: f64) -> f64 {
    let (flagged_positives, _, total_positives) = top_slice_counts(scores, labels, review_rate);
    if total_positives == 0 {
        return 0.0;
    }
    flagged_positives as f64 / total_positives as f64
}

/// Fraction of the top `review_rate` slice that is actually positive.
pub fn precision_at_review_rate(scores: &[f64], labels: &[f64], review_rate: f64) -> f64 {
    let (flagged_positives, flagged_count, _) = top_slice_counts(scores, labels, review_rate);
    if flagged_count == 0 {
        return 0.0;
    }
    flagged_positives as f64 / flagged_count as f64
}

fn top_slice_counts(scores: &[f64], labels: &[f64], review_rate: f64) -> (usize, usize, usize) {
    if scores.is_empty() {
        return (0, 0, 0);
    }
    let k = ((review_rate * scores.len() as f64).round() as usize).max(1);
    let k = k.min(scores.len());
    let order = descending_order(scores);
    let flagged_positives = order[..k].iter().filter(|&&i| labels[i] >= 0.5).count();
    let total_positives = labels.iter().filter(|y| **y >= 0.5).count();
    (flagged_positives, k, total_positives)
}

/// Harmonic mean of precision and recall; 0 when both are 0.
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

/// Stability of Recall@RR across 3 contiguous folds (the last fold
/// absorbs the remainder). Folds with no positives do not qualify; with
/// fewer than 2 qualifying folds the model is trivially stable.
pub fn stability(scores: &[f64], labels: &[f64], review_rate: f64) -> f64 {
    let n = scores.len();
    let fold_size = n / 3;
    if fold_size == 0 {
        return 1.0;
    }

    let mut fold_recalls = Vec::with_capacity(3);
    for fold in 0..3 {
        let start = fold * fold_size;
        let end = if fold == 2 { n } else { start + fold_size };
        let fold_labels = &labels[start..end];
        if !fold_labels.iter().any(|y| *y >= 0.5) {
            continue;
        }
        fold_recalls.push(recall_at_review_rate(&scores[start..end], fold_labels, review_rate));
    }

    if fold_recalls.len() < 2 {
        return 1.0;
    }
    let mean = fold_recalls.iter().sum::<f64>() / fold_recalls.len() as f64;
    let variance = fold_recalls.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>()
        / fold_recalls.len() as f64;
    (1.0 - variance.sqrt()).clamp(0.0, 1.0)
}

/// Evaluates the full rubric metric set for one candidate's scores.
pub fn evaluate(
    scores: &[f64],
    labels: &[f64],
    review_rate: f64,
    algorithm: AlgorithmId,
) -> Result<MetricsResult, MetricsError> {
    if scores.len() != labels.len() {
        return Err(MetricsError::LengthMismatch {
            scores: scores.len(),
            labels: labels.len(),
        });
    }
    let recall = recall_at_review_rate(scores, labels, review_rate);
    let precision = precision_at_review_rate(scores, labels, review_rate);
    Ok(MetricsResult {
        pr_auc: pr_auc(scores, labels),
        recall_at_review_rate: recall,
        precision_at_review_rate: precision,
        f1: f1_score(precision, recall),
        stability: stability(scores, labels, review_rate),
        explainability: algorithm.explainability(),
    })
}

/// Indices sorted by descending score; ties keep their original order.
pub fn descending_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal)
    });
    order
}
