use crate::error::RubricError;
use core_types::{MetricsResult, RubricConfig};
use serde::Serialize;
use std::cmp::Ordering;

pub mod error;
pub mod narrative;

pub use narrative::{long_report, short_summary, NarrativeInput};

/// One candidate's position in the rubric's ranking. `index` is the
/// candidate's position in the input list, preserved so callers can map
/// back to configs and artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub index: usize,
    pub score: f64,
    pub passed_constraints: bool,
}

/// Result of applying the rubric: a full ranking, the champion's
/// original index, and whether the recall-only fallback was used.
#[derive(Debug, Clone, Serialize)]
pub struct RubricOutcome {
    pub ranking: Vec<RankedCandidate>,
    pub champion_index: usize,
    pub fallback_used: bool,
}

/// Applies the two-phase rubric: a hard constraint filter, then a
/// weighted ranking of the survivors. When nothing survives, all
/// candidates are ranked by Recall@RR descending instead. Sorts are
/// stable, so ties preserve input order.
pub fn apply(
    metrics: &[MetricsResult],
    config: &RubricConfig,
) -> Result<RubricOutcome, RubricError> {
    if metrics.is_empty() {
        return Err(RubricError::NoCandidates);
    }
    validate_config(config)?;

    let weighted = |m: &MetricsResult| -> f64 {
        let w = &config.weights;
        w.recall_at_review_rate * m.recall_at_review_rate
            + w.pr_auc * m.pr_auc
            + w.precision_at_review_rate * m.precision_at_review_rate
            + w.stability * m.stability
            + w.explainability * m.explainability
    };

    let passes = |m: &MetricsResult| -> bool {
        m.recall_at_review_rate >= config.constraints.min_recall_at_review_rate
            && m.precision_at_review_rate >= config.constraints.min_precision_at_review_rate
    };

    let mut ranking: Vec<RankedCandidate> = metrics
        .iter()
        .enumerate()
        .map(|(index, m)| RankedCandidate {
            index,
            score: weighted(m),
            passed_constraints: passes(m),
        })
        .collect();

    let any_passed = ranking.iter().any(|c| c.passed_constraints);
    if any_passed {
        // Survivors first, by weighted score; failed candidates trail in
        // score order for reporting.
        ranking.sort_by(|a, b| {
            b.passed_constraints
                .cmp(&a.passed_constraints)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        });
    } else {
        ranking.sort_by(|a, b| {
            metrics[b.index]
                .recall_at_review_rate
                .partial_cmp(&metrics[a.index].recall_at_review_rate)
                .unwrap_or(Ordering::Equal)
        });
        tracing::warn!("no candidate passed the rubric constraints; falling back to recall ranking");
    }

    let champion_index = ranking[0].index;
    Ok(RubricOutcome { ranking, champion_index, fallback_used: !any_passed })
}

fn validate_config(config: &RubricConfig) -> Result<(), RubricError> {
    let c = &config.constraints;
    for (name, value) in [
        ("minRecallAtReviewRate", c.min_recall_at_review_rate),
        ("minPrecisionAtReviewRate", c.min_precision_at_review_rate),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(RubricError::InvalidConfig(format!(
                "constraint {name} must be in [0, 1], got {value}"
            )));
        }
    }
    let w = &config.weights;
    for (name, value) in [
        ("recallAtReviewRate", w.recall_at_review_rate),
        ("prAuc", w.pr_auc),
        ("precisionAtReviewRate", w.precision_at_review_rate),
        ("stability", w.stability),
        ("explainability", w.explainability),
    ] {
        if !value.is_finite() {
            return Err(RubricError::InvalidConfig(format!(
                "weight {name} must be finite"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(recall: f64, precision: f64) -> MetricsResult {
        MetricsResult {
            pr_auc: 0.5,
            recall_at_review_rate: recall,
            precision_at_review_rate: precision,
            f1: 0.0,
            stability: 1.0,
            explainability: 1.0,
        }
    }

    #[test]
    fn champion_is_best_weighted_survivor() {
        let candidates = vec![metrics(0.70, 0.10), metrics(0.90, 0.20), metrics(0.10, 0.01)];
        let outcome = apply(&candidates, &RubricConfig::default()).unwrap();
        assert_eq!(outcome.champion_index, 1);
        assert!(!outcome.fallback_used);
        assert!(outcome.ranking[0].passed_constraints);
        // the constraint-failing candidate trails
        assert_eq!(outcome.ranking[2].index, 2);
    }

    #[test]
    fn fallback_ranks_by_recall_when_nothing_passes() {
        let candidates = vec![metrics(0.50, 0.10), metrics(0.70, 0.05), metrics(0.40, 0.20)];
        let outcome = apply(&candidates, &RubricConfig::default()).unwrap();
        assert!(outcome.fallback_used);
        assert_eq!(outcome.champion_index, 1);
    }

    #[test]
    fn ties_preserve_input_order() {
        let candidates = vec![metrics(0.80, 0.20), metrics(0.80, 0.20)];
        let outcome = apply(&candidates, &RubricConfig::default()).unwrap();
        assert_eq!(outcome.champion_index, 0);
        let again = apply(&candidates, &RubricConfig::default()).unwrap();
        assert_eq!(again.champion_index, 0);
    }

    #[test]
    fn empty_candidate_list_is_rejected() {
        assert!(matches!(
            apply(&[], &RubricConfig::default()),
            Err(RubricError::NoCandidates)
        ));
    }

    #[test]
    fn out_of_range_constraints_are_rejected() {
        let mut config = RubricConfig::default();
        config.constraints.min_recall_at_review_rate = 1.5;
        assert!(matches!(
            apply(&[metrics(0.5, 0.5)], &config),
            Err(RubricError::InvalidConfig(_))
        ));
    }
}
