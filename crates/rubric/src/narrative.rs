use crate::RubricOutcome;
use core_types::{MetricsResult, RubricConfig};
use std::collections::BTreeMap;

/// Everything the narrative generator needs about the candidate field.
/// Slices are in input (candidate) order.
pub struct NarrativeInput<'a> {
    pub algorithms: &'a [String],
    pub metrics: &'a [MetricsResult],
    /// The champion's permutation-importance map.
    pub champion_importance: &'a BTreeMap<String, f64>,
}

/// A single human-readable sentence naming the champion.
pub fn short_summary(outcome: &RubricOutcome, input: &NarrativeInput<'_>) -> String {
    let champion = &input.algorithms[outcome.champion_index];
    let m = &input.metrics[outcome.champion_index];
    if outcome.fallback_used {
        format!(
            "No candidate met both rubric constraints; promoted {champion} on recall alone \
             (Recall@RR {:.3}, Precision@RR {:.3}).",
            m.recall_at_review_rate, m.precision_at_review_rate
        )
    } else {
        format!(
            "Promoted {champion} with PR-AUC {:.3}, Recall@RR {:.3} and Precision@RR {:.3}.",
            m.pr_auc, m.recall_at_review_rate, m.precision_at_review_rate
        )
    }
}

/// The long Markdown report: champion metrics, constraint pass/fail,
/// per-candidate comparison, top importance, and the rubric weights.
pub fn long_report(
    outcome: &RubricOutcome,
    input: &NarrativeInput<'_>,
    config: &RubricConfig,
) -> String {
    let mut out = String::new();
    let champion = &input.algorithms[outcome.champion_index];
    let champion_metrics = &input.metrics[outcome.champion_index];

    out.push_str("# Model Bake-off Report\n\n");
    out.push_str(&format!("**Champion:** `{champion}`\n\n"));
    out.push_str(&format!("{}\n\n", short_summary(outcome, input)));

    out.push_str("## Champion metrics\n\n");
    out.push_str("| Metric | Value |\n|---|---|\n");
    for (name, value) in [
        ("PR-AUC", champion_metrics.pr_auc),
        ("Recall@RR", champion_metrics.recall_at_review_rate),
        ("Precision@RR", champion_metrics.precision_at_review_rate),
        ("F1", champion_metrics.f1),
        ("Stability", champion_metrics.stability),
        ("Explainability", champion_metrics.explainability),
    ] {
        out.push_str(&format!("| {name} | {value:.4} |\n"));
    }

    out.push_str("\n## Constraints\n\n");
    let c = &config.constraints;
    out.push_str(&format!(
        "- Recall@RR >= {:.2}: {}\n",
        c.min_recall_at_review_rate,
        pass_mark(champion_metrics.recall_at_review_rate >= c.min_recall_at_review_rate)
    ));
    out.push_str(&format!(
        "- Precision@RR >= {:.2}: {}\n",
        c.min_precision_at_review_rate,
        pass_mark(champion_metrics.precision_at_review_rate >= c.min_precision_at_review_rate)
    ));
    if outcome.fallback_used {
        out.push_str("\nNo candidate satisfied both constraints; ranking fell back to Recall@RR.\n");
    }

    out.push_str("\n## Candidate comparison\n\n");
    out.push_str("| Rank | Algorithm | Score | PR-AUC | Recall@RR | Precision@RR | Constraints |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for (position, ranked) in outcome.ranking.iter().enumerate() {
        let m = &input.metrics[ranked.index];
        out.push_str(&format!(
            "| {} | {} | {:.4} | {:.4} | {:.4} | {:.4} | {} |\n",
            position + 1,
            input.algorithms[ranked.index],
            ranked.score,
            m.pr_auc,
            m.recall_at_review_rate,
            m.precision_at_review_rate,
            pass_mark(ranked.passed_constraints),
        ));
    }

    out.push_str("\n## Top features (champion)\n\n");
    let mut ranked_features: Vec<(&String, &f64)> = input.champion_importance.iter().collect();
    ranked_features
        .sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (name, weight) in ranked_features.into_iter().take(5) {
        out.push_str(&format!("- `{name}`: {weight:.4}\n"));
    }

    out.push_str("\n## Rubric weights\n\n");
    let w = &config.weights;
    for (name, value) in [
        ("Recall@RR", w.recall_at_review_rate),
        ("PR-AUC", w.pr_auc),
        ("Precision@RR", w.precision_at_review_rate),
        ("Stability", w.stability),
        ("Explainability", w.explainability),
    ] {
        out.push_str(&format!("- {name}: {value:.2}\n"));
    }

    out
}

fn pass_mark(passed: bool) -> &'static str {
    if passed { "pass" } else { "fail" }
}
