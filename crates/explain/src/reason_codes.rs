use crate::error::ExplainError;
use core_types::{Contribution, ReasonCode};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

const MAX_CODES_PER_FINDING: usize = 5;

/// A template only fires off feature *values* when one of these holds.
#[derive(Debug, Clone, Copy)]
enum ValueTrigger {
    /// Feature value at or above this threshold.
    AtLeast(f64),
    /// Feature value exactly this (used for "control absent" flags,
    /// e.g. a callback that was never performed).
    Equals(f64),
}

#[derive(Debug)]
struct ReasonTemplate {
    code: &'static str,
    description: &'static str,
    patterns: Vec<Regex>,
    min_abs_shap: f64,
    value_trigger: Option<ValueTrigger>,
}

impl ReasonTemplate {
    fn matches_name(&self, feature_name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(feature_name))
    }
}

/// Maps feature names plus SHAP magnitudes to a small ranked list of
/// human-readable reason codes. The template table is fixed; patterns
/// are case-insensitive regexes over feature names.
#[derive(Debug)]
pub struct ReasonCodeEngine {
    templates: Vec<ReasonTemplate>,
}

/// Global importance above this level triggers a matched template even
/// when the row-local evidence is weak.
const IMPORTANCE_FALLBACK: f64 = 0.05;

impl ReasonCodeEngine {
    /// Builds the engine with the builtin template table.
    pub fn builtin() -> Result<Self, ExplainError> {
        let spec: [(&'static str, &'static str, &[&str], f64, Option<ValueTrigger>); 8] = [
            (
                "AMOUNT_ABOVE_BASELINE",
                "Transfer amount deviates sharply from the account's historical baseline",
                &["amount"],
                0.01,
                Some(ValueTrigger::AtLeast(2.0)),
            ),
            (
                "OUT_OF_HOURS",
                "Transfer was initiated outside normal business hours",
                &["out_?of_?hours"],
                0.01,
                Some(ValueTrigger::AtLeast(1.0)),
            ),
            (
                "WEEKEND_ACTIVITY",
                "Transfer was initiated on a weekend",
                &["weekend"],
                0.01,
                Some(ValueTrigger::AtLeast(1.0)),
            ),
            (
                "HIGH_RISK_CORRIDOR",
                "Destination sits in a high-risk corridor",
                &["country", "corridor", "destination", "beneficiary"],
                0.02,
                None,
            ),
            (
                "CALLBACK_BYPASS",
                "Callback verification was not performed",
                &["callback"],
                0.01,
                Some(ValueTrigger::Equals(0.0)),
            ),
            (
                "SOD_EXCEPTION",
                "Initiator and approver are not segregated",
                &["sod", "segregation", "same_?user", "self_?approv"],
                0.01,
                Some(ValueTrigger::AtLeast(1.0)),
            ),
            (
                "BURST_ACTIVITY",
                "Part of an unusual burst of transfers in a short window",
                &["burst", "velocity", "txn_?count", "frequency"],
                0.02,
                None,
            ),
            (
                "IRREGULAR_APPROVAL",
                "Approval pattern deviates from the usual policy path",
                &["approv"],
                0.02,
                None,
            ),
        ];

        let mut templates = Vec::with_capacity(spec.len());
        for (code, description, patterns, min_abs_shap, value_trigger) in spec {
            let compiled = patterns
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .collect::<Result<Vec<_>, _>>()?;
            templates.push(ReasonTemplate {
                code,
                description,
                patterns: compiled,
                min_abs_shap,
                value_trigger,
            });
        }
        Ok(Self { templates })
    }

    /// Collects the reason codes for one scored row.
    ///
    /// A template fires when one of its patterns matches a feature and
    /// that feature satisfies the value trigger, carries enough |SHAP|,
    /// or (as a last resort) carries global importance above 0.05.
    /// Matches are ranked by the triggering feature's |SHAP| (falling
    /// back to its importance) and capped at five.
    pub fn codes_for_row(
        &self,
        feature_names: &[String],
        row: &[f64],
        shap: Option<&[f64]>,
        importance: &BTreeMap<String, f64>,
    ) -> Vec<ReasonCode> {
        let mut matched: Vec<(f64, ReasonCode)> = Vec::new();

        for template in &self.templates {
            let mut best: Option<f64> = None;
            for (j, name) in feature_names.iter().enumerate() {
                if !template.matches_name(name) {
                    continue;
                }
                let value = row[j];
                let abs_shap = shap.map(|s| s[j].abs()).unwrap_or(0.0);
                let feature_importance = importance.get(name).copied().unwrap_or(0.0);

                let value_hit = match template.value_trigger {
                    Some(ValueTrigger::AtLeast(threshold)) => value >= threshold,
                    Some(ValueTrigger::Equals(expected)) => value == expected,
                    None => false,
                };
                let shap_hit = abs_shap >= template.min_abs_shap;
                let importance_hit = feature_importance > IMPORTANCE_FALLBACK;

                if value_hit || shap_hit || importance_hit {
                    let strength = if abs_shap > 0.0 { abs_shap } else { feature_importance };
                    best = Some(best.map_or(strength, |b: f64| b.max(strength)));
                }
            }
            if let Some(strength) = best {
                matched.push((
                    strength,
                    ReasonCode {
                        code: template.code.to_string(),
                        description: template.description.to_string(),
                        contribution: Contribution::from_magnitude(strength),
                    },
                ));
            }
        }

        matched.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        matched.truncate(MAX_CODES_PER_FINDING);
        matched.into_iter().map(|(_, code)| code).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn callback_bypass_fires_on_zero_value() {
        let engine = ReasonCodeEngine::builtin().unwrap();
        let feature_names = names(&["CallbackPerformed", "Amount"]);
        let codes = engine.codes_for_row(
            &feature_names,
            &[0.0, 0.5],
            Some(&[0.002, 0.001]),
            &BTreeMap::new(),
        );
        assert!(codes.iter().any(|c| c.code == "CALLBACK_BYPASS"));
    }

    #[test]
    fn callback_present_does_not_fire() {
        let engine = ReasonCodeEngine::builtin().unwrap();
        let feature_names = names(&["CallbackPerformed"]);
        let codes =
            engine.codes_for_row(&feature_names, &[1.0], Some(&[0.001]), &BTreeMap::new());
        assert!(codes.is_empty());
    }

    #[test]
    fn codes_rank_by_shap_magnitude_and_cap_at_five() {
        let engine = ReasonCodeEngine::builtin().unwrap();
        let feature_names = names(&[
            "Amount_zScore",
            "InitiatedAt_isOutOfHours",
            "InitiatedAt_isWeekend",
            "Country_NG",
            "CallbackPerformed",
            "SodException",
            "TxnCount24h",
            "ApprovalHops",
        ]);
        let row = [3.0, 1.0, 1.0, 1.0, 0.0, 1.0, 2.0, 2.0];
        let shap = [0.5, 0.2, 0.1, 0.4, 0.3, 0.15, 0.25, 0.05];
        let codes =
            engine.codes_for_row(&feature_names, &row, Some(&shap), &BTreeMap::new());
        assert_eq!(codes.len(), 5);
        assert_eq!(codes[0].code, "AMOUNT_ABOVE_BASELINE");
        assert_eq!(codes[0].contribution, Contribution::High);
    }

    #[test]
    fn importance_is_a_last_resort_trigger() {
        let engine = ReasonCodeEngine::builtin().unwrap();
        let feature_names = names(&["Country_RU"]);
        let mut importance = BTreeMap::new();
        importance.insert("Country_RU".to_string(), 0.2);
        // no SHAP available and the one-hot is 0 for this row
        let codes = engine.codes_for_row(&feature_names, &[0.0], None, &importance);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].code, "HIGH_RISK_CORRIDOR");
    }

    #[test]
    fn weak_evidence_produces_no_codes() {
        let engine = ReasonCodeEngine::builtin().unwrap();
        let feature_names = names(&["Amount", "Country_US"]);
        let codes = engine.codes_for_row(
            &feature_names,
            &[0.1, 1.0],
            Some(&[0.001, 0.001]),
            &BTreeMap::new(),
        );
        assert!(codes.is_empty());
    }
}
