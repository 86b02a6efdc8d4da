use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the supported training algorithms. The serialized
/// form doubles as the `algorithm` tag of a model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmId {
    LogReg,
    DecisionTree,
    ExtraTree,
    RandomForest,
    ExtraTrees,
    GradientBoosted,
}

impl AlgorithmId {
    /// The artifact tag for this algorithm.
    pub fn tag(&self) -> &'static str {
        match self {
            AlgorithmId::LogReg => "log_reg",
            AlgorithmId::DecisionTree => "decision_tree",
            AlgorithmId::ExtraTree => "extra_tree",
            AlgorithmId::RandomForest => "random_forest",
            AlgorithmId::ExtraTrees => "extra_trees",
            AlgorithmId::GradientBoosted => "gradient_boosted",
        }
    }

    /// Parses an artifact tag back into an algorithm identifier.
    pub fn from_tag(tag: &str) -> Result<Self, CoreError> {
        match tag {
            "log_reg" => Ok(AlgorithmId::LogReg),
            "decision_tree" => Ok(AlgorithmId::DecisionTree),
            "extra_tree" => Ok(AlgorithmId::ExtraTree),
            "random_forest" => Ok(AlgorithmId::RandomForest),
            "extra_trees" => Ok(AlgorithmId::ExtraTrees),
            "gradient_boosted" => Ok(AlgorithmId::GradientBoosted),
            other => Err(CoreError::ArtifactCorruption(format!(
                "unknown algorithm tag '{other}'"
            ))),
        }
    }

    /// Fixed explainability score used by the evaluation rubric.
    /// Linear and single-tree models are fully inspectable; ensembles less so.
    pub fn explainability(&self) -> f64 {
        match self {
            AlgorithmId::LogReg => 1.0,
            AlgorithmId::DecisionTree => 1.0,
            AlgorithmId::ExtraTree => 1.0,
            AlgorithmId::RandomForest => 0.8,
            AlgorithmId::ExtraTrees => 0.8,
            AlgorithmId::GradientBoosted => 0.9,
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The column types the schema layer can assign to a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    Currency,
    Categorical,
}

/// Declared format of a dataset blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Csv,
    Xlsx,
}

/// Lifecycle of a bake-off run. Terminal states absorb all transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BakeoffStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl BakeoffStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BakeoffStatus::Completed | BakeoffStatus::Failed)
    }

    pub fn can_transition_to(&self, next: BakeoffStatus) -> bool {
        match (self, next) {
            (BakeoffStatus::Queued, BakeoffStatus::Running) => true,
            (BakeoffStatus::Running, BakeoffStatus::Completed) => true,
            (BakeoffStatus::Running, BakeoffStatus::Failed) => true,
            _ => false,
        }
    }
}

/// Lifecycle of a scoring run. `Scored` permits re-reading but never
/// mutation of the summary or findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRunStatus {
    Created,
    Validated,
    Scoring,
    Scored,
    Failed,
}

impl ScoringRunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScoringRunStatus::Scored | ScoringRunStatus::Failed)
    }

    pub fn can_transition_to(&self, next: ScoringRunStatus) -> bool {
        match (self, next) {
            (ScoringRunStatus::Created, ScoringRunStatus::Validated) => true,
            (ScoringRunStatus::Created, ScoringRunStatus::Failed) => true,
            (ScoringRunStatus::Validated, ScoringRunStatus::Scoring) => true,
            (ScoringRunStatus::Validated, ScoringRunStatus::Failed) => true,
            (ScoringRunStatus::Scoring, ScoringRunStatus::Scored) => true,
            (ScoringRunStatus::Scoring, ScoringRunStatus::Failed) => true,
            _ => false,
        }
    }
}

/// Contribution tier attached to a reason code, derived from the
/// magnitude of the triggering feature's SHAP value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contribution {
    High,
    Medium,
    Low,
}

impl Contribution {
    pub fn from_magnitude(abs_shap: f64) -> Self {
        if abs_shap > 0.1 {
            Contribution::High
        } else if abs_shap > 0.03 {
            Contribution::Medium
        } else {
            Contribution::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_tags_round_trip() {
        for algo in [
            AlgorithmId::LogReg,
            AlgorithmId::DecisionTree,
            AlgorithmId::ExtraTree,
            AlgorithmId::RandomForest,
            AlgorithmId::ExtraTrees,
            AlgorithmId::GradientBoosted,
        ] {
            assert_eq!(AlgorithmId::from_tag(algo.tag()).unwrap(), algo);
        }
        assert!(AlgorithmId::from_tag("xgboost").is_err());
    }

    #[test]
    fn bakeoff_terminal_states_absorb() {
        assert!(BakeoffStatus::Queued.can_transition_to(BakeoffStatus::Running));
        assert!(!BakeoffStatus::Completed.can_transition_to(BakeoffStatus::Running));
        assert!(!BakeoffStatus::Failed.can_transition_to(BakeoffStatus::Queued));
        assert!(!BakeoffStatus::Queued.can_transition_to(BakeoffStatus::Completed));
    }

    #[test]
    fn scoring_lifecycle_is_linear() {
        assert!(ScoringRunStatus::Created.can_transition_to(ScoringRunStatus::Validated));
        assert!(ScoringRunStatus::Scoring.can_transition_to(ScoringRunStatus::Scored));
        assert!(!ScoringRunStatus::Scored.can_transition_to(ScoringRunStatus::Scoring));
        assert!(!ScoringRunStatus::Created.can_transition_to(ScoringRunStatus::Scoring));
    }

    #[test]
    fn contribution_tiers() {
        assert_eq!(Contribution::from_magnitude(0.2), Contribution::High);
        assert_eq!(Contribution::from_magnitude(0.05), Contribution::Medium);
        assert_eq!(Contribution::from_magnitude(0.01), Contribution::Low);
    }
}
