pub mod enums;
pub mod error;
pub mod rng;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{AlgorithmId, BakeoffStatus, ColumnType, Contribution, DatasetFormat, ScoringRunStatus};
pub use error::CoreError;
pub use rng::Lcg;
pub use structs::{
    CandidateSpec, Finding, Hyperparams, LabelledMetrics, MetricsResult, NormalizationContext,
    NumericStats, ReasonCode, RubricConfig, RubricConstraints, RubricWeights, ScoringSummary,
};
