pub mod engine;
pub mod error;
pub mod importance;

pub use engine::{evaluate, f1_score, pr_auc, precision_at_review_rate, recall_at_review_rate, stability};
pub use error::MetricsError;
pub use importance::permutation_importance;
