pub mod error;
pub mod reason_codes;
pub mod shap;

pub use error::ExplainError;
pub use reason_codes::ReasonCodeEngine;
pub use shap::{global_shap, local_shap, GlobalShap, ShapExplanation};
