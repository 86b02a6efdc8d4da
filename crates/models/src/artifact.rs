use crate::error::ModelError;
use crate::forest::ForestModel;
use crate::gbt::GbtModel;
use crate::logistic::LogisticModel;
use crate::tree::Node;
use crate::{Model, TrainedModel};
use core_types::{AlgorithmId, CoreError, NormalizationContext};
use serde_json::{json, Map, Value};

/// Serializes a trained model into the language-neutral artifact
/// document: `algorithm` tag, `featureNames`, `normContext`, and the
/// algorithm-specific body. serde_json's map keeps keys sorted, so
/// identical models produce byte-identical artifacts.
pub fn serialize_artifact(
    model: &TrainedModel,
    context: &NormalizationContext,
) -> Result<Vec<u8>, ModelError> {
    let mut doc = Map::new();
    doc.insert("algorithm".to_string(), json!(model.algorithm.tag()));
    doc.insert("featureNames".to_string(), serde_json::to_value(&model.feature_names)?);
    doc.insert("normContext".to_string(), serde_json::to_value(context)?);

    match &model.model {
        Model::LogReg(m) => {
            doc.insert("weights".to_string(), serde_json::to_value(&m.weights)?);
            doc.insert("bias".to_string(), json!(m.bias));
        }
        Model::Tree(root) => {
            doc.insert("tree".to_string(), serde_json::to_value(root)?);
        }
        Model::Forest(m) => {
            doc.insert("trees".to_string(), serde_json::to_value(&m.trees)?);
            doc.insert("featureSubsets".to_string(), serde_json::to_value(&m.feature_subsets)?);
        }
        Model::Gbt(m) => {
            doc.insert("trees".to_string(), serde_json::to_value(&m.trees)?);
            doc.insert("basePrediction".to_string(), json!(m.base_prediction));
            doc.insert("learningRate".to_string(), json!(m.learning_rate));
        }
    }

    Ok(serde_json::to_vec(&Value::Object(doc))?)
}

/// Reconstructs a model from artifact bytes, dispatching on the
/// `algorithm` tag. The normalization context is optional at this layer;
/// scoring insists on it.
pub fn deserialize_artifact(
    bytes: &[u8],
) -> Result<(TrainedModel, Option<NormalizationContext>), ModelError> {
    let doc: Value = serde_json::from_slice(bytes)
        .map_err(|e| CoreError::ArtifactCorruption(format!("not a JSON document: {e}")))?;

    let tag = doc
        .get("algorithm")
        .and_then(Value::as_str)
        .ok_or_else(|| missing_key("algorithm"))?;
    let algorithm = AlgorithmId::from_tag(tag)?;

    let feature_names: Vec<String> = field(&doc, "featureNames")?;
    let context: Option<NormalizationContext> = match doc.get("normContext") {
        Some(value) if !value.is_null() => Some(
            serde_json::from_value(value.clone())
                .map_err(|e| CoreError::ArtifactCorruption(format!("malformed normContext: {e}")))?,
        ),
        _ => None,
    };

    let model = match algorithm {
        AlgorithmId::LogReg => Model::LogReg(LogisticModel {
            weights: field(&doc, "weights")?,
            bias: field(&doc, "bias")?,
        }),
        AlgorithmId::DecisionTree | AlgorithmId::ExtraTree => {
            let root: Node = field(&doc, "tree")?;
            Model::Tree(root)
        }
        AlgorithmId::RandomForest | AlgorithmId::ExtraTrees => Model::Forest(ForestModel {
            trees: field(&doc, "trees")?,
            feature_subsets: field(&doc, "featureSubsets")?,
        }),
        AlgorithmId::GradientBoosted => Model::Gbt(GbtModel {
            trees: field(&doc, "trees")?,
            base_prediction: field(&doc, "basePrediction")?,
            learning_rate: field(&doc, "learningRate")?,
        }),
    };

    Ok((TrainedModel { algorithm, feature_names, model }, context))
}

fn field<T: serde::de::DeserializeOwned>(doc: &Value, key: &str) -> Result<T, ModelError> {
    let value = doc.get(key).ok_or_else(|| missing_key(key))?;
    serde_json::from_value(value.clone())
        .map_err(|e| CoreError::ArtifactCorruption(format!("malformed '{key}': {e}")).into())
}

fn missing_key(key: &str) -> ModelError {
    CoreError::ArtifactCorruption(format!("missing required key '{key}'")).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_tree_model() -> TrainedModel {
        TrainedModel {
            algorithm: AlgorithmId::DecisionTree,
            feature_names: vec!["a".into(), "b".into()],
            model: Model::Tree(Node::Split {
                feature_index: 0,
                threshold: 1.5,
                left: Box::new(Node::Leaf { value: 0.25 }),
                right: Box::new(Node::Leaf { value: 0.75 }),
            }),
        }
    }

    #[test]
    fn artifact_layout_matches_contract() {
        let bytes =
            serialize_artifact(&tiny_tree_model(), &NormalizationContext::default()).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["algorithm"], "decision_tree");
        assert_eq!(doc["featureNames"][1], "b");
        assert!(doc["normContext"]["numericStats"].is_object());
        assert_eq!(doc["tree"]["type"], "split");
        assert_eq!(doc["tree"]["left"]["value"], 0.25);
    }

    #[test]
    fn unknown_tag_is_a_clear_error() {
        let bytes = br#"{"algorithm":"xgboost","featureNames":[]}"#;
        let err = deserialize_artifact(bytes).unwrap_err();
        assert!(err.to_string().contains("unknown algorithm tag"));
    }

    #[test]
    fn missing_required_key_is_fatal() {
        let bytes = br#"{"algorithm":"log_reg","featureNames":["a"]}"#;
        let err = deserialize_artifact(bytes).unwrap_err();
        assert!(err.to_string().contains("missing required key 'weights'"));
    }

    #[test]
    fn extra_tree_tag_round_trips() {
        let mut model = tiny_tree_model();
        model.algorithm = AlgorithmId::ExtraTree;
        let bytes = serialize_artifact(&model, &NormalizationContext::default()).unwrap();
        let (back, _) = deserialize_artifact(&bytes).unwrap();
        assert_eq!(back.algorithm, AlgorithmId::ExtraTree);
        assert_eq!(back, model);
    }

    #[test]
    fn serialization_is_byte_stable() {
        let model = tiny_tree_model();
        let ctx = NormalizationContext::default();
        assert_eq!(
            serialize_artifact(&model, &ctx).unwrap(),
            serialize_artifact(&model, &ctx).unwrap()
        );
    }
}
