use core_types::{AlgorithmId, Hyperparams, Lcg, NormalizationContext};
use models::{deserialize_artifact, serialize_artifact, train, Model};
use ndarray::Array2;

/// 100 rows of noisy but learnable data: the label leans on the first
/// two features.
fn synthetic(seed: u64) -> (Array2<f64>, Vec<f64>, Vec<String>) {
    let mut rng = Lcg::new(seed);
    let n = 100;
    let m = 5;
    let x = Array2::from_shape_fn((n, m), |_| rng.range(-2.0, 2.0));
    let y: Vec<f64> = (0..n)
        .map(|i| {
            let signal = 1.5 * x[[i, 0]] - 0.8 * x[[i, 1]] + 0.2 * x[[i, 4]];
            if signal > 0.3 { 1.0 } else { 0.0 }
        })
        .collect();
    let names = (0..m).map(|j| format!("f{j}")).collect();
    (x, y, names)
}

fn all_algorithms() -> [AlgorithmId; 6] {
    [
        AlgorithmId::LogReg,
        AlgorithmId::DecisionTree,
        AlgorithmId::ExtraTree,
        AlgorithmId::RandomForest,
        AlgorithmId::ExtraTrees,
        AlgorithmId::GradientBoosted,
    ]
}

#[test]
fn every_algorithm_round_trips_through_its_artifact() {
    let (x, y, names) = synthetic(7);
    let context = NormalizationContext::default();
    for algorithm in all_algorithms() {
        let model = train(algorithm, &x.view(), &y, &Hyperparams::default(), &names).unwrap();
        let bytes = serialize_artifact(&model, &context).unwrap();
        let (restored, _) = deserialize_artifact(&bytes).unwrap();

        let before = model.predict_batch(&x.view());
        let after = restored.predict_batch(&x.view());
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(
                (a - b).abs() < 1e-9,
                "{algorithm}: prediction drifted through serialization"
            );
        }
    }
}

#[test]
fn identical_inputs_produce_byte_identical_artifacts() {
    let (x, y, names) = synthetic(11);
    let context = NormalizationContext::default();
    for algorithm in all_algorithms() {
        let a = train(algorithm, &x.view(), &y, &Hyperparams::default(), &names).unwrap();
        let b = train(algorithm, &x.view(), &y, &Hyperparams::default(), &names).unwrap();
        assert_eq!(
            serialize_artifact(&a, &context).unwrap(),
            serialize_artifact(&b, &context).unwrap(),
            "{algorithm}: artifact bytes are not deterministic"
        );
    }
}

#[test]
fn pure_positive_labels_are_rejected() {
    let x = Array2::from_shape_fn((4, 2), |(i, j)| (i + j) as f64);
    let y = vec![1.0, 1.0, 1.0, 1.0];
    let names = vec!["a".to_string(), "b".to_string()];
    let err = train(AlgorithmId::LogReg, &x.view(), &y, &Hyperparams::default(), &names)
        .unwrap_err();
    assert!(err.to_string().contains("no negative labels"));
}

#[test]
fn logistic_regression_weights_are_reproducible() {
    let x = ndarray::array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
    let y = vec![0.0, 0.0, 0.0, 1.0];
    let names = vec!["a".to_string(), "b".to_string()];
    let hp = Hyperparams { seed: 42, ..Hyperparams::default() };

    let first = train(AlgorithmId::LogReg, &x.view(), &y, &hp, &names).unwrap();
    let second = train(AlgorithmId::LogReg, &x.view(), &y, &hp, &names).unwrap();
    let (Model::LogReg(a), Model::LogReg(b)) = (&first.model, &second.model) else {
        panic!("expected logistic models");
    };
    for (wa, wb) in a.weights.iter().zip(b.weights.iter()) {
        assert!((wa - wb).abs() < 1e-9);
    }
    assert!((a.bias - b.bias).abs() < 1e-9);
}

#[test]
fn cart_tree_predictions_survive_serialization_on_training_rows() {
    let (x, y, names) = synthetic(42);
    let context = NormalizationContext::default();
    let model =
        train(AlgorithmId::DecisionTree, &x.view(), &y, &Hyperparams::default(), &names).unwrap();
    let bytes = serialize_artifact(&model, &context).unwrap();
    let (restored, _) = deserialize_artifact(&bytes).unwrap();
    assert_eq!(model.predict_batch(&x.view()), restored.predict_batch(&x.view()));
}
