use core_types::CoreError;
use ndarray::Array2;
use std::collections::HashMap;

/// Projects a scoring-time feature matrix onto the artifact's
/// feature-name ordering.
///
/// When the orderings already agree the matrix passes through untouched.
/// Otherwise columns are looked up by name; artifact columns absent from
/// the scoring matrix are zero-filled and surplus scoring columns are
/// dropped. Missing columns are a warning, not a failure.
pub fn align_features(
    x: Array2<f64>,
    scoring_names: &[String],
    artifact_names: &[String],
) -> Array2<f64> {
    if scoring_names == artifact_names {
        return x;
    }

    let by_name: HashMap<&str, usize> = scoring_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let missing: Vec<&String> = artifact_names
        .iter()
        .filter(|name| !by_name.contains_key(name.as_str()))
        .collect();
    if !missing.is_empty() {
        let warning = CoreError::FeatureAlignment(format!(
            "{} of {} artifact features are absent from the scoring dataset (first: {})",
            missing.len(),
            artifact_names.len(),
            missing[0]
        ));
        tracing::warn!("{warning}; filling with zeros");
    }

    Array2::from_shape_fn((x.nrows(), artifact_names.len()), |(i, j)| {
        match by_name.get(artifact_names[j].as_str()) {
            Some(&source) => x[[i, source]],
            None => 0.0,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_orderings_pass_through() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let cols = names(&["a", "b"]);
        let aligned = align_features(x.clone(), &cols, &cols);
        assert_eq!(aligned, x);
    }

    #[test]
    fn projection_reorders_fills_and_drops() {
        // artifact expects [a, b, c]; scoring built [b, c, d]
        let x = array![[10.0, 20.0, 30.0], [40.0, 50.0, 60.0]];
        let aligned =
            align_features(x, &names(&["b", "c", "d"]), &names(&["a", "b", "c"]));
        assert_eq!(aligned.ncols(), 3);
        // a is zero-filled, b and c follow their names, d is gone
        assert_eq!(aligned, array![[0.0, 10.0, 20.0], [0.0, 40.0, 50.0]]);
    }
}
