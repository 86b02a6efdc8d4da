use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// L2-regularized logistic regression trained with batch gradient
/// descent. Training is fully deterministic given the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct LogisticParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub c: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self { epochs: 200, learning_rate: 0.01, c: 1.0 }
    }
}

/// Numerically safe sigmoid; the exponent is clamped at ±500 where the
/// output already saturates.
pub fn sigmoid(z: f64) -> f64 {
    let z = z.clamp(-500.0, 500.0);
    1.0 / (1.0 + (-z).exp())
}

pub fn train(x: &ArrayView2<'_, f64>, y: &[f64], params: &LogisticParams) -> LogisticModel {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    let lambda = 1.0 / params.c;

    let mut weights = vec![0.0; n_features];
    let mut bias = 0.0;
    let mut residuals = vec![0.0; n_samples];

    for _ in 0..params.epochs {
        for i in 0..n_samples {
            let mut z = bias;
            for j in 0..n_features {
                z += weights[j] * x[[i, j]];
            }
            residuals[i] = sigmoid(z) - y[i];
        }

        // No regularization on the bias term.
        let bias_gradient = residuals.iter().sum::<f64>() / n_samples as f64;
        for j in 0..n_features {
            let mut gradient = 0.0;
            for i in 0..n_samples {
                gradient += residuals[i] * x[[i, j]];
            }
            gradient = gradient / n_samples as f64 + lambda * weights[j];
            weights[j] -= params.learning_rate * gradient;
        }
        bias -= params.learning_rate * bias_gradient;
    }

    LogisticModel { weights, bias }
}

impl LogisticModel {
    /// Raw decision margin before the sigmoid.
    pub fn margin(&self, row: &[f64]) -> f64 {
        self.bias
            + self
                .weights
                .iter()
                .zip(row.iter())
                .map(|(w, v)| w * v)
                .sum::<f64>()
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        sigmoid(self.margin(row))
    }
}
