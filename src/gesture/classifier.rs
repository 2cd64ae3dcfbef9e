use super::error::TrainError;

/// A fitted multi-class model over scaled feature vectors.
pub trait ClassModel: Send + Sync {
    /// One probability per class index; sums to 1.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;
}

/// Training strategy. Swapping the classifier means swapping this value.
pub trait ClassifierStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `targets[i]` is the class index of `features[i]`, in `0..classes`.
    fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[usize],
        classes: usize,
    ) -> Result<Box<dyn ClassModel>, TrainError>;
}

/// Multinomial logistic regression trained by full-batch gradient descent
/// from zero weights, so the same data always gives the same model.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftmaxRegression {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for SoftmaxRegression {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 0.5,
            l2: 1e-3,
        }
    }
}

struct SoftmaxModel {
    /// `classes` rows of `dim` weights followed by the bias.
    weights: Vec<Vec<f64>>,
}

impl SoftmaxModel {
    fn logits(&self, x: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|w| {
                let dim = w.len() - 1;
                w[..dim].iter().zip(x).map(|(a, b)| a * b).sum::<f64>() + w[dim]
            })
            .collect()
    }
}

impl ClassModel for SoftmaxModel {
    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        softmax(&self.logits(features))
    }
}

pub(crate) fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl ClassifierStrategy for SoftmaxRegression {
    fn name(&self) -> &'static str {
        "softmax-regression"
    }

    fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[usize],
        classes: usize,
    ) -> Result<Box<dyn ClassModel>, TrainError> {
        let dim = match features.first() {
            Some(row) => row.len(),
            None => return Err(TrainError::Degenerate("no feature vectors".to_string())),
        };
        if features.len() != targets.len() {
            return Err(TrainError::Degenerate(format!(
                "{} feature vectors but {} targets",
                features.len(),
                targets.len()
            )));
        }
        if classes < 2 || targets.iter().any(|&t| t >= classes) {
            return Err(TrainError::Degenerate("invalid class targets".to_string()));
        }
        if features.iter().flatten().any(|v| !v.is_finite()) {
            return Err(TrainError::Degenerate("non-finite feature value".to_string()));
        }

        let n = features.len() as f64;
        let mut model = SoftmaxModel {
            weights: vec![vec![0.0; dim + 1]; classes],
        };
        let mut gradient = vec![vec![0.0; dim + 1]; classes];

        for _ in 0..self.epochs {
            gradient.iter_mut().for_each(|g| g.iter_mut().for_each(|v| *v = 0.0));

            for (x, &target) in features.iter().zip(targets) {
                let probs = model.predict_proba(x);
                for (k, (g, p)) in gradient.iter_mut().zip(&probs).enumerate() {
                    let err = p - if k == target { 1.0 } else { 0.0 };
                    for (gi, xi) in g[..dim].iter_mut().zip(x) {
                        *gi += err * xi;
                    }
                    g[dim] += err;
                }
            }

            for (w, g) in model.weights.iter_mut().zip(&gradient) {
                for i in 0..=dim {
                    let penalty = if i < dim { self.l2 * w[i] } else { 0.0 };
                    w[i] -= self.learning_rate * (g[i] / n + penalty);
                }
            }
        }

        if model.weights.iter().flatten().any(|v| !v.is_finite()) {
            return Err(TrainError::Degenerate("weights diverged".to_string()));
        }
        Ok(Box::new(model))
    }
}
