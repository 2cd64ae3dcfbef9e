use chrono::{DateTime, Utc};
use log::info;

use super::classifier::{ClassModel, ClassifierStrategy};
use super::error::TrainError;
use super::features::extract_features;
use super::scaler::StandardScaler;
use crate::types::{GestureSet, Prediction, RawSample, TrainSummary};

/// Minimum dataset shape accepted by [`train`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrainingRequirements {
    pub min_classes: usize,
    pub min_samples: usize,
}

impl Default for TrainingRequirements {
    fn default() -> Self {
        Self {
            min_classes: 2,
            min_samples: 10,
        }
    }
}

/// Scaler and classifier fitted together on one `GestureSet` snapshot.
/// Neither part can be replaced on its own.
pub struct TrainedModel {
    labels: Vec<String>,
    scaler: StandardScaler,
    classifier: Box<dyn ClassModel>,
    trained_at: DateTime<Utc>,
}

impl std::fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModel")
            .field("labels", &self.labels)
            .field("feature_len", &self.scaler.dim())
            .field("trained_at", &self.trained_at)
            .finish()
    }
}

impl TrainedModel {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Per-class probabilities for one sample, in `labels()` order.
    pub fn probabilities(&self, sample: &RawSample) -> Vec<f64> {
        let features = extract_features(std::slice::from_ref(sample));
        self.classifier.predict_proba(&self.scaler.transform(&features))
    }

    /// Arg-max label if its probability is strictly above `threshold`.
    pub fn predict(&self, sample: &RawSample, threshold: f64) -> Option<Prediction> {
        let probs = self.probabilities(sample);
        let (index, confidence) = gate(&probs, threshold)?;
        Some(Prediction {
            label: self.labels[index].clone(),
            confidence,
        })
    }
}

/// Picks the most probable class. A confidence equal to the threshold is
/// not enough.
pub fn gate(probabilities: &[f64], threshold: f64) -> Option<(usize, f64)> {
    let (index, &confidence) = probabilities
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    (confidence > threshold).then_some((index, confidence))
}

/// Fits a fresh model on every individual sample of `set`.
pub fn train(
    set: &GestureSet,
    strategy: &dyn ClassifierStrategy,
    requirements: TrainingRequirements,
) -> Result<(TrainedModel, TrainSummary), TrainError> {
    let classes: Vec<(&str, &[RawSample])> =
        set.iter().filter(|(_, samples)| !samples.is_empty()).collect();
    let total: usize = classes.iter().map(|(_, samples)| samples.len()).sum();

    if classes.len() < requirements.min_classes || total < requirements.min_samples {
        return Err(TrainError::InsufficientData {
            classes: classes.len(),
            samples: total,
            min_classes: requirements.min_classes,
            min_samples: requirements.min_samples,
        });
    }

    let mut labels = Vec::with_capacity(classes.len());
    let mut raw_features = Vec::with_capacity(total);
    let mut targets = Vec::with_capacity(total);
    for (index, (name, samples)) in classes.iter().enumerate() {
        labels.push(name.to_string());
        for sample in *samples {
            raw_features.push(extract_features(std::slice::from_ref(sample)));
            targets.push(index);
        }
    }

    let scaler = StandardScaler::fit(&raw_features)
        .ok_or_else(|| TrainError::Degenerate("could not fit feature scaler".to_string()))?;
    let scaled: Vec<Vec<f64>> = raw_features.iter().map(|f| scaler.transform(f)).collect();
    let classifier = strategy.fit(&scaled, &targets, labels.len())?;

    let correct = scaled
        .iter()
        .zip(&targets)
        .filter(|(x, target)| {
            gate(&classifier.predict_proba(x), f64::NEG_INFINITY).map(|(i, _)| i) == Some(**target)
        })
        .count();

    let summary = TrainSummary {
        classes: labels.clone(),
        samples: total,
        feature_len: scaler.dim(),
        training_accuracy: correct as f64 / total as f64,
    };
    info!(
        "Trained {} on {} gestures / {} samples (training accuracy {:.1}%)",
        strategy.name(),
        summary.classes.len(),
        summary.samples,
        summary.training_accuracy * 100.0
    );

    let model = TrainedModel {
        labels,
        scaler,
        classifier,
        trained_at: Utc::now(),
    };
    Ok((model, summary))
}
