/// Arg-max class that passed the confidence gate.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

/// What the gesture engine did with one incoming sample.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleOutcome {
    /// Appended to the active recording; carries the running count.
    Recorded(usize),
    Recognized(Prediction),
    /// A model exists but no class cleared the confidence gate.
    NoDecision,
    /// Idle with no trained model.
    Dropped,
}

/// Result of a successful training run.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainSummary {
    pub classes: Vec<String>,
    pub samples: usize,
    pub feature_len: usize,
    pub training_accuracy: f64,
}
