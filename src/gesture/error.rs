#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrainError {
    #[error(
        "Insufficient training data: {classes} gestures / {samples} samples \
         (need at least {min_classes} gestures and {min_samples} samples)"
    )]
    InsufficientData {
        classes: usize,
        samples: usize,
        min_classes: usize,
        min_samples: usize,
    },
    #[error("Training failed: {0}")]
    Degenerate(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GestureError {
    #[error("Already recording gesture '{0}'")]
    AlreadyRecording(String),
    #[error("Gesture name must not be empty")]
    EmptyName,
}
