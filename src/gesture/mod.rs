pub mod classifier;
pub mod engine;
pub mod error;
pub mod features;
pub mod model;
pub mod scaler;

pub use classifier::{ClassModel, ClassifierStrategy, SoftmaxRegression};
pub use engine::{GestureEngine, GestureRecording, GestureSettings, TrainingJob};
pub use error::{GestureError, TrainError};
pub use features::{extract_features, FEATURE_LEN};
pub use model::{gate, train, TrainedModel, TrainingRequirements};
pub use scaler::StandardScaler;
