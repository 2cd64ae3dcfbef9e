use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use super::classifier::ClassifierStrategy;
use super::error::{GestureError, TrainError};
use super::model::{train, TrainedModel, TrainingRequirements};
use crate::database::GestureStore;
use crate::types::{GestureSet, Prediction, RawSample, SampleOutcome, TrainSummary};

/// One gesture window being captured.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureRecording {
    pub name: String,
    pub samples: Vec<RawSample>,
    pub started_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
enum EngineState {
    Idle,
    Recording(GestureRecording),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSettings {
    /// Predictions must be strictly above this.
    pub confidence_threshold: f64,
    pub requirements: TrainingRequirements,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.70,
            requirements: TrainingRequirements::default(),
        }
    }
}

/// Training run over a snapshot of the gesture set.
pub struct TrainingJob {
    gestures: GestureSet,
    strategy: Arc<dyn ClassifierStrategy>,
    requirements: TrainingRequirements,
}

impl TrainingJob {
    pub fn run(&self) -> Result<(TrainedModel, TrainSummary), TrainError> {
        train(&self.gestures, self.strategy.as_ref(), self.requirements)
    }
}

/// Gesture recording, training and recognition. The store only mirrors memory.
pub struct GestureEngine {
    state: EngineState,
    gestures: GestureSet,
    model: Option<Arc<TrainedModel>>,
    store: Box<dyn GestureStore>,
    strategy: Arc<dyn ClassifierStrategy>,
    settings: GestureSettings,
}

impl GestureEngine {
    pub fn new(
        store: Box<dyn GestureStore>,
        strategy: Box<dyn ClassifierStrategy>,
        settings: GestureSettings,
    ) -> Self {
        Self {
            state: EngineState::Idle,
            gestures: GestureSet::new(),
            model: None,
            store,
            strategy: Arc::from(strategy),
            settings,
        }
    }

    /// Returns the number of gestures loaded.
    pub fn load_from_store(&mut self) -> usize {
        match self.store.load_all() {
            Ok(set) => {
                info!(
                    "Loaded {} gestures ({} samples) from store",
                    set.len(),
                    set.total_samples()
                );
                self.gestures = set;
                self.gestures.len()
            }
            Err(e) => {
                error!("Failed to load gestures from store: {}", e);
                0
            }
        }
    }

    pub fn start_recording(&mut self, name: &str) -> Result<(), GestureError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GestureError::EmptyName);
        }
        if let EngineState::Recording(active) = &self.state {
            return Err(GestureError::AlreadyRecording(active.name.clone()));
        }

        info!("Recording gesture '{}'", name);
        self.state = EngineState::Recording(GestureRecording {
            name: name.to_string(),
            samples: Vec::new(),
            started_at: Utc::now(),
        });
        Ok(())
    }

    pub fn on_sample(&mut self, sample: RawSample) -> SampleOutcome {
        if let EngineState::Recording(recording) = &mut self.state {
            recording.samples.push(sample);
            return SampleOutcome::Recorded(recording.samples.len());
        }

        match self.predict(&sample) {
            Some(prediction) => SampleOutcome::Recognized(prediction),
            None if self.model.is_some() => SampleOutcome::NoDecision,
            None => SampleOutcome::Dropped,
        }
    }

    pub fn stop_recording(&mut self) -> usize {
        let recording = match std::mem::replace(&mut self.state, EngineState::Idle) {
            EngineState::Recording(recording) => recording,
            EngineState::Idle => return 0,
        };

        let count = recording.samples.len();
        if count == 0 {
            warn!("Recording of '{}' captured no samples, nothing saved", recording.name);
            return 0;
        }

        let elapsed = Utc::now() - recording.started_at;
        info!(
            "Recorded '{}': {} samples in {} ms",
            recording.name,
            count,
            elapsed.num_milliseconds()
        );

        if let Err(e) = self.store.save(&recording.name, &recording.samples) {
            error!("Failed to persist gesture '{}': {}", recording.name, e);
        }
        self.gestures.insert(recording.name, recording.samples);
        count
    }

    /// The previous model stays in place unless training succeeds.
    pub fn train(&mut self) -> Result<TrainSummary, TrainError> {
        let (model, summary) = self.training_job().run()?;
        self.install_model(model);
        Ok(summary)
    }

    pub fn training_job(&self) -> TrainingJob {
        TrainingJob {
            gestures: self.gestures.clone(),
            strategy: Arc::clone(&self.strategy),
            requirements: self.settings.requirements,
        }
    }

    pub fn install_model(&mut self, model: TrainedModel) {
        info!("Installed model for {:?}", model.labels());
        self.model = Some(Arc::new(model));
    }

    pub fn predict(&self, sample: &RawSample) -> Option<Prediction> {
        let model = self.model.as_ref()?;
        let prediction = model.predict(sample, self.settings.confidence_threshold);
        if let Some(p) = &prediction {
            debug!("Predicted '{}' ({:.2})", p.label, p.confidence);
        }
        prediction
    }

    pub fn gesture_names(&self) -> Vec<String> {
        self.gestures.names().map(str::to_string).collect()
    }

    pub fn gestures(&self) -> &GestureSet {
        &self.gestures
    }

    pub fn remove_gesture(&mut self, name: &str) -> bool {
        let removed = self.gestures.remove(name).is_some();
        if removed {
            if let Err(e) = self.store.remove(name) {
                error!("Failed to remove gesture '{}' from store: {}", name, e);
            }
            info!("Removed gesture '{}'", name);
        }
        removed
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, EngineState::Recording(_))
    }

    pub fn recording_name(&self) -> Option<&str> {
        match &self.state {
            EngineState::Recording(r) => Some(&r.name),
            EngineState::Idle => None,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<Arc<TrainedModel>> {
        self.model.clone()
    }

    pub fn settings(&self) -> GestureSettings {
        self.settings
    }

    pub fn set_confidence_threshold(&mut self, threshold: f64) {
        self.settings.confidence_threshold = threshold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, StoreError};
    use crate::gesture::classifier::SoftmaxRegression;

    fn engine() -> GestureEngine {
        GestureEngine::new(
            Box::new(MemoryStore::new()),
            Box::new(SoftmaxRegression::default()),
            GestureSettings::default(),
        )
    }

    fn sample(v: f64) -> RawSample {
        RawSample::new(v, -v, v * 0.5, 0.0, 0.0, 1.0)
    }

    struct FailingStore;

    fn offline() -> StoreError {
        StoreError::Io(std::io::Error::new(std::io::ErrorKind::NotConnected, "offline"))
    }

    impl GestureStore for FailingStore {
        fn save(&mut self, _: &str, _: &[RawSample]) -> Result<(), StoreError> {
            Err(offline())
        }
        fn load_all(&mut self) -> Result<GestureSet, StoreError> {
            Err(offline())
        }
        fn remove(&mut self, _: &str) -> Result<(), StoreError> {
            Err(offline())
        }
    }

    #[test]
    fn recording_lifecycle() {
        let mut engine = engine();
        assert_eq!(engine.on_sample(sample(1.0)), SampleOutcome::Dropped);

        engine.start_recording("up").unwrap();
        assert_eq!(
            engine.start_recording("down"),
            Err(GestureError::AlreadyRecording("up".into()))
        );
        assert_eq!(engine.on_sample(sample(1.0)), SampleOutcome::Recorded(1));
        assert_eq!(engine.on_sample(sample(1.1)), SampleOutcome::Recorded(2));
        assert_eq!(engine.stop_recording(), 2);
        assert!(!engine.is_recording());
        assert_eq!(engine.gesture_names(), vec!["up".to_string()]);
    }

    #[test]
    fn empty_recording_commits_nothing() {
        let mut engine = engine();
        engine.start_recording("noop").unwrap();
        assert_eq!(engine.stop_recording(), 0);
        assert!(engine.gesture_names().is_empty());
        assert_eq!(engine.stop_recording(), 0);
    }

    #[test]
    fn blank_name_rejected() {
        assert_eq!(engine().start_recording("  "), Err(GestureError::EmptyName));
    }

    #[test]
    fn store_failure_keeps_memory_authoritative() {
        let mut engine = GestureEngine::new(
            Box::new(FailingStore),
            Box::new(SoftmaxRegression::default()),
            GestureSettings::default(),
        );
        assert_eq!(engine.load_from_store(), 0);
        engine.start_recording("up").unwrap();
        engine.on_sample(sample(1.0));
        assert_eq!(engine.stop_recording(), 1);
        assert_eq!(engine.gestures().get("up").map(<[RawSample]>::len), Some(1));
        assert!(engine.remove_gesture("up"));
    }

    #[test]
    fn failed_training_keeps_previous_model() {
        let mut engine = engine();
        for (name, v) in [("left", -2.0), ("right", 2.0)] {
            engine.start_recording(name).unwrap();
            for i in 0..6 {
                engine.on_sample(sample(v + i as f64 * 0.01));
            }
            engine.stop_recording();
        }
        engine.train().unwrap();
        let before = engine.model().unwrap();

        engine.remove_gesture("left");
        assert!(matches!(engine.train(), Err(TrainError::InsufficientData { .. })));
        assert!(Arc::ptr_eq(&before, &engine.model().unwrap()));

        match engine.on_sample(sample(2.0)) {
            SampleOutcome::Recognized(p) => assert_eq!(p.label, "right"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn training_job_runs_on_a_snapshot() {
        let mut engine = engine();
        for (name, v) in [("left", -2.0), ("right", 2.0)] {
            engine.start_recording(name).unwrap();
            for i in 0..6 {
                engine.on_sample(sample(v + i as f64 * 0.01));
            }
            engine.stop_recording();
        }

        let job = engine.training_job();
        engine.start_recording("up").unwrap();
        engine.on_sample(sample(5.0));
        engine.stop_recording();

        let (model, summary) = job.run().unwrap();
        assert_eq!(summary.classes, vec!["left".to_string(), "right".to_string()]);
        assert!(!engine.has_model());
        engine.install_model(model);
        assert!(engine.has_model());
        assert_eq!(engine.gesture_names().len(), 3);
    }
}
