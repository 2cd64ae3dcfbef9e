use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crossbeam_channel::Receiver;
use log::{debug, info, trace, warn};

use super::collaborators::{InputInjector, UiListener};
use super::cooldown::CooldownTracker;
use crate::gesture::GestureEngine;
use crate::motion::MotionFilter;
use crate::types::{DeviceEvent, DeviceMode, GestureSample, SampleOutcome};

pub type SharedFilter = Arc<Mutex<MotionFilter>>;
pub type SharedEngine = Arc<Mutex<GestureEngine>>;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Fans device events out to the motion filter, the gesture engine and the
/// collaborators. Runs on the consumer side of the session's event channel.
pub struct DispatchRouter {
    filter: SharedFilter,
    engine: SharedEngine,
    cooldown: CooldownTracker,
    injector: Box<dyn InputInjector>,
    ui: Box<dyn UiListener>,
    last_progress: Option<u8>,
}

impl DispatchRouter {
    pub fn new(
        filter: SharedFilter,
        engine: SharedEngine,
        cooldown: CooldownTracker,
        injector: Box<dyn InputInjector>,
        ui: Box<dyn UiListener>,
    ) -> Self {
        Self {
            filter,
            engine,
            cooldown,
            injector,
            ui,
            last_progress: None,
        }
    }

    /// Dispatches until the channel closes, which happens when the session's
    /// transport shuts down.
    pub fn run(&mut self, events: &Receiver<DeviceEvent>) {
        info!("Dispatch router started");
        for event in events.iter() {
            self.dispatch(event);
        }
        info!("Event stream closed, dispatch router stopped");
    }

    pub fn dispatch(&mut self, event: DeviceEvent) {
        self.dispatch_at(event, Instant::now());
    }

    /// Same as [`dispatch`](Self::dispatch) with an explicit clock for the
    /// cooldown.
    pub fn dispatch_at(&mut self, event: DeviceEvent, now: Instant) {
        match event {
            DeviceEvent::CursorSample { vx, vy } => {
                if let Some(delta) = lock(&self.filter).update(vx, vy) {
                    self.injector.move_pointer_by(delta.dx, delta.dy);
                }
            }
            DeviceEvent::CursorCentered => {
                lock(&self.filter).reset();
                self.injector.center_pointer();
            }
            DeviceEvent::GestureSample(GestureSample::Raw(sample)) => {
                let outcome = lock(&self.engine).on_sample(sample);
                match outcome {
                    SampleOutcome::Recognized(prediction) => {
                        debug!(
                            "Local prediction '{}' ({:.2})",
                            prediction.label, prediction.confidence
                        );
                        self.forward_gesture(&prediction.label, now);
                    }
                    SampleOutcome::Recorded(count) => trace!("Recorded sample #{}", count),
                    SampleOutcome::NoDecision | SampleOutcome::Dropped => {}
                }
            }
            DeviceEvent::GestureSample(GestureSample::Label(label))
            | DeviceEvent::GestureDetected(label) => {
                self.forward_gesture(&label, now);
            }
            DeviceEvent::CalibrationStarted(kind) => {
                info!("Device started {:?} calibration", kind);
                self.last_progress = None;
            }
            DeviceEvent::CalibrationProgress(percent) => {
                self.last_progress = Some(percent);
                self.ui.on_calibration_progress(percent);
            }
            DeviceEvent::CalibrationDone => {
                if self.last_progress != Some(100) {
                    self.ui.on_calibration_progress(100);
                }
                self.last_progress = None;
                self.ui.on_calibration_finished(true);
            }
            DeviceEvent::CalibrationFailed => {
                self.last_progress = None;
                self.ui.on_calibration_finished(false);
            }
            DeviceEvent::ModeAck(mode) => {
                info!("Device mode: {:?}", mode);
                if mode == DeviceMode::Cursor {
                    lock(&self.filter).reset();
                }
            }
            DeviceEvent::Init(ok) => debug!("Init acknowledgement: {}", ok),
            DeviceEvent::Unknown(raw) => warn!("Unrecognized device line: {:?}", raw),
        }
    }

    fn forward_gesture(&mut self, label: &str, now: Instant) {
        if !self.cooldown.accept(label, now) {
            debug!("Gesture '{}' suppressed by cooldown", label);
            return;
        }
        self.injector.invoke_action(label);
        self.ui.on_gesture_recognized(label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::gesture::{GestureSettings, SoftmaxRegression};
    use crate::motion::MotionSettings;
    use crate::types::RawSample;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Move(f64, f64),
        Action(String),
        Center,
        Progress(u8),
        Finished(bool),
        Recognized(String),
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Call>>>);

    impl Recorder {
        fn push(&self, call: Call) {
            self.0.lock().unwrap().push(call);
        }
        fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().clone()
        }
    }

    impl InputInjector for Recorder {
        fn move_pointer_by(&mut self, dx: f64, dy: f64) {
            self.push(Call::Move(dx, dy));
        }
        fn invoke_action(&mut self, label: &str) {
            self.push(Call::Action(label.to_string()));
        }
        fn center_pointer(&mut self) {
            self.push(Call::Center);
        }
    }

    impl UiListener for Recorder {
        fn on_calibration_progress(&mut self, percent: u8) {
            self.push(Call::Progress(percent));
        }
        fn on_calibration_finished(&mut self, success: bool) {
            self.push(Call::Finished(success));
        }
        fn on_gesture_recognized(&mut self, label: &str) {
            self.push(Call::Recognized(label.to_string()));
        }
    }

    fn router(smoothing: f64) -> (DispatchRouter, Recorder, SharedFilter, SharedEngine) {
        let recorder = Recorder::default();
        let filter = Arc::new(Mutex::new(MotionFilter::new(MotionSettings {
            smoothing,
            ..MotionSettings::default()
        })));
        let engine = Arc::new(Mutex::new(GestureEngine::new(
            Box::new(MemoryStore::new()),
            Box::new(SoftmaxRegression::default()),
            GestureSettings::default(),
        )));
        let cooldown = CooldownTracker::with_overrides(
            Duration::from_millis(300),
            [("CIRCLE", Duration::from_millis(800))],
        );
        let router = DispatchRouter::new(
            filter.clone(),
            engine.clone(),
            cooldown,
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
        );
        (router, recorder, filter, engine)
    }

    #[test]
    fn cursor_samples_pass_through_the_filter() {
        let (mut router, recorder, filter, _) = router(0.0);
        router.dispatch(DeviceEvent::CursorSample { vx: 0.01, vy: 0.0 });
        router.dispatch(DeviceEvent::CursorSample { vx: 0.5, vy: -0.25 });
        assert_eq!(recorder.calls(), vec![Call::Move(0.5, -0.25)]);

        router.dispatch(DeviceEvent::CursorCentered);
        assert_eq!(filter.lock().unwrap().state().prev_vx, 0.0);
        assert_eq!(recorder.calls().last(), Some(&Call::Center));
    }

    #[test]
    fn cursor_mode_ack_resets_filter_state() {
        let (mut router, _, filter, _) = router(0.5);
        router.dispatch(DeviceEvent::CursorSample { vx: 1.0, vy: 1.0 });
        assert!(filter.lock().unwrap().state().prev_vx > 0.0);
        router.dispatch(DeviceEvent::ModeAck(DeviceMode::Gesture));
        assert!(filter.lock().unwrap().state().prev_vx > 0.0);
        router.dispatch(DeviceEvent::ModeAck(DeviceMode::Cursor));
        assert_eq!(filter.lock().unwrap().state().prev_vx, 0.0);
    }

    #[test]
    fn detected_gestures_respect_per_label_cooldown() {
        let (mut router, recorder, _, _) = router(0.5);
        let t0 = Instant::now();
        router.dispatch_at(DeviceEvent::GestureDetected("CIRCLE".into()), t0);
        router.dispatch_at(
            DeviceEvent::GestureDetected("LEFT".into()),
            t0 + Duration::from_millis(10),
        );
        router.dispatch_at(
            DeviceEvent::GestureDetected("CIRCLE".into()),
            t0 + Duration::from_millis(500),
        );
        router.dispatch_at(
            DeviceEvent::GestureSample(GestureSample::Label("CIRCLE".into())),
            t0 + Duration::from_millis(900),
        );

        let actions: Vec<Call> = recorder
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Action(_)))
            .collect();
        assert_eq!(
            actions,
            vec![
                Call::Action("CIRCLE".into()),
                Call::Action("LEFT".into()),
                Call::Action("CIRCLE".into()),
            ]
        );
    }

    #[test]
    fn completion_reports_hundred_once() {
        let (mut router, recorder, _, _) = router(0.5);
        router.dispatch(DeviceEvent::CalibrationProgress(40));
        router.dispatch(DeviceEvent::CalibrationProgress(100));
        router.dispatch(DeviceEvent::CalibrationDone);
        router.dispatch(DeviceEvent::CalibrationStarted(crate::types::CalibrationKind::Tilt));
        router.dispatch(DeviceEvent::CalibrationProgress(70));
        router.dispatch(DeviceEvent::CalibrationDone);
        router.dispatch(DeviceEvent::CalibrationFailed);

        assert_eq!(
            recorder.calls(),
            vec![
                Call::Progress(40),
                Call::Progress(100),
                Call::Finished(true),
                Call::Progress(70),
                Call::Progress(100),
                Call::Finished(true),
                Call::Finished(false),
            ]
        );
    }

    #[test]
    fn raw_gesture_samples_feed_the_engine() {
        let (mut router, recorder, _, engine) = router(0.5);
        engine.lock().unwrap().start_recording("wave").unwrap();
        let s = RawSample::new(1.0, 2.0, 3.0, 0.0, 0.0, 9.8);
        router.dispatch(DeviceEvent::GestureSample(GestureSample::Raw(s)));
        router.dispatch(DeviceEvent::GestureSample(GestureSample::Raw(s)));
        router.dispatch(DeviceEvent::Unknown("NOISE".into()));
        assert_eq!(engine.lock().unwrap().stop_recording(), 2);
        assert!(recorder.calls().is_empty());
    }
}
