/// Sink for pointer movement and gesture actions. Translating these into
/// OS input events is the implementor's business.
pub trait InputInjector: Send {
    fn move_pointer_by(&mut self, dx: f64, dy: f64);

    /// `label` is the recognized gesture name.
    fn invoke_action(&mut self, label: &str);

    fn center_pointer(&mut self) {}
}

/// Receives calibration progress and recognized gestures for display.
pub trait UiListener: Send {
    fn on_calibration_progress(&mut self, percent: u8);

    fn on_calibration_finished(&mut self, _success: bool) {}

    fn on_gesture_recognized(&mut self, label: &str);
}

/// Progress and recognition reported through the log.
#[derive(Debug, Default)]
pub struct LogListener;

impl UiListener for LogListener {
    fn on_calibration_progress(&mut self, percent: u8) {
        log::info!("Calibration progress: {}%", percent);
    }

    fn on_calibration_finished(&mut self, success: bool) {
        if success {
            log::info!("Calibration finished");
        } else {
            log::warn!("Calibration failed");
        }
    }

    fn on_gesture_recognized(&mut self, label: &str) {
        log::info!("Gesture recognized: {}", label);
    }
}
