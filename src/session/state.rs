use crate::types::{CalibrationKind, DeviceEvent, DeviceMode};

/// Lifecycle of one device connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Calibrating,
    DisconnectedOnError,
}

impl ConnectionState {
    pub fn is_disconnected(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::DisconnectedOnError)
    }
}

/// Calibration progress as confirmed by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CalibrationStatus {
    #[default]
    Idle,
    SensorInProgress,
    TiltInProgress,
    Done,
    Failed,
}

/// Session snapshot. Confirmed fields come only from device events.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub connection: ConnectionState,
    pub initialized: bool,
    pub init_rejected: bool,
    pub mode: DeviceMode,
    pub requested_mode: Option<DeviceMode>,
    pub calibration: CalibrationStatus,
    pub requested_calibration: Option<CalibrationKind>,
    pub last_progress: Option<u8>,
    /// Count of terminal calibration events seen; lets a waiter tell its own
    /// outcome apart from earlier ones.
    pub terminal_events: u64,
    pub last_calibration_ok: Option<bool>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Connecting,
            initialized: false,
            init_rejected: false,
            mode: DeviceMode::Idle,
            requested_mode: None,
            calibration: CalibrationStatus::Idle,
            requested_calibration: None,
            last_progress: None,
            terminal_events: 0,
            last_calibration_ok: None,
        }
    }
}

impl SessionState {
    /// Folds one device event into the confirmed state.
    pub fn apply(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Init(true) => {
                self.initialized = true;
                if self.connection == ConnectionState::Connecting {
                    self.connection = ConnectionState::Ready;
                }
            }
            DeviceEvent::Init(false) => {
                self.init_rejected = true;
            }
            DeviceEvent::ModeAck(mode) => {
                self.mode = *mode;
                if self.requested_mode == Some(*mode) {
                    self.requested_mode = None;
                }
            }
            DeviceEvent::CalibrationStarted(kind) => {
                self.calibration = match kind {
                    CalibrationKind::Sensor => CalibrationStatus::SensorInProgress,
                    CalibrationKind::Tilt => CalibrationStatus::TiltInProgress,
                };
                self.last_progress = None;
            }
            DeviceEvent::CalibrationProgress(pct) => {
                self.last_progress = Some(*pct);
            }
            DeviceEvent::CalibrationDone | DeviceEvent::CalibrationFailed => {
                let ok = matches!(event, DeviceEvent::CalibrationDone);
                self.calibration = if ok {
                    CalibrationStatus::Done
                } else {
                    CalibrationStatus::Failed
                };
                self.last_calibration_ok = Some(ok);
                self.terminal_events += 1;
                self.requested_calibration = None;
                if self.connection == ConnectionState::Calibrating {
                    self.connection = ConnectionState::Ready;
                }
            }
            _ => {}
        }
    }

    pub fn mark_disconnected(&mut self, on_error: bool) {
        self.connection = if on_error {
            ConnectionState::DisconnectedOnError
        } else {
            ConnectionState::Disconnected
        };
        self.initialized = false;
        self.requested_calibration = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_moves_connecting_to_ready() {
        let mut state = SessionState::default();
        state.apply(&DeviceEvent::Init(true));
        assert!(state.initialized);
        assert_eq!(state.connection, ConnectionState::Ready);
    }

    #[test]
    fn mode_ack_clears_matching_request_only() {
        let mut state = SessionState {
            requested_mode: Some(DeviceMode::Cursor),
            ..SessionState::default()
        };
        state.apply(&DeviceEvent::ModeAck(DeviceMode::Gesture));
        assert_eq!(state.mode, DeviceMode::Gesture);
        assert_eq!(state.requested_mode, Some(DeviceMode::Cursor));

        state.apply(&DeviceEvent::ModeAck(DeviceMode::Cursor));
        assert_eq!(state.mode, DeviceMode::Cursor);
        assert_eq!(state.requested_mode, None);
    }

    #[test]
    fn terminal_calibration_returns_to_ready() {
        let mut state = SessionState {
            connection: ConnectionState::Calibrating,
            ..SessionState::default()
        };
        state.apply(&DeviceEvent::CalibrationStarted(CalibrationKind::Tilt));
        assert_eq!(state.calibration, CalibrationStatus::TiltInProgress);
        state.apply(&DeviceEvent::CalibrationFailed);
        assert_eq!(state.calibration, CalibrationStatus::Failed);
        assert_eq!(state.connection, ConnectionState::Ready);
        assert_eq!(state.terminal_events, 1);
        assert_eq!(state.last_calibration_ok, Some(false));
    }
}
