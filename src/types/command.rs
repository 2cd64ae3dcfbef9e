use super::device_event::{CalibrationKind, DeviceMode};

/// Host → device commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    InitCheck,
    Calibrate(CalibrationKind),
    SetMode(DeviceMode),
}

impl Command {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Command::InitCheck => "INIT_CHECK",
            Command::Calibrate(CalibrationKind::Sensor) => "CALIBRATE",
            Command::Calibrate(CalibrationKind::Tilt) => "CALIBRATE_TILT",
            Command::SetMode(DeviceMode::Cursor) => "CURSOR_MODE",
            Command::SetMode(DeviceMode::Gesture) => "GESTURE_MODE",
            Command::SetMode(DeviceMode::Idle) => "IDLE_MODE",
        }
    }

    /// Newline-terminated bytes ready for the transport.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.as_wire().len() + 1);
        bytes.extend_from_slice(self.as_wire().as_bytes());
        bytes.push(b'\n');
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_newline_terminated() {
        assert_eq!(Command::InitCheck.to_bytes(), b"INIT_CHECK\n");
        assert_eq!(
            Command::Calibrate(CalibrationKind::Tilt).to_bytes(),
            b"CALIBRATE_TILT\n"
        );
        assert_eq!(
            Command::SetMode(DeviceMode::Gesture).to_bytes(),
            b"GESTURE_MODE\n"
        );
    }
}
