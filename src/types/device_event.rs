use log::warn;
use serde::{Deserialize, Serialize};

use super::raw_sample::RawSample;

/// Operating mode of the remote device.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    #[default]
    Idle,
    Cursor,
    Gesture,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationKind {
    Sensor,
    Tilt,
}

/// Payload of a `GESTURE,` line: either a raw 6-axis reading or a label the
/// firmware already recognized.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureSample {
    Raw(RawSample),
    Label(String),
}

/// One typed inbound line.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    Init(bool),
    ModeAck(DeviceMode),
    CalibrationStarted(CalibrationKind),
    CalibrationProgress(u8),
    CalibrationDone,
    CalibrationFailed,
    CursorSample { vx: f64, vy: f64 },
    CursorCentered,
    GestureSample(GestureSample),
    GestureDetected(String),
    Unknown(String),
}

impl DeviceEvent {
    pub fn is_calibration_terminal(&self) -> bool {
        matches!(self, DeviceEvent::CalibrationDone | DeviceEvent::CalibrationFailed)
    }
}

/// Classifies one framed line; malformed lines become `Unknown`.
pub fn parse_line(line: &str) -> DeviceEvent {
    let line = line.trim();
    let mut parts = line.split(',');
    let head = parts.next().unwrap_or("").trim();
    let fields: Vec<&str> = parts.map(str::trim).collect();

    let parsed = match head {
        "INIT_COMPLETE" => Some(DeviceEvent::Init(true)),
        "INIT_FAILED" => Some(DeviceEvent::Init(false)),
        "MODE_CURSOR" => Some(DeviceEvent::ModeAck(DeviceMode::Cursor)),
        "MODE_GESTURE" => Some(DeviceEvent::ModeAck(DeviceMode::Gesture)),
        "MODE_IDLE" => Some(DeviceEvent::ModeAck(DeviceMode::Idle)),
        "CALIBRATION_START" => Some(DeviceEvent::CalibrationStarted(CalibrationKind::Sensor)),
        "TILT_CALIBRATION_START" => Some(DeviceEvent::CalibrationStarted(CalibrationKind::Tilt)),
        "CALIBRATION_PROGRESS" => parse_progress(&fields),
        "CALIBRATION_COMPLETE" | "TILT_CALIBRATION_COMPLETE" => Some(DeviceEvent::CalibrationDone),
        "CALIBRATION_FAILED" => Some(DeviceEvent::CalibrationFailed),
        "CURSOR" => parse_cursor(&fields),
        "CURSOR_CENTERED" => Some(DeviceEvent::CursorCentered),
        "GESTURE" => parse_gesture(&fields),
        "GESTURE_DETECTED" => match fields.as_slice() {
            [label] if !label.is_empty() => Some(DeviceEvent::GestureDetected(label.to_string())),
            _ => None,
        },
        _ => return DeviceEvent::Unknown(line.to_string()),
    };

    parsed.unwrap_or_else(|| {
        warn!("Malformed {} line dropped: {:?}", head, line);
        DeviceEvent::Unknown(line.to_string())
    })
}

fn parse_progress(fields: &[&str]) -> Option<DeviceEvent> {
    match fields {
        [pct] => {
            let value = pct.parse::<i64>().ok()?;
            if (0..=100).contains(&value) {
                Some(DeviceEvent::CalibrationProgress(value as u8))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn parse_cursor(fields: &[&str]) -> Option<DeviceEvent> {
    match fields {
        [vx, vy] => {
            let vx = vx.parse::<f64>().ok().filter(|v| v.is_finite())?;
            let vy = vy.parse::<f64>().ok().filter(|v| v.is_finite())?;
            Some(DeviceEvent::CursorSample { vx, vy })
        }
        _ => None,
    }
}

fn parse_gesture(fields: &[&str]) -> Option<DeviceEvent> {
    match fields {
        [label] if !label.is_empty() && label.parse::<f64>().is_err() => {
            Some(DeviceEvent::GestureSample(GestureSample::Label(label.to_string())))
        }
        _ => RawSample::from_fields(fields)
            .map(|raw| DeviceEvent::GestureSample(GestureSample::Raw(raw))),
    }
}
