use std::time::Duration;

use crate::transport::TransportError;

use super::state::ConnectionState;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Device did not complete initialization within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("Device rejected initialization")]
    InitRejected,
    #[error("Calibration did not finish within {0:?}")]
    CalibrationTimeout(Duration),
    #[error("Device reported calibration failure")]
    CalibrationFailed,
    #[error("A calibration is already in progress")]
    AlreadyCalibrating,
    #[error("Session is not ready (state: {0:?})")]
    NotReady(ConnectionState),
    #[error("Session disconnected")]
    Disconnected,
}
