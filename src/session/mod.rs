pub mod device;
pub mod error;
pub mod state;

pub use device::{DeviceSession, SessionOptions};
pub use error::SessionError;
pub use state::{CalibrationStatus, ConnectionState, SessionState};
