//! Air-mouse host for an IMU wand: line transport, device session,
//! cursor filtering and gesture recognition.

pub mod app;
pub mod config;
pub mod database;
pub mod gesture;
pub mod logger;
pub mod motion;
pub mod session;
pub mod transport;
pub mod types;

pub use config::{AppConfig, ConfigError, ConfigManager};
pub use gesture::{GestureEngine, GestureError, TrainError};
pub use motion::{MotionFilter, MotionSettings, PointerDelta};
pub use session::{DeviceSession, SessionError, SessionOptions};
pub use transport::{LineTransport, TcpEndpoint, TransportError};
pub use types::{DeviceEvent, RawSample};
