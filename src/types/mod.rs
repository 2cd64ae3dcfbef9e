pub mod command;
pub mod device_event;
pub mod gesture_set;
pub mod raw_sample;
pub mod results;

pub use command::Command;
pub use device_event::{parse_line, CalibrationKind, DeviceEvent, DeviceMode, GestureSample};
pub use gesture_set::GestureSet;
pub use raw_sample::RawSample;
pub use results::{Prediction, SampleOutcome, TrainSummary};
