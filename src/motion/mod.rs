pub mod filter;

pub use filter::{CursorFilterState, MotionFilter, MotionSettings, PointerDelta, MAX_SMOOTHING};
