/// Upper bound for the smoothing factor; at 1.0 the filter would never move.
pub const MAX_SMOOTHING: f64 = 0.95;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSettings {
    pub sensitivity: f64,
    pub smoothing: f64,
    pub deadzone: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            smoothing: 0.5,
            deadzone: 0.05,
        }
    }
}

/// Previously emitted filtered velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CursorFilterState {
    pub prev_vx: f64,
    pub prev_vy: f64,
}

/// Relative pointer movement for the input sink. Absolute position clamping
/// is the sink's business.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerDelta {
    pub dx: f64,
    pub dy: f64,
}

/// Exponential smoothing, then deadzone, then sensitivity scaling.
pub struct MotionFilter {
    state: CursorFilterState,
    settings: MotionSettings,
}

impl MotionFilter {
    pub fn new(settings: MotionSettings) -> Self {
        let mut filter = Self {
            state: CursorFilterState::default(),
            settings,
        };
        filter.set_smoothing(settings.smoothing);
        filter.set_deadzone(settings.deadzone);
        filter
    }

    pub fn reset(&mut self) {
        self.state = CursorFilterState::default();
    }

    /// Feeds one velocity sample; `None` means the smoothed velocity sits
    /// inside the deadzone on both axes.
    pub fn update(&mut self, vx: f64, vy: f64) -> Option<PointerDelta> {
        let s = self.settings.smoothing;
        let vx = vx * (1.0 - s) + self.state.prev_vx * s;
        let vy = vy * (1.0 - s) + self.state.prev_vy * s;

        self.state.prev_vx = vx;
        self.state.prev_vy = vy;

        let deadzone = self.settings.deadzone;
        if vx.abs() < deadzone && vy.abs() < deadzone {
            return None;
        }

        Some(PointerDelta {
            dx: vx * self.settings.sensitivity,
            dy: vy * self.settings.sensitivity,
        })
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.settings.sensitivity = sensitivity;
    }

    /// Clamped to `[0, MAX_SMOOTHING]`; NaN falls back to 0.
    pub fn set_smoothing(&mut self, smoothing: f64) {
        self.settings.smoothing = if smoothing.is_nan() {
            0.0
        } else {
            smoothing.clamp(0.0, MAX_SMOOTHING)
        };
    }

    pub fn set_deadzone(&mut self, deadzone: f64) {
        self.settings.deadzone = deadzone.abs();
    }

    pub fn settings(&self) -> MotionSettings {
        self.settings
    }

    pub fn state(&self) -> CursorFilterState {
        self.state
    }
}

impl Default for MotionFilter {
    fn default() -> Self {
        Self::new(MotionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(smoothing: f64) -> MotionFilter {
        MotionFilter::new(MotionSettings {
            smoothing,
            ..MotionSettings::default()
        })
    }

    #[test]
    fn converges_without_overshoot() {
        let mut f = filter(0.5);
        let mut last = 0.0;
        for _ in 0..3 {
            let delta = f.update(0.2, 0.2).unwrap();
            assert!(delta.dx > last);
            assert!(delta.dx <= 0.2 && delta.dy <= 0.2);
            assert_eq!(delta.dx, delta.dy);
            last = delta.dx;
        }
        assert!((last - 0.175).abs() < 1e-12);
    }

    #[test]
    fn deadzone_boundary() {
        let mut f = filter(0.0);
        assert_eq!(f.update(0.04, 0.04), None);

        let mut f = filter(0.0);
        let delta = f.update(0.06, 0.0).unwrap();
        assert!((delta.dx - 0.06).abs() < 1e-12);
        assert_eq!(delta.dy, 0.0);
    }

    #[test]
    fn one_axis_outside_deadzone_moves_both() {
        let mut f = filter(0.0);
        let delta = f.update(0.01, -0.3).unwrap();
        assert!((delta.dx - 0.01).abs() < 1e-12);
        assert!((delta.dy + 0.3).abs() < 1e-12);
    }

    #[test]
    fn sustained_small_input_accumulates_through_deadzone() {
        let mut f = filter(0.5);
        assert_eq!(f.update(0.08, 0.0), None); // 0.04
        assert!(f.update(0.08, 0.0).is_some()); // 0.06
    }

    #[test]
    fn smoothing_is_clamped() {
        let mut f = filter(2.0);
        assert_eq!(f.settings().smoothing, MAX_SMOOTHING);
        f.set_smoothing(-1.0);
        assert_eq!(f.settings().smoothing, 0.0);
    }

    #[test]
    fn sensitivity_scales_after_deadzone() {
        let mut f = MotionFilter::new(MotionSettings {
            sensitivity: 10.0,
            smoothing: 0.0,
            deadzone: 0.05,
        });
        // Scaled value would clear the deadzone, the raw one does not.
        assert_eq!(f.update(0.01, 0.01), None);
        let delta = f.update(0.1, 0.0).unwrap();
        assert!((delta.dx - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reset_clears_history() {
        let mut f = filter(0.5);
        f.update(1.0, 1.0);
        f.reset();
        assert_eq!(f.state(), CursorFilterState::default());
    }
}
