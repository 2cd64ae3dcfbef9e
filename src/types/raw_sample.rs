use serde::{Deserialize, Serialize};

/// Number of numeric fields carried by one gesture line.
pub const AXES: usize = 6;

/// One gyroscope + accelerometer reading, in the device's wire order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RawSample {
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
}

impl RawSample {
    pub fn new(gx: f64, gy: f64, gz: f64, ax: f64, ay: f64, az: f64) -> Self {
        Self { gx, gy, gz, ax, ay, az }
    }

    pub fn from_array(values: [f64; AXES]) -> Self {
        let [gx, gy, gz, ax, ay, az] = values;
        Self::new(gx, gy, gz, ax, ay, az)
    }

    /// Parses exactly six comma-separated numeric fields. Anything else,
    /// including a single unparsable field, yields `None` so that a malformed
    /// line is never partially applied.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() != AXES {
            return None;
        }

        let mut values = [0.0f64; AXES];
        for (slot, field) in values.iter_mut().zip(fields) {
            let value = field.trim().parse::<f64>().ok()?;
            if !value.is_finite() {
                return None;
            }
            *slot = value;
        }

        Some(Self::from_array(values))
    }

    /// Axis values in fixed order `gx, gy, gz, ax, ay, az`.
    pub fn to_array(&self) -> [f64; AXES] {
        [self.gx, self.gy, self.gz, self.ax, self.ay, self.az]
    }

    pub fn gyro_magnitude(&self) -> f64 {
        (self.gx * self.gx + self.gy * self.gy + self.gz * self.gz).sqrt()
    }

    pub fn accel_magnitude(&self) -> f64 {
        (self.ax * self.ax + self.ay * self.ay + self.az * self.az).sqrt()
    }
}
