use crate::types::raw_sample::{RawSample, AXES};

/// Descriptors computed per axis: mean, std, min, max, range, rms,
/// zero-crossing rate.
const PER_AXIS: usize = 7;

/// Length of every vector returned by [`extract_features`].
pub const FEATURE_LEN: usize = AXES * PER_AXIS + 2 + 6;

/// Per-axis stats, then gyro and accel energy, then the `xy, yz, xz`
/// correlations of each triple. An empty window yields all zeros.
pub fn extract_features(samples: &[RawSample]) -> Vec<f64> {
    let mut features = Vec::with_capacity(FEATURE_LEN);

    let channels: Vec<Vec<f64>> = (0..AXES)
        .map(|axis| samples.iter().map(|s| s.to_array()[axis]).collect())
        .collect();

    for signal in &channels {
        features.extend(time_domain_features(signal));
    }

    features.push(mean_of(samples.iter().map(|s| s.gyro_magnitude().powi(2))));
    features.push(mean_of(samples.iter().map(|s| s.accel_magnitude().powi(2))));

    for base in [0usize, 3] {
        let (x, y, z) = (&channels[base], &channels[base + 1], &channels[base + 2]);
        features.push(correlation(x, y));
        features.push(correlation(y, z));
        features.push(correlation(x, z));
    }

    debug_assert_eq!(features.len(), FEATURE_LEN);
    features
}

fn time_domain_features(signal: &[f64]) -> [f64; PER_AXIS] {
    if signal.is_empty() {
        return [0.0; PER_AXIS];
    }

    let mean = mean(signal);
    let std = std_dev(signal, mean);
    let min = signal.iter().copied().fold(f64::INFINITY, f64::min);
    let max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let rms = (signal.iter().map(|v| v * v).sum::<f64>() / signal.len() as f64).sqrt();

    [mean, std, min, max, max - min, rms, zero_crossing_rate(signal)]
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Population standard deviation.
fn std_dev(data: &[f64], mean: f64) -> f64 {
    if data.len() <= 1 {
        return 0.0;
    }
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

fn zero_crossing_rate(data: &[f64]) -> f64 {
    if data.len() <= 1 {
        return 0.0;
    }
    let crossings = data
        .windows(2)
        .filter(|w| (w[0] < 0.0 && w[1] >= 0.0) || (w[0] >= 0.0 && w[1] < 0.0))
        .count();
    crossings as f64 / (data.len() - 1) as f64
}

/// Pearson correlation; 0 when either side has no variance.
fn correlation(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || a.len() != b.len() {
        return 0.0;
    }
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va <= f64::EPSILON || vb <= f64::EPSILON {
        return 0.0;
    }
    cov / (va.sqrt() * vb.sqrt())
}
