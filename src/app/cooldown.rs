use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-label rate limit. Each label has its own bucket, timed from the last
/// accepted occurrence of that label.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    default: Duration,
    per_label: HashMap<String, Duration>,
    last_accepted: HashMap<String, Instant>,
}

impl CooldownTracker {
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            per_label: HashMap::new(),
            last_accepted: HashMap::new(),
        }
    }

    pub fn with_overrides<I, S>(default: Duration, overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, Duration)>,
        S: Into<String>,
    {
        let mut tracker = Self::new(default);
        for (label, cooldown) in overrides {
            tracker.per_label.insert(label.into(), cooldown);
        }
        tracker
    }

    pub fn cooldown_for(&self, label: &str) -> Duration {
        self.per_label.get(label).copied().unwrap_or(self.default)
    }

    /// Returns true and restarts the label's cooldown if it has elapsed.
    /// Rejected occurrences do not extend the cooldown.
    pub fn accept(&mut self, label: &str, now: Instant) -> bool {
        let cooldown = self.cooldown_for(label);
        if let Some(last) = self.last_accepted.get(label) {
            if now.saturating_duration_since(*last) < cooldown {
                return false;
            }
        }
        self.last_accepted.insert(label.to_string(), now);
        true
    }

    pub fn clear(&mut self) {
        self.last_accepted.clear();
    }
}
