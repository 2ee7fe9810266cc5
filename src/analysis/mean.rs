use serde::{Deserialize, Serialize};

/// Running average updated in O(1) per sample.
///
/// The sample count is owned by the caller (the stats entry that holds the
/// mean), so the same counter drives every mean of an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IterativeMean {
    value: f64,
}

impl IterativeMean {
    pub fn new() -> Self {
        IterativeMean { value: 0.0 }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// `count` is the number of samples including this one, so the first
    /// update passes 1.
    pub fn update(&mut self, sample: f64, count: u64) {
        self.value += (sample - self.value) / count as f64;
    }

    /// Restore path for snapshots. Never use it to feed samples.
    pub fn set(&mut self, value: f64) {
        self.value = value;
    }

    /// Formats a mean of seconds as `mm:ss`.
    pub fn to_clock(&self) -> String {
        let total = self.value.max(0.0) as u64;
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}
