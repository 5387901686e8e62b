use serde::{Deserialize, Serialize};

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
    /// Number of whole samples covered by `seconds`, truncated toward zero.
    pub fn samples_in(&self, seconds: f64) -> usize {
        seconds_to_samples(seconds, self.fs)
    }
}

/// Converts a duration to a sample count, truncating toward zero.
pub fn seconds_to_samples(seconds: f64, fs: f64) -> usize {
    let n = seconds * fs;
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        0
    }
}

/// Point events on a timeline (e.g., R-peaks indices)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// Sorts and removes duplicates so the indices are strictly increasing.
    pub fn normalized(mut self) -> Self {
        self.indices.sort_unstable();
        self.indices.dedup();
        self
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_conversion_truncates() {
        assert_eq!(seconds_to_samples(0.08, 360.0), 28);
        assert_eq!(seconds_to_samples(0.2, 360.0), 72);
        assert_eq!(seconds_to_samples(0.4, 250.0), 100);
        assert_eq!(seconds_to_samples(-1.0, 360.0), 0);
    }

    #[test]
    fn normalized_events_are_strictly_increasing() {
        let events = Events::from_indices(vec![40, 10, 40, 25]).normalized();
        assert_eq!(events.indices, vec![10, 25, 40]);
    }
}
