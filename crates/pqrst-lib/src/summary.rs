use crate::intervals::{IntervalRecord, Phase};
use serde::{Deserialize, Serialize};

/// Aggregate view of a phases export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub records: usize,
    pub qrs_count: usize,
    pub first_qrs: Option<f64>,
    pub last_qrs: Option<f64>,
    /// `60 * (n - 1) / (last - first)` over QRS entries; needs two QRS records.
    pub bpm: Option<f64>,
    pub mean_pq: Option<f64>,
    pub mean_qrs: Option<f64>,
    pub mean_st: Option<f64>,
    /// Records whose duration came out negative.
    pub negative_durations: usize,
}

pub fn summarize(records: &[IntervalRecord]) -> PhaseSummary {
    let qrs_entries: Vec<f64> = records
        .iter()
        .filter(|r| r.phase == Phase::QRS)
        .map(|r| r.entry)
        .collect();
    let first_qrs = qrs_entries.first().copied();
    let last_qrs = qrs_entries.last().copied();
    let bpm = match (first_qrs, last_qrs) {
        (Some(first), Some(last)) if qrs_entries.len() > 1 && last > first => {
            Some(60.0 * (qrs_entries.len() - 1) as f64 / (last - first))
        }
        _ => None,
    };

    PhaseSummary {
        records: records.len(),
        qrs_count: qrs_entries.len(),
        first_qrs,
        last_qrs,
        bpm,
        mean_pq: mean_duration(records, Phase::PQ),
        mean_qrs: mean_duration(records, Phase::QRS),
        mean_st: mean_duration(records, Phase::ST),
        negative_durations: records.iter().filter(|r| r.duration < 0.0).count(),
    }
}

fn mean_duration(records: &[IntervalRecord], phase: Phase) -> Option<f64> {
    let (sum, n) = records
        .iter()
        .filter(|r| r.phase == phase)
        .fold((0.0, 0usize), |(sum, n), r| (sum + r.duration, n + 1));
    (n > 0).then(|| sum / n as f64)
}
