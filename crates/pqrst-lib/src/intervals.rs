use crate::error::PqrstError;
use crate::fiducial::{FiducialPoints, PeakSet};
use serde::{Deserialize, Serialize};
use std::fmt;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    PQ,
    QRS,
    ST,
}

impl Phase {
    pub const ORDER: [Phase; 3] = [Phase::PQ, Phase::QRS, Phase::ST];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PQ => "PQ",
            Phase::QRS => "QRS",
            Phase::ST => "ST",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a cardiac cycle. Durations are not clamped and may be
/// negative when noisy input breaks the P < Q < S < T ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalRecord {
    /// Start time (seconds).
    pub entry: f64,
    /// Length (seconds).
    pub duration: f64,
    pub phase: Phase,
}

/// How the i-th P, Q, S and T are paired into a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    /// Pair by position in the compacted per-kind sequences. Asymmetric
    /// drops shift later cycles against each other.
    #[default]
    Positional,
    /// Pair peaks found for the same R-peak; incomplete cycles are dropped.
    PerCycle,
}

/// Present-peak times in seconds, one sequence per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakTimes {
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    pub r: Vec<f64>,
    pub s: Vec<f64>,
    pub t: Vec<f64>,
}

impl PeakTimes {
    pub fn from_fiducials(points: &FiducialPoints, fs: f64) -> Self {
        Self {
            p: to_seconds(&points.p, fs),
            q: to_seconds(&points.q, fs),
            r: to_seconds(&points.r, fs),
            s: to_seconds(&points.s, fs),
            t: to_seconds(&points.t, fs),
        }
    }

    /// Number of cycles the positional builder will attempt.
    pub fn cycle_count(&self) -> usize {
        self.p
            .len()
            .min(self.q.len())
            .min(self.s.len())
            .min(self.t.len())
    }
}

fn to_seconds(indices: &[usize], fs: f64) -> Vec<f64> {
    indices.iter().map(|&i| i as f64 / fs).collect()
}

/// Records produced by the builder plus the cycles it had to skip.
#[derive(Debug, Default)]
pub struct IntervalBuild {
    pub records: Vec<IntervalRecord>,
    pub attempted: usize,
    pub skipped: Vec<PqrstError>,
}

impl IntervalBuild {
    pub fn built_cycles(&self) -> usize {
        self.records.len() / Phase::ORDER.len()
    }

    fn push_cycle(&mut self, cycle: usize, outcome: Result<[IntervalRecord; 3], PqrstError>) {
        self.attempted += 1;
        match outcome {
            Ok(records) => self.records.extend(records),
            Err(err) => {
                log::warn!("skipping cycle {cycle}: {err}");
                self.skipped.push(err);
            }
        }
    }
}

fn cycle_records(
    cycle: usize,
    p: Option<f64>,
    q: Option<f64>,
    s: Option<f64>,
    t: Option<f64>,
) -> Result<[IntervalRecord; 3], PqrstError> {
    let fail = |reason: String| PqrstError::CycleBuildFailure { cycle, reason };
    let (p, q, s, t) = match (p, q, s, t) {
        (Some(p), Some(q), Some(s), Some(t)) => (p, q, s, t),
        _ => return Err(fail("missing fiducial point".into())),
    };
    if let Some(bad) = [p, q, s, t].into_iter().find(|v| !v.is_finite()) {
        return Err(fail(format!("non-finite peak time {bad}")));
    }
    Ok([
        IntervalRecord {
            entry: p,
            duration: q - p,
            phase: Phase::PQ,
        },
        IntervalRecord {
            entry: q,
            duration: s - q,
            phase: Phase::QRS,
        },
        IntervalRecord {
            entry: s,
            duration: t - s,
            phase: Phase::ST,
        },
    ])
}

/// Pairs the i-th present P, Q, S and T for `i < min(|P|, |Q|, |S|, |T|)`.
pub fn build_intervals(times: &PeakTimes) -> IntervalBuild {
    let n = times.cycle_count();
    let mut build = IntervalBuild::default();
    for i in 0..n {
        let outcome = cycle_records(
            i,
            times.p.get(i).copied(),
            times.q.get(i).copied(),
            times.s.get(i).copied(),
            times.t.get(i).copied(),
        );
        build.push_cycle(i, outcome);
    }
    build
}

/// Builds records from complete per-R-peak sets only, so a missing P or T
/// never shifts the pairing of later cycles.
pub fn build_intervals_per_cycle(cycles: &[PeakSet], fs: f64) -> IntervalBuild {
    let time = |idx: Option<usize>| idx.map(|i| i as f64 / fs);
    let mut build = IntervalBuild::default();
    for (i, set) in cycles.iter().enumerate().filter(|(_, set)| set.is_complete()) {
        let outcome = cycle_records(i, time(set.p), time(set.q), time(set.s), time(set.t));
        build.push_cycle(i, outcome);
    }
    build
}
