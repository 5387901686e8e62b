//! Window-bounded extremum search for the Q, S, P and T points around each
//! R-peak.
//!
//! Q and S are the minima just before and just after R. P is the maximum in
//! the stretch preceding Q, T the maximum following S. All windows are
//! half-open, clipped to the signal, and sized by truncating `seconds * fs`.

use crate::signal::{seconds_to_samples, Events, TimeSeries};
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeakKind {
    P,
    Q,
    R,
    S,
    T,
}

/// Search window widths (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Lookback from R for Q.
    pub q_s: f64,
    /// Lookahead from R for S.
    pub s_s: f64,
    /// Lookback from Q for P.
    pub p_s: f64,
    /// Lookahead from S for T.
    pub t_s: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            q_s: 0.08,
            s_s: 0.08,
            p_s: 0.2,
            t_s: 0.4,
        }
    }
}

/// Window widths converted to sample counts for one sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowSamples {
    q: usize,
    s: usize,
    p: usize,
    t: usize,
}

impl WindowSamples {
    fn new(cfg: &WindowConfig, fs: f64) -> Self {
        Self {
            q: seconds_to_samples(cfg.q_s, fs),
            s: seconds_to_samples(cfg.s_s, fs),
            p: seconds_to_samples(cfg.p_s, fs),
            t: seconds_to_samples(cfg.t_s, fs),
        }
    }
}

/// Fiducial points of one cardiac cycle. `None` means the search window was
/// empty or never searched; `Some(0)` is a real peak at the first sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakSet {
    pub r: usize,
    pub q: Option<usize>,
    pub s: Option<usize>,
    pub p: Option<usize>,
    pub t: Option<usize>,
}

impl PeakSet {
    /// True when P, Q, S and T were all found.
    pub fn is_complete(&self) -> bool {
        self.p.is_some() && self.q.is_some() && self.s.is_some() && self.t.is_some()
    }
}

/// Per-kind sequences of present peaks, in R-peak order, plus the per-cycle
/// sets they were collected from.
///
/// `r` is the locator output unchanged. The other sequences omit absent
/// entries, so equal positions in two sequences need not share a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiducialPoints {
    pub p: Vec<usize>,
    pub q: Vec<usize>,
    pub r: Vec<usize>,
    pub s: Vec<usize>,
    pub t: Vec<usize>,
    pub cycles: Vec<PeakSet>,
}

impl FiducialPoints {
    pub fn sequence(&self, kind: PeakKind) -> &[usize] {
        match kind {
            PeakKind::P => &self.p,
            PeakKind::Q => &self.q,
            PeakKind::R => &self.r,
            PeakKind::S => &self.s,
            PeakKind::T => &self.t,
        }
    }

    /// Whether dropping absent peaks left the four participating sequences
    /// with different lengths.
    pub fn is_ragged(&self) -> bool {
        let n = self.p.len();
        self.q.len() != n || self.s.len() != n || self.t.len() != n
    }
}

/// Index of the first minimum of `data[range]`, in signal coordinates.
pub fn argmin_in<T: Float>(data: &[T], range: Range<usize>) -> Option<usize> {
    extremum_in(data, range, |candidate, best| candidate < best)
}

/// Index of the first maximum of `data[range]`, in signal coordinates.
pub fn argmax_in<T: Float>(data: &[T], range: Range<usize>) -> Option<usize> {
    extremum_in(data, range, |candidate, best| candidate > best)
}

// Strict comparison keeps the lowest index on ties. NaN samples are never
// selected, so a window holding only NaN has no extremum.
fn extremum_in<T, F>(data: &[T], range: Range<usize>, better: F) -> Option<usize>
where
    T: Float,
    F: Fn(T, T) -> bool,
{
    let end = range.end.min(data.len());
    let start = range.start.min(end);
    let mut best: Option<usize> = None;
    for idx in start..end {
        if data[idx].is_nan() {
            continue;
        }
        best = match best {
            Some(b) if !better(data[idx], data[b]) => Some(b),
            _ => Some(idx),
        };
    }
    best
}

fn search_with(data: &[f64], r: usize, w: WindowSamples) -> PeakSet {
    let len = data.len();
    let q = argmin_in(data, r.saturating_sub(w.q)..r.min(len));
    let s = argmin_in(data, r..r.saturating_add(w.s).min(len));
    let p = q.and_then(|q| argmax_in(data, q.saturating_sub(w.p)..q));
    let t = s.and_then(|s| argmax_in(data, s..s.saturating_add(w.t).min(len)));
    PeakSet { r, q, s, p, t }
}

/// Searches the Q, S, P and T windows anchored on one R-peak.
pub fn search_cycle(signal: &[f64], r: usize, cfg: &WindowConfig, fs: f64) -> PeakSet {
    search_with(signal, r, WindowSamples::new(cfg, fs))
}

/// Runs the window search for every R-peak, preserving R order.
pub fn find_fiducials(signal: &TimeSeries, r_peaks: &Events, cfg: &WindowConfig) -> FiducialPoints {
    let windows = WindowSamples::new(cfg, signal.fs);
    let mut points = FiducialPoints {
        r: r_peaks.indices.clone(),
        ..FiducialPoints::default()
    };
    for &r in &r_peaks.indices {
        let set = search_with(&signal.data, r, windows);
        points.q.extend(set.q);
        points.s.extend(set.s);
        points.p.extend(set.p);
        points.t.extend(set.t);
        points.cycles.push(set);
    }
    log::debug!(
        "fiducials over {} R-peaks: P={} Q={} S={} T={}",
        points.r.len(),
        points.p.len(),
        points.q.len(),
        points.s.len(),
        points.t.len()
    );
    points
}
