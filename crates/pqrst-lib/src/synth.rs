//! Synthetic single-lead ECG built from bell-shaped P, Q, R, S and T
//! deflections, with optional baseline drift and uniform jitter.

use crate::signal::TimeSeries;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One deflection of the template beat, placed relative to the R-peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deflection {
    /// Centre offset from the R-peak (seconds).
    pub offset_s: f64,
    /// Support of the bell (seconds).
    pub width_s: f64,
    /// Peak height; negative for dips.
    pub height: f64,
}

impl Deflection {
    const fn new(offset_s: f64, width_s: f64, height: f64) -> Self {
        Self {
            offset_s,
            width_s,
            height,
        }
    }

    fn value_at(&self, dt: f64) -> f64 {
        let u = (dt - self.offset_s) / self.width_s;
        if u.abs() > 0.5 {
            0.0
        } else {
            self.height * (-60.0 * u * u).exp()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub fs: f64,
    pub seconds: f64,
    pub bpm: f64,
    /// Time of the first R-peak (seconds).
    pub first_beat_s: f64,
    /// Amplitude of the 0.5 Hz baseline drift.
    pub baseline: f64,
    /// Half-range of the uniform per-sample jitter.
    pub noise: f64,
    pub seed: u64,
    /// P, Q, R, S, T in that order.
    pub template: [Deflection; 5],
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            fs: 360.0,
            seconds: 10.0,
            bpm: 72.0,
            first_beat_s: 0.4,
            baseline: 0.03,
            noise: 0.015,
            seed: 7,
            template: [
                Deflection::new(-0.160, 0.100, 0.15),
                Deflection::new(-0.035, 0.028, -0.2),
                Deflection::new(0.0, 0.056, 1.0),
                Deflection::new(0.035, 0.028, -0.3),
                Deflection::new(0.300, 0.200, 0.35),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Synthetic {
    pub signal: TimeSeries,
    /// Sample indices of the generated R-peaks.
    pub r_peaks: Vec<usize>,
}

pub fn synthesize(cfg: &SynthConfig) -> Synthetic {
    let fs = cfg.fs;
    let samples = (cfg.seconds * fs).max(0.0) as usize;
    let period = 60.0 / cfg.bpm.max(1.0);

    let mut beats = Vec::new();
    let mut t = cfg.first_beat_s;
    while t < cfg.seconds {
        beats.push(t);
        t += period;
    }

    let reach = cfg
        .template
        .iter()
        .map(|d| d.offset_s.abs() + d.width_s)
        .fold(0.0, f64::max);
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut data = Vec::with_capacity(samples);
    for i in 0..samples {
        let time = i as f64 / fs;
        let mut v = cfg.baseline * (2.0 * PI * 0.5 * time).sin();
        for &beat in &beats {
            let dt = time - beat;
            if dt.abs() > reach {
                continue;
            }
            v += cfg.template.iter().map(|d| d.value_at(dt)).sum::<f64>();
        }
        if cfg.noise > 0.0 {
            v += rng.gen_range(-cfg.noise..=cfg.noise);
        }
        data.push(v);
    }

    let r_peaks = beats
        .iter()
        .map(|&b| (b * fs).round() as usize)
        .filter(|&idx| idx < samples)
        .collect();
    Synthetic {
        signal: TimeSeries { fs, data },
        r_peaks,
    }
}
