//! Linear-phase FIR bandpass used to clean the raw lead before any detection.
//!
//! Taps come from the windowed-sinc method (Hamming window) and are scaled to
//! unit gain at the centre of the passband. Filtering is causal, so the output
//! lags the input by `(numtaps - 1) / 2` samples; every index produced
//! downstream lives in that delayed index space.

use crate::error::{PqrstError, Result};
use crate::signal::TimeSeries;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Cutoffs and tap count of the bandpass stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Lower cutoff (Hz).
    pub low_hz: f64,
    /// Upper cutoff (Hz).
    pub high_hz: f64,
    /// Number of taps; must be odd.
    pub numtaps: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_hz: 3.0,
            high_hz: 45.0,
            numtaps: 101,
        }
    }
}

impl FilterConfig {
    /// Checks the configuration against a sample rate without designing taps.
    pub fn validate(&self, fs: f64) -> Result<()> {
        if self.numtaps == 0 || self.numtaps % 2 == 0 {
            return Err(PqrstError::invalid_filter(format!(
                "numtaps must be odd and non-zero, got {}",
                self.numtaps
            )));
        }
        if !(fs.is_finite() && fs > 0.0) {
            return Err(PqrstError::invalid_filter(format!(
                "sample rate must be positive, got {fs}"
            )));
        }
        let nyquist = 0.5 * fs;
        if !(self.low_hz > 0.0 && self.low_hz < self.high_hz && self.high_hz < nyquist) {
            return Err(PqrstError::invalid_filter(format!(
                "cutoffs must satisfy 0 < low < high < nyquist ({nyquist} Hz), got {} / {} Hz",
                self.low_hz, self.high_hz
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FirBandpass {
    taps: Vec<f64>,
}

impl FirBandpass {
    pub fn design(fs: f64, cfg: &FilterConfig) -> Result<Self> {
        cfg.validate(fs)?;
        let nyquist = 0.5 * fs;
        let left = cfg.low_hz / nyquist;
        let right = cfg.high_hz / nyquist;
        let n = cfg.numtaps;
        let alpha = 0.5 * (n - 1) as f64;
        let window = hamming(n);

        let mut taps: Vec<f64> = (0..n)
            .map(|i| {
                let m = i as f64 - alpha;
                (right * sinc(right * m) - left * sinc(left * m)) * window[i]
            })
            .collect();

        let centre = 0.5 * (left + right);
        let gain: f64 = taps
            .iter()
            .enumerate()
            .map(|(i, h)| h * (PI * (i as f64 - alpha) * centre).cos())
            .sum();
        if gain.abs() < f64::EPSILON {
            return Err(PqrstError::invalid_filter(
                "passband gain vanished; widen the band or add taps",
            ));
        }
        for h in taps.iter_mut() {
            *h /= gain;
        }
        Ok(Self { taps })
    }

    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Samples of delay introduced by the filter.
    pub fn group_delay(&self) -> usize {
        (self.taps.len() - 1) / 2
    }

    /// Causal convolution with zero initial state. Output has the input's length.
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        let taps = &self.taps;
        (0..input.len())
            .map(|i| {
                let reach = taps.len().min(i + 1);
                let mut acc = 0.0;
                for k in 0..reach {
                    acc += taps[k] * input[i - k];
                }
                acc
            })
            .collect()
    }
}

/// Designs the configured filter for `ts.fs` and runs it over the series.
pub fn bandpass(ts: &TimeSeries, cfg: &FilterConfig) -> Result<TimeSeries> {
    let fir = FirBandpass::design(ts.fs, cfg)?;
    Ok(TimeSeries {
        fs: ts.fs,
        data: fir.apply(&ts.data),
    })
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

fn hamming(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    let denom = (size - 1) as f64;
    (0..size)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}
