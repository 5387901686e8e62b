use crate::signal::{seconds_to_samples, Events, TimeSeries};
use serde::{Deserialize, Serialize};

/// Finds approximate R-peak sample indices in an already bandpassed lead.
///
/// Implementations must return strictly increasing indices. They may miss
/// beats or report spurious ones; the fiducial search tolerates both.
pub trait RPeakLocator {
    fn locate(&self, filtered: &TimeSeries) -> Events;
}

impl<F> RPeakLocator for F
where
    F: Fn(&TimeSeries) -> Events,
{
    fn locate(&self, filtered: &TimeSeries) -> Events {
        self(filtered)
    }
}

/// A locator that ignores the signal and returns a known list of beats,
/// e.g. reference annotations loaded from an `.atr` file.
#[derive(Debug, Clone, Default)]
pub struct FixedPeaks {
    events: Events,
}

impl FixedPeaks {
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            events: Events::from_indices(indices).normalized(),
        }
    }
}

impl From<Events> for FixedPeaks {
    fn from(events: Events) -> Self {
        Self {
            events: events.normalized(),
        }
    }
}

impl RPeakLocator for FixedPeaks {
    fn locate(&self, _filtered: &TimeSeries) -> Events {
        self.events.clone()
    }
}

/// Tunables of the adaptive-threshold QRS detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lower cutoff for the single-pole high-pass filter (Hz).
    pub lowcut_hz: f64,
    /// Upper cutoff for the single-pole low-pass filter (Hz).
    pub highcut_hz: f64,
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Minimum physiological RR distance / refractory period (seconds).
    pub min_rr_s: f64,
    /// Scale between noise and signal envelopes for the adaptive threshold.
    pub threshold_scale: f64,
    /// How far back to search (seconds) for the precise R-peak after a detection.
    pub search_back_s: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            integration_window_s: 0.150,
            min_rr_s: 0.280,
            threshold_scale: 0.6,
            search_back_s: 0.150,
        }
    }
}

/// Pan–Tompkins style detector: QRS-band emphasis, derivative, squaring,
/// moving-window integration and an adaptive signal/noise threshold.
#[derive(Debug, Clone, Default)]
pub struct PanTompkinsLocator {
    cfg: DetectorConfig,
}

impl PanTompkinsLocator {
    pub fn new(cfg: DetectorConfig) -> Self {
        Self { cfg }
    }
}

impl RPeakLocator for PanTompkinsLocator {
    fn locate(&self, filtered: &TimeSeries) -> Events {
        if filtered.is_empty() {
            return Events::default();
        }
        let fs = filtered.fs.max(1.0);
        let (emphasized, envelope) = qrs_envelope(&filtered.data, fs, &self.cfg);
        let peaks = adaptive_peaks(&emphasized, &envelope, fs, &self.cfg);
        if peaks.len() < 2 {
            log::debug!(
                "adaptive threshold found {} beats, using local-maximum fallback",
                peaks.len()
            );
            return Events::from_indices(local_maxima_fallback(&filtered.data, fs, &self.cfg));
        }
        Events::from_indices(peaks)
    }
}

fn qrs_envelope(data: &[f64], fs: f64, cfg: &DetectorConfig) -> (Vec<f64>, Vec<f64>) {
    let hp = if cfg.lowcut_hz > 0.0 {
        single_pole_highpass(data, fs, cfg.lowcut_hz)
    } else {
        data.to_vec()
    };
    let emphasized = if cfg.highcut_hz <= 0.0 || cfg.highcut_hz >= fs * 0.5 {
        hp
    } else {
        single_pole_lowpass(&hp, fs, cfg.highcut_hz)
    };
    let squared: Vec<f64> = first_difference(&emphasized)
        .into_iter()
        .map(|d| d * d)
        .collect();
    let win = ((cfg.integration_window_s * fs).round() as usize).max(1);
    let envelope = moving_average(&squared, win);
    (emphasized, envelope)
}

fn single_pole_highpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let (mut prev_y, mut prev_x) = (data[0], data[0]);
    for &x in data {
        let y = alpha * (prev_y + x - prev_x);
        out.push(y);
        prev_y = y;
        prev_x = x;
    }
    out
}

fn single_pole_lowpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = dt / (rc + dt);
    let mut prev = data[0];
    data.iter()
        .map(|&x| {
            prev += alpha * (x - prev);
            prev
        })
        .collect()
}

fn first_difference(data: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for i in 1..data.len() {
        out[i] = data[i] - data[i - 1];
    }
    out
}

fn moving_average(data: &[f64], win: usize) -> Vec<f64> {
    if win <= 1 {
        return data.to_vec();
    }
    let mut out = vec![0.0; data.len()];
    let mut acc = 0.0;
    for (i, &sample) in data.iter().enumerate() {
        acc += sample;
        if i >= win {
            acc -= data[i - win];
        }
        out[i] = acc / win as f64;
    }
    out
}

fn adaptive_peaks(
    emphasized: &[f64],
    envelope: &[f64],
    fs: f64,
    cfg: &DetectorConfig,
) -> Vec<usize> {
    let refractory = seconds_to_samples(cfg.min_rr_s, fs).max(1);
    let search = ((cfg.search_back_s * fs).round() as usize).max(1);

    let init = envelope.len().min((fs as usize).max(1));
    let avg = envelope[..init].iter().sum::<f64>() / init as f64;
    let mut signal_level = avg;
    let mut noise_level = avg * 0.5;
    let mut threshold = noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);
    let mut last_detection = 0usize;
    let mut peaks: Vec<usize> = Vec::new();

    for (i, &sample) in envelope.iter().enumerate() {
        let refractory_ok = peaks.is_empty() || i - last_detection >= refractory;
        if sample >= threshold && refractory_ok {
            let start = i.saturating_sub(search);
            let end = i.min(emphasized.len() - 1);
            let mut best = start;
            for j in start..=end {
                if emphasized[j] > emphasized[best] {
                    best = j;
                }
            }
            peaks.push(best);
            last_detection = i;
            signal_level = 0.125 * sample + 0.875 * signal_level;
        } else {
            noise_level = 0.125 * sample + 0.875 * noise_level;
        }
        threshold = noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);
    }

    peaks.sort_unstable();
    peaks.dedup();
    peaks
}

fn local_maxima_fallback(data: &[f64], fs: f64, cfg: &DetectorConfig) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    let min_gap = seconds_to_samples(cfg.min_rr_s, fs).max(1);
    let baseline = moving_average(data, seconds_to_samples(0.150, fs).max(1));
    let detrended: Vec<f64> = data.iter().zip(&baseline).map(|(x, b)| x - b).collect();

    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..data.len() - 1 {
        let y = detrended[i];
        let is_peak = y > 0.0 && y > detrended[i - 1] && y > detrended[i + 1];
        if is_peak && peaks.last().map_or(true, |&last| i - last >= min_gap) {
            peaks.push(i);
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{synthesize, SynthConfig};

    #[test]
    fn detects_regular_beats() {
        let cfg = SynthConfig {
            fs: 360.0,
            seconds: 10.0,
            bpm: 60.0,
            noise: 0.0,
            ..SynthConfig::default()
        };
        let synthetic = synthesize(&cfg);
        let events = PanTompkinsLocator::default().locate(&synthetic.signal);
        assert_eq!(events.len(), synthetic.r_peaks.len());
        let tol = seconds_to_samples(0.04, cfg.fs);
        for (found, truth) in events.indices.iter().zip(&synthetic.r_peaks) {
            let diff = (*found as isize - *truth as isize).unsigned_abs();
            assert!(diff <= tol, "detected {found}, expected {truth}");
        }
    }

    #[test]
    fn detections_are_strictly_increasing() {
        let synthetic = synthesize(&SynthConfig::default());
        let events = PanTompkinsLocator::default().locate(&synthetic.signal);
        assert!(events.indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_signal_has_no_beats() {
        let ts = TimeSeries::new(360.0, Vec::new());
        assert!(PanTompkinsLocator::default().locate(&ts).is_empty());
    }

    #[test]
    fn fixed_peaks_are_normalized() {
        let locator = FixedPeaks::new(vec![460, 100, 820, 460]);
        let ts = TimeSeries::new(360.0, vec![0.0; 10]);
        assert_eq!(locator.locate(&ts).indices, vec![100, 460, 820]);
    }

    #[test]
    fn closures_act_as_locators() {
        let locator = |ts: &TimeSeries| Events::from_indices(vec![ts.len() / 2]);
        let ts = TimeSeries::new(100.0, vec![0.0; 40]);
        assert_eq!(locator.locate(&ts).indices, vec![20]);
    }
}
