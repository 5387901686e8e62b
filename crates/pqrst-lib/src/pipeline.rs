use crate::error::Result;
use crate::export::{assemble, ExportBundle};
use crate::fiducial::{find_fiducials, FiducialPoints, WindowConfig};
use crate::filter::{FilterConfig, FirBandpass};
use crate::intervals::{
    build_intervals, build_intervals_per_cycle, Alignment, IntervalBuild, PeakTimes,
};
use crate::locator::RPeakLocator;
use crate::signal::{Events, TimeSeries};
use serde::{Deserialize, Serialize};

/// Every tunable of the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub windows: WindowConfig,
    /// Length of the exported waveform (seconds).
    pub export_seconds: f64,
    pub alignment: Alignment,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            windows: WindowConfig::default(),
            export_seconds: 60.0,
            alignment: Alignment::Positional,
        }
    }
}

/// Everything one run produced, for callers that want more than the bundle.
#[derive(Debug)]
pub struct PipelineOutput {
    pub filtered: TimeSeries,
    pub r_peaks: Events,
    pub fiducials: FiducialPoints,
    pub build: IntervalBuild,
    pub bundle: ExportBundle,
}

pub struct Pipeline {
    config: PipelineConfig,
    locator: Box<dyn RPeakLocator>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, locator: Box<dyn RPeakLocator>) -> Self {
        Self { config, locator }
    }

    /// Filter, locate R-peaks, search fiducials, build intervals, package.
    ///
    /// Only an invalid filter configuration aborts; cycles that cannot be
    /// built are skipped and reported in `PipelineOutput::build`.
    pub fn run(&self, raw: &TimeSeries) -> Result<PipelineOutput> {
        let cfg = &self.config;
        let fir = FirBandpass::design(raw.fs, &cfg.filter)?;
        let filtered = TimeSeries {
            fs: raw.fs,
            data: fir.apply(&raw.data),
        };
        log::debug!(
            "filtered {} samples ({}-{} Hz, {} taps, delay {} samples)",
            filtered.len(),
            cfg.filter.low_hz,
            cfg.filter.high_hz,
            cfg.filter.numtaps,
            fir.group_delay()
        );

        let r_peaks = self.locator.locate(&filtered).normalized();
        log::debug!("locator reported {} R-peaks", r_peaks.len());

        let fiducials = find_fiducials(&filtered, &r_peaks, &cfg.windows);
        let build = match cfg.alignment {
            Alignment::Positional => {
                if fiducials.is_ragged() {
                    log::warn!(
                        "absent peaks left P/Q/S/T sequences of lengths {}/{}/{}/{}; \
                         positional pairing may mix neighbouring cycles",
                        fiducials.p.len(),
                        fiducials.q.len(),
                        fiducials.s.len(),
                        fiducials.t.len()
                    );
                }
                build_intervals(&PeakTimes::from_fiducials(&fiducials, filtered.fs))
            }
            Alignment::PerCycle => build_intervals_per_cycle(&fiducials.cycles, filtered.fs),
        };
        if !build.skipped.is_empty() {
            log::warn!(
                "{} of {} cycles skipped while building intervals",
                build.skipped.len(),
                build.attempted
            );
        }

        let bundle = assemble(&filtered, build.records.clone(), cfg.export_seconds);
        Ok(PipelineOutput {
            filtered,
            r_peaks,
            fiducials,
            build,
            bundle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PqrstError;
    use crate::intervals::Phase;
    use crate::locator::{FixedPeaks, PanTompkinsLocator};
    use crate::synth::{synthesize, SynthConfig};

    fn ten_second_recording() -> TimeSeries {
        synthesize(&SynthConfig {
            fs: 360.0,
            seconds: 10.0,
            bpm: 60.0,
            first_beat_s: 50.0 / 360.0,
            ..SynthConfig::default()
        })
        .signal
    }

    #[test]
    fn three_known_beats_give_nine_ordered_records() {
        let raw = ten_second_recording();
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Box::new(FixedPeaks::new(vec![100, 460, 820])),
        );
        let out = pipeline.run(&raw).expect("pipeline");
        let records = &out.bundle.phases;
        assert_eq!(records.len(), 9);
        assert!(records.windows(2).all(|w| w[0].entry < w[1].entry));
        let phases: Vec<Phase> = records.iter().map(|r| r.phase).collect();
        assert_eq!(phases, Phase::ORDER.repeat(3));
        assert!(out.build.skipped.is_empty());
        // Shorter than the export window, so exported whole.
        assert_eq!(out.bundle.plot.len(), raw.len());
        assert_eq!(out.bundle.plot, out.filtered.data);
    }

    #[test]
    fn runs_are_reproducible() {
        let raw = ten_second_recording();
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Box::new(FixedPeaks::new(vec![100, 460, 820])),
        );
        let first = pipeline.run(&raw).expect("first run");
        let second = pipeline.run(&raw).expect("second run");
        assert_eq!(first.fiducials, second.fiducials);
        assert_eq!(first.bundle, second.bundle);
    }

    #[test]
    fn detector_driven_run_finds_every_beat() {
        let raw = synthesize(&SynthConfig {
            bpm: 72.0,
            ..SynthConfig::default()
        });
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Box::new(PanTompkinsLocator::default()),
        );
        let out = pipeline.run(&raw.signal).expect("pipeline");
        assert_eq!(out.r_peaks.len(), raw.r_peaks.len());
        assert_eq!(out.bundle.phases.len(), 3 * raw.r_peaks.len());
        for record in &out.bundle.phases {
            assert!(record.duration > 0.0, "{record:?}");
        }
    }

    #[test]
    fn long_recordings_are_truncated_for_export() {
        let raw = TimeSeries::new(100.0, vec![0.0; 7000]);
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Box::new(|_: &TimeSeries| Events::default()),
        );
        let out = pipeline.run(&raw).expect("pipeline");
        assert_eq!(out.bundle.plot.len(), 6000);
        assert!(out.bundle.phases.is_empty());
    }

    #[test]
    fn invalid_filter_aborts_before_detection() {
        let config = PipelineConfig {
            filter: FilterConfig {
                numtaps: 100,
                ..FilterConfig::default()
            },
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(
            config,
            Box::new(|_: &TimeSeries| -> Events { panic!("locator must not run") }),
        );
        let err = pipeline.run(&ten_second_recording()).unwrap_err();
        assert!(matches!(err, PqrstError::InvalidFilterConfiguration { .. }));
    }

    #[test]
    fn unsorted_locator_output_is_normalized() {
        let raw = ten_second_recording();
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Box::new(FixedPeaks::new(vec![100, 460, 820])),
        );
        let scrambled = Pipeline::new(
            PipelineConfig::default(),
            Box::new(|_: &TimeSeries| Events::from_indices(vec![820, 100, 460, 100])),
        );
        let expected = pipeline.run(&raw).expect("sorted");
        let actual = scrambled.run(&raw).expect("scrambled");
        assert_eq!(actual.r_peaks, expected.r_peaks);
        assert_eq!(actual.bundle, expected.bundle);
    }

    #[test]
    fn per_cycle_alignment_drops_incomplete_cycles_only() {
        // R at sample 0 has no Q (and so no P); the next two cycles are complete.
        let raw = ten_second_recording();
        let peaks = vec![0, 460, 820];
        let positional = Pipeline::new(
            PipelineConfig::default(),
            Box::new(FixedPeaks::new(peaks.clone())),
        )
        .run(&raw)
        .expect("positional");
        let per_cycle = Pipeline::new(
            PipelineConfig {
                alignment: Alignment::PerCycle,
                ..PipelineConfig::default()
            },
            Box::new(FixedPeaks::new(peaks)),
        )
        .run(&raw)
        .expect("per-cycle");

        assert!(positional.fiducials.is_ragged());
        assert_eq!(per_cycle.bundle.phases.len(), 6);
        let cycle = &per_cycle.fiducials.cycles[1];
        let fs = raw.fs;
        let expected_entry = cycle.p.expect("p") as f64 / fs;
        assert_eq!(per_cycle.bundle.phases[0].entry, expected_entry);
        assert_eq!(per_cycle.bundle.phases[0].phase, Phase::PQ);
    }

    #[test]
    fn config_reads_from_toml_with_defaults() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
            export_seconds = 30.0
            alignment = "per-cycle"

            [windows]
            t_s = 0.35
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.export_seconds, 30.0);
        assert_eq!(cfg.alignment, Alignment::PerCycle);
        assert_eq!(cfg.windows.t_s, 0.35);
        assert_eq!(cfg.windows.q_s, 0.08);
        assert_eq!(cfg.filter, FilterConfig::default());
    }
}
