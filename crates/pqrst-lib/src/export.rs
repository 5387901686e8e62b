use crate::error::{PqrstError, Result};
use crate::intervals::IntervalRecord;
use crate::signal::TimeSeries;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The two artifacts handed to the animation front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    /// Leading stretch of the filtered signal.
    pub plot: Vec<f64>,
    pub phases: Vec<IntervalRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub plot: PathBuf,
    pub phases: PathBuf,
}

/// Keeps the first `export_seconds * fs` filtered samples (or all of them
/// when the signal is shorter). Values are copied unchanged.
pub fn assemble(
    filtered: &TimeSeries,
    phases: Vec<IntervalRecord>,
    export_seconds: f64,
) -> ExportBundle {
    let keep = filtered.samples_in(export_seconds).min(filtered.len());
    ExportBundle {
        plot: filtered.data[..keep].to_vec(),
        phases,
    }
}

impl ExportBundle {
    pub fn plot_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.plot)?)
    }

    /// Pretty-printed with two-space indentation.
    pub fn phases_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.phases)?)
    }

    pub fn paths_for(dir: &Path, record: &str) -> ExportPaths {
        ExportPaths {
            plot: dir.join(format!("ecg_plot{record}.json")),
            phases: dir.join(format!("ecg_phases{record}.json")),
        }
    }

    /// Writes `ecg_plot{record}.json` and `ecg_phases{record}.json` into `dir`.
    ///
    /// Both payloads are serialized and staged in temporary files first; the
    /// final names only appear once both stages are on disk. If the phases
    /// file cannot take its final name, the plot file is removed again.
    pub fn write(&self, dir: &Path, record: &str) -> Result<ExportPaths> {
        let paths = Self::paths_for(dir, record);
        let plot = self.plot_json()?;
        let phases = self.phases_json()?;

        let staged_plot = stage(dir, &paths.plot, plot.as_bytes())?;
        let staged_phases = stage(dir, &paths.phases, phases.as_bytes())?;
        persist(staged_plot, &paths.plot)?;
        if let Err(err) = persist(staged_phases, &paths.phases) {
            if let Err(cleanup) = std::fs::remove_file(&paths.plot) {
                log::warn!("could not remove {}: {cleanup}", paths.plot.display());
            }
            return Err(err);
        }
        log::info!(
            "wrote {} plot samples and {} phase records",
            self.plot.len(),
            self.phases.len()
        );
        Ok(paths)
    }
}

fn stage(dir: &Path, target: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let export_err = |source| PqrstError::Export {
        path: target.to_path_buf(),
        source,
    };
    let mut file = NamedTempFile::new_in(dir).map_err(export_err)?;
    file.write_all(bytes).map_err(export_err)?;
    file.flush().map_err(export_err)?;
    Ok(file)
}

fn persist(file: NamedTempFile, target: &Path) -> Result<()> {
    file.persist(target)
        .map(|_| ())
        .map_err(|err| PqrstError::Export {
            path: target.to_path_buf(),
            source: err.error,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervals::Phase;

    fn records() -> Vec<IntervalRecord> {
        vec![
            IntervalRecord {
                entry: 0.25,
                duration: 0.125,
                phase: Phase::PQ,
            },
            IntervalRecord {
                entry: 0.375,
                duration: 0.0625,
                phase: Phase::QRS,
            },
        ]
    }

    #[test]
    fn truncates_to_export_window() {
        let ts = TimeSeries::new(10.0, (0..1000).map(|i| i as f64).collect());
        let bundle = assemble(&ts, Vec::new(), 60.0);
        assert_eq!(bundle.plot.len(), 600);
        assert_eq!(bundle.plot[599], 599.0);
    }

    #[test]
    fn short_signal_is_exported_whole() {
        let ts = TimeSeries::new(360.0, vec![0.5; 1000]);
        let bundle = assemble(&ts, records(), 60.0);
        assert_eq!(bundle.plot, ts.data);
        assert_eq!(bundle.phases.len(), 2);
    }

    #[test]
    fn phases_json_uses_two_space_indent() {
        let bundle = ExportBundle {
            plot: vec![1.0, -0.5],
            phases: records()[..1].to_vec(),
        };
        assert_eq!(bundle.plot_json().expect("plot"), "[1.0,-0.5]");
        let expected = "[\n  {\n    \"entry\": 0.25,\n    \"duration\": 0.125,\n    \"phase\": \"PQ\"\n  }\n]";
        assert_eq!(bundle.phases_json().expect("phases"), expected);
    }

    #[test]
    fn write_creates_both_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = ExportBundle {
            plot: vec![0.0, 0.1],
            phases: records(),
        };
        let paths = bundle.write(dir.path(), "105").expect("write");
        assert!(paths.plot.ends_with("ecg_plot105.json"));
        assert!(paths.phases.ends_with("ecg_phases105.json"));
        let phases: Vec<IntervalRecord> =
            serde_json::from_str(&std::fs::read_to_string(&paths.phases).expect("read"))
                .expect("parse");
        assert_eq!(phases, records());
        let leftovers = std::fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(leftovers, 2);
    }

    #[test]
    fn write_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let bundle = ExportBundle {
            plot: vec![0.0],
            phases: Vec::new(),
        };
        let err = bundle.write(&missing, "1").unwrap_err();
        assert!(matches!(err, PqrstError::Export { .. }));
        assert!(!missing.exists());
    }

    #[test]
    fn failed_phases_write_removes_plot() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory squatting on the phases name makes the final rename fail.
        std::fs::create_dir(dir.path().join("ecg_phases9.json")).expect("mkdir");
        let bundle = ExportBundle {
            plot: vec![0.0, 0.1],
            phases: records(),
        };
        let err = bundle.write(dir.path(), "9").unwrap_err();
        match err {
            PqrstError::Export { path, .. } => assert!(path.ends_with("ecg_phases9.json")),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!dir.path().join("ecg_plot9.json").exists());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .expect("list")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("ecg_phases9.json")]);
    }
}
