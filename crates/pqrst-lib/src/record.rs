//! Record loaders: resolve a record identifier to a single-lead time series.

use crate::error::{PqrstError, Result};
use crate::io::{text, wfdb};
use crate::signal::TimeSeries;
use std::convert::Infallible;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Record key: MIT-BIH style numbers (`105`) or free-form names (`sub-01`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Number(u32),
    Name(String),
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        // Zero-padded keys stay names so the file name round-trips.
        Ok(match s.parse::<u32>() {
            Ok(n) if n.to_string() == s => RecordId::Number(n),
            _ => RecordId::Name(s.to_string()),
        })
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Name(name) => f.write_str(name),
        }
    }
}

pub trait RecordLoader {
    fn load(&self, id: &RecordId) -> Result<TimeSeries>;
}

/// A directory of WFDB records (`<id>.hea` plus its signal files).
#[derive(Debug, Clone)]
pub struct WfdbDataset {
    pub root: PathBuf,
    pub lead: usize,
}

impl WfdbDataset {
    pub fn new(root: impl Into<PathBuf>, lead: usize) -> Self {
        Self {
            root: root.into(),
            lead,
        }
    }

    pub fn header_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(format!("{id}.hea"))
    }
}

impl RecordLoader for WfdbDataset {
    fn load(&self, id: &RecordId) -> Result<TimeSeries> {
        let header = self.header_path(id);
        require_file(id, &header)?;
        let unreadable = |reason: String| PqrstError::RecordUnreadable {
            id: id.to_string(),
            reason,
        };
        // The WFDB decoder panics on malformed input instead of returning errors.
        let decoded = panic::catch_unwind(AssertUnwindSafe(|| {
            wfdb::load_wfdb_lead(&header, self.lead)
        }))
        .map_err(|_| unreadable("WFDB decoder rejected the record".into()))?;
        let ts = decoded.map_err(|err| unreadable(format!("{err:#}")))?;
        check_series(id, ts)
    }
}

/// A directory of newline-delimited sample files (`<id>.txt`) sharing one
/// sample rate.
#[derive(Debug, Clone)]
pub struct TextDataset {
    pub root: PathBuf,
    pub fs: f64,
}

impl TextDataset {
    pub fn new(root: impl Into<PathBuf>, fs: f64) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn sample_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(format!("{id}.txt"))
    }
}

impl RecordLoader for TextDataset {
    fn load(&self, id: &RecordId) -> Result<TimeSeries> {
        let path = self.sample_path(id);
        require_file(id, &path)?;
        let data = text::read_samples(&path).map_err(|err| PqrstError::RecordUnreadable {
            id: id.to_string(),
            reason: format!("{err:#}"),
        })?;
        check_series(id, TimeSeries { fs: self.fs, data })
    }
}

fn require_file(id: &RecordId, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PqrstError::RecordNotFound {
            id: id.to_string(),
            path: path.to_path_buf(),
        })
    }
}

fn check_series(id: &RecordId, ts: TimeSeries) -> Result<TimeSeries> {
    let reason = if !(ts.fs.is_finite() && ts.fs > 0.0) {
        format!("sample rate {} is not positive", ts.fs)
    } else if ts.is_empty() {
        "record holds no samples".to_string()
    } else if let Some(idx) = ts.data.iter().position(|v| !v.is_finite()) {
        format!("sample {idx} is not finite ({})", ts.data[idx])
    } else {
        log::debug!(
            "loaded record {id}: {} samples ({:.1} s) at {} Hz",
            ts.len(),
            ts.duration(),
            ts.fs
        );
        return Ok(ts);
    };
    Err(PqrstError::RecordUnreadable {
        id: id.to_string(),
        reason,
    })
}
