use crate::signal::{Events, TimeSeries};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Simple WFDB annotation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WfdbAnnotation {
    pub sample: usize,
    pub code: u8,
}

impl WfdbAnnotation {
    /// Beat labels occupy codes 1..=58 in the MIT annotation table.
    pub fn is_beat(&self) -> bool {
        self.code > 0 && self.code < 59
    }
}

/// Decode one lead of a WFDB header/data pair into physical units.
pub fn load_wfdb_lead(header_path: &Path, lead: usize) -> Result<TimeSeries> {
    let (header, signals) = wfdb_rust::parse_wfdb(header_path);
    if lead >= signals.len() || lead >= header.signal_specs.len() {
        anyhow::bail!(
            "WFDB record contains {} signals, but lead {} was requested",
            signals.len(),
            lead
        );
    }
    let spec = &header.signal_specs[lead];
    let gain = spec.adc_gain.unwrap_or(1.0) as f64;
    let baseline = spec.baseline.or(spec.adc_zero).unwrap_or(0) as f64;
    let fs = header
        .record
        .sampling_frequency
        .map(|f| f as f64)
        .context("WFDB header has no sampling frequency")?;
    let data = signals[lead]
        .iter()
        .map(|&sample| (sample as f64 - baseline) / gain)
        .collect();
    Ok(TimeSeries { fs, data })
}

/// Parse MIT annotation binary stream into samples & codes.
pub fn parse_wfdb_annotations(buf: &[u8]) -> Vec<WfdbAnnotation> {
    let mut out = Vec::new();
    let mut idx = 0;
    let mut sample: usize = 0;
    while idx + 2 <= buf.len() {
        let word = u16::from_le_bytes([buf[idx], buf[idx + 1]]);
        idx += 2;
        let code = (word >> 10) as u8;
        let diff = (word & 0x03FF) as usize;
        if code == 0 && diff == 0 {
            break;
        }
        match code {
            // SKIP: 32-bit interval follows, high word first
            59 => {
                if idx + 4 > buf.len() {
                    break;
                }
                let high = u16::from_le_bytes([buf[idx], buf[idx + 1]]) as u32;
                let low = u16::from_le_bytes([buf[idx + 2], buf[idx + 3]]) as u32;
                idx += 4;
                sample = sample.wrapping_add(((high << 16) | low) as usize);
            }
            // NUM/SUB/CHN carry no beat
            60..=62 => {}
            // AUX: `diff` bytes of payload, padded to even length
            63 => {
                idx += diff + (diff % 2);
            }
            _ => {
                sample = sample.wrapping_add(diff);
                out.push(WfdbAnnotation { sample, code });
            }
        }
    }
    out
}

/// Read WFDB annotation file (ATR) and keep the beat annotations.
pub fn load_wfdb_events(path: &Path) -> Result<Events> {
    let buf = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let beats = parse_wfdb_annotations(&buf)
        .into_iter()
        .filter(WfdbAnnotation::is_beat)
        .map(|ann| ann.sample)
        .collect();
    Ok(Events::from_indices(beats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(code: u16, diff: u16) -> [u8; 2] {
        ((code << 10) | diff).to_le_bytes()
    }

    #[test]
    fn parses_simple_annotation_stream() {
        let mut bytes = vec![];
        bytes.extend(word(1, 5));
        bytes.extend(word(2, 10));
        // SKIP 5000 samples
        bytes.extend(word(59, 0));
        bytes.extend(0x0000u16.to_le_bytes());
        bytes.extend(0x1388u16.to_le_bytes());
        bytes.extend(word(1, 3));
        bytes.extend(0u16.to_le_bytes());

        let annotations = parse_wfdb_annotations(&bytes);
        let samples: Vec<usize> = annotations.iter().map(|a| a.sample).collect();
        assert_eq!(samples, vec![5, 15, 5018]);
    }

    #[test]
    fn aux_payload_is_skipped() {
        let mut bytes = vec![];
        bytes.extend(word(1, 100));
        // AUX with 3 bytes of text, padded to 4
        bytes.extend(word(63, 3));
        bytes.extend(b"(N\0\0");
        bytes.extend(word(5, 0));
        bytes.extend(word(1, 260));
        bytes.extend(0u16.to_le_bytes());

        let annotations = parse_wfdb_annotations(&bytes);
        assert_eq!(annotations.len(), 3);
        let beats: Vec<usize> = annotations
            .iter()
            .filter(|a| a.is_beat())
            .map(|a| a.sample)
            .collect();
        assert_eq!(beats, vec![100, 100, 360]);
    }

    #[test]
    fn missing_annotation_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_wfdb_events(&dir.path().join("100.atr")).is_err());
    }
}
