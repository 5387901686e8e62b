use anyhow::{Context, Result};
use std::path::Path;

/// Parse newline-delimited floating point samples, ignoring blank/comment lines.
pub fn parse_samples(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

pub fn read_samples(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_samples(&text)
}

/// One sample per line, shortest round-trip formatting.
pub fn format_samples(samples: &[f64]) -> String {
    let mut out = String::with_capacity(samples.len() * 12);
    for v in samples {
        out.push_str(&v.to_string());
        out.push('\n');
    }
    out
}

/// Parse newline-delimited sample indices, e.g. a hand-made R-peak list.
pub fn parse_indices(text: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: usize = trimmed
            .parse()
            .with_context(|| format!("line {} is not an integer index: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no annotation indices found");
    }
    Ok(out)
}

pub fn read_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_indices(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "# record 7\n0.5\n\n-1.25\n  2 \n";
        assert_eq!(parse_samples(text).expect("parse"), vec![0.5, -1.25, 2.0]);
    }

    #[test]
    fn reports_offending_line() {
        let err = parse_samples("1.0\nabc\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_samples("# nothing\n").is_err());
        assert!(parse_indices("").is_err());
    }

    #[test]
    fn formatted_samples_parse_back() {
        let samples = vec![0.1, -3.5, 1e-7];
        assert_eq!(parse_samples(&format_samples(&samples)).expect("parse"), samples);
    }

    #[test]
    fn parses_indices() {
        assert_eq!(parse_indices("100\n460\n820\n").expect("parse"), vec![100, 460, 820]);
    }
}
