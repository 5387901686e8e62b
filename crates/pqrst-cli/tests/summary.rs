use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;
use std::fs;
use tempfile::tempdir;

#[test]
fn summary_reports_rate_and_means() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let phases = dir.path().join("ecg_phases1.json");
    fs::write(
        &phases,
        r#"[
  {"entry": 0.0, "duration": 0.125, "phase": "PQ"},
  {"entry": 0.125, "duration": 0.0625, "phase": "QRS"},
  {"entry": 0.1875, "duration": 0.25, "phase": "ST"},
  {"entry": 0.75, "duration": 0.125, "phase": "PQ"},
  {"entry": 0.875, "duration": 0.0625, "phase": "QRS"},
  {"entry": 0.9375, "duration": 0.25, "phase": "ST"}
]"#,
    )?;
    let mut cmd = cargo_bin_cmd!("pqrst");
    cmd.arg("summary").arg(&phases);
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&out)?;
    assert_eq!(value["records"], 6);
    assert_eq!(value["qrs_count"], 2);
    assert_eq!(value["bpm"], 80.0);
    assert_eq!(value["mean_qrs"], 0.0625);
    assert_eq!(value["negative_durations"], 0);
    Ok(())
}

#[test]
fn summary_rejects_non_phase_json() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let plot = dir.path().join("ecg_plot1.json");
    fs::write(&plot, "[0.1,0.2,0.3]")?;
    let mut cmd = cargo_bin_cmd!("pqrst");
    cmd.arg("summary").arg(&plot);
    let stderr = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8(stderr)?.contains("is not a phases export"));
    Ok(())
}

#[test]
fn simulate_is_seeded() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    for out in [&a, &b] {
        let mut cmd = cargo_bin_cmd!("pqrst");
        cmd.args(["simulate", "--seconds", "2", "--fs", "250", "--seed", "11", "--out"])
            .arg(out);
        cmd.assert().success();
    }
    let samples = fs::read_to_string(&a)?;
    assert_eq!(samples, fs::read_to_string(&b)?);
    assert_eq!(samples.lines().count(), 500);
    Ok(())
}
