use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use plotters::prelude::*;
use pqrst_lib::{
    filter::FilterConfig,
    intervals::{Alignment, IntervalRecord},
    io::{text as text_io, wfdb as wfdb_io},
    locator::{DetectorConfig, FixedPeaks, PanTompkinsLocator, RPeakLocator},
    pipeline::{Pipeline, PipelineConfig, PipelineOutput},
    plot::{figure_from_export, Figure, PlotBackend, Series},
    record::{RecordId, RecordLoader, TextDataset, WfdbDataset},
    signal::{Events, TimeSeries},
    summary::summarize,
    synth::{synthesize, SynthConfig},
};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "pqrst",
    version,
    about = "Extract P/Q/R/S/T fiducials and PQ/QRS/ST phases from single-lead ECG records"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RecordFormat {
    /// `<id>.hea` + signal files
    Wfdb,
    /// `<id>.txt`, one sample per line
    Text,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Record identifier, e.g. `105`
    record: String,
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = RecordFormat::Wfdb)]
    format: RecordFormat,
    /// Sample rate for text records (Hz)
    #[arg(long, default_value_t = 360.0)]
    fs: f64,
    #[arg(long, default_value_t = 0)]
    lead: usize,
    /// TOML file with `[pipeline]` and `[detector]` tables
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reference beats (`.atr` or one index per line) used instead of the detector
    #[arg(long)]
    annotations: Option<PathBuf>,
    /// Pair P/Q/S/T per R-peak instead of by position
    #[arg(long)]
    per_cycle: bool,
    #[arg(long)]
    export_seconds: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write ecg_plot<ID>.json and ecg_phases<ID>.json for one record
    ///
    /// `pqrst extract <RECORD>` is the single-record entry point: the record
    /// identifier is the one positional argument and every other input has a
    /// default, so `pqrst extract 105` reads `./105.hea` and writes into `.`.
    Extract {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Summarize a phases export (beat count, heart rate, mean durations)
    Summary { input: PathBuf },
    /// Write a synthetic PQRST recording as newline-delimited samples
    Simulate {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 360.0)]
        fs: f64,
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
        #[arg(long, default_value_t = 72.0)]
        bpm: f64,
        #[arg(long, default_value_t = 0.015)]
        noise: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
    /// Render the exported waveform with fiducial markers to a PNG
    Render {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 4096)]
        max_points: usize,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    pipeline: PipelineConfig,
    detector: DetectorConfig,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Extract { source, out_dir } => cmd_extract(&source, &out_dir)?,
        Commands::Summary { input } => cmd_summary(&input)?,
        Commands::Simulate {
            out,
            fs,
            seconds,
            bpm,
            noise,
            seed,
        } => cmd_simulate(
            &out,
            SynthConfig {
                fs,
                seconds,
                bpm,
                noise,
                seed,
                ..SynthConfig::default()
            },
        )?,
        Commands::Render {
            source,
            out,
            max_points,
        } => cmd_render(&source, &out, max_points)?,
    }
    Ok(())
}

fn load_config(source: &SourceArgs) -> Result<ConfigFile> {
    let mut cfg = match &source.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => ConfigFile::default(),
    };
    if source.per_cycle {
        cfg.pipeline.alignment = Alignment::PerCycle;
    }
    if let Some(seconds) = source.export_seconds {
        cfg.pipeline.export_seconds = seconds;
    }
    Ok(cfg)
}

fn load_record(source: &SourceArgs, id: &RecordId) -> Result<TimeSeries> {
    let loader: Box<dyn RecordLoader> = match source.format {
        RecordFormat::Wfdb => Box::new(WfdbDataset::new(&source.data_dir, source.lead)),
        RecordFormat::Text => Box::new(TextDataset::new(&source.data_dir, source.fs)),
    };
    Ok(loader.load(id)?)
}

/// Reference annotations index the raw signal; the pipeline works on the
/// filtered one, which lags by the FIR group delay.
fn load_reference_beats(path: &Path, filter: &FilterConfig) -> Result<Events> {
    let raw = match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("atr") => wfdb_io::load_wfdb_events(path)?,
        _ => Events::from_indices(text_io::read_indices(path)?),
    };
    let delay = filter.numtaps.saturating_sub(1) / 2;
    Ok(Events::from_indices(
        raw.indices
            .into_iter()
            .map(|i| i.saturating_add(delay))
            .collect(),
    ))
}

fn run_source(source: &SourceArgs) -> Result<(RecordId, PipelineOutput)> {
    let id: RecordId = source.record.parse()?;
    let cfg = load_config(source)?;
    let raw = load_record(source, &id).with_context(|| format!("loading record {id}"))?;

    let locator: Box<dyn RPeakLocator> = match &source.annotations {
        Some(path) => Box::new(FixedPeaks::from(
            load_reference_beats(path, &cfg.pipeline.filter)
                .with_context(|| format!("reading annotations {}", path.display()))?,
        )),
        None => Box::new(PanTompkinsLocator::new(cfg.detector)),
    };
    let pipeline = Pipeline::new(cfg.pipeline, locator);
    let output = pipeline
        .run(&raw)
        .with_context(|| format!("processing record {id}"))?;
    log::info!(
        "record {id}: {} R-peaks, {} of {} cycles built",
        output.r_peaks.len(),
        output.build.built_cycles(),
        output.build.attempted
    );
    Ok((id, output))
}

fn cmd_extract(source: &SourceArgs, out_dir: &Path) -> Result<()> {
    let (id, output) = run_source(source)?;
    let paths = output
        .bundle
        .write(out_dir, &id.to_string())
        .with_context(|| format!("writing exports to {}", out_dir.display()))?;
    println!(
        "Generated:\n - {}\n - {}",
        paths.plot.display(),
        paths.phases.display()
    );
    Ok(())
}

fn cmd_summary(input: &Path) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let records: Vec<IntervalRecord> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a phases export", input.display()))?;
    println!("{}", serde_json::to_string(&summarize(&records))?);
    Ok(())
}

fn cmd_simulate(out: &Path, cfg: SynthConfig) -> Result<()> {
    let synthetic = synthesize(&cfg);
    fs::write(out, text_io::format_samples(&synthetic.signal.data))
        .with_context(|| format!("failed to write {}", out.display()))?;
    let events = Events::from_indices(synthetic.r_peaks);
    println!("{}", serde_json::to_string(&events)?);
    Ok(())
}

fn cmd_render(source: &SourceArgs, out: &Path, max_points: usize) -> Result<()> {
    let (id, output) = run_source(source)?;
    let fig = figure_from_export(
        &format!("record {id}"),
        &output.bundle.plot,
        output.filtered.fs,
        &output.fiducials,
        max_points,
    );
    PngFigure::new(out).draw(&fig)?;
    println!("{}", out.display());
    Ok(())
}

struct PngFigure<'a> {
    path: &'a Path,
    size: (u32, u32),
}

impl<'a> PngFigure<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            size: (1600, 480),
        }
    }
}

impl PlotBackend for PngFigure<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let root = BitMapBackend::new(self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let (x_min, x_max, y_min, y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
        let y_pad = ((y_max - y_min) * 0.05).max(1e-6);
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                fig.title.clone().unwrap_or_else(|| "ECG".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(
                x_min..x_max.max(x_min + 1e-6),
                (y_min - y_pad)..(y_max + y_pad),
            )?;
        chart
            .configure_mesh()
            .x_desc(fig.x.label.clone().unwrap_or_default())
            .y_desc(fig.y.label.clone().unwrap_or_default())
            .draw()?;
        for series in &fig.series {
            match series {
                Series::Line(line) => {
                    let (r, g, b) = line.style.color.rgb();
                    chart.draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        RGBColor(r, g, b).stroke_width(line.style.width.round().max(1.0) as u32),
                    ))?;
                }
                Series::Markers(markers) => {
                    let (r, g, b) = markers.style.color.rgb();
                    let color = RGBColor(r, g, b);
                    let radius = markers.style.width.round().max(1.0) as i32;
                    chart.draw_series(
                        markers
                            .points
                            .iter()
                            .map(|p| Circle::new((p[0], p[1]), radius, color.filled())),
                    )?;
                }
            }
        }
        root.present()?;
        Ok(())
    }
}
