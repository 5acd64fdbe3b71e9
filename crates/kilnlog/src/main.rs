use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use kilnlog_core::output::{write_rows, OutputFormat};
use kilnlog_core::pipeline::read_schedule;
use kilnlog_core::resample::{resample_schedule, target_rows};
use kilnlog_core::snapshot::latest_snapshot;
use kilnlog_core::{
    nearest_snapshot, CsvFileSource, Dashboard, PipelineConfig, PipelineOutput, Snapshot,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "KILNLOG_CONFIG";

#[derive(Parser, Debug)]
#[command(author, version, about = "Align kiln sensor logs with a target firing schedule", long_about = None)]
struct Cli {
    /// Pipeline configuration (TOML). Falls back to $KILNLOG_CONFIG, then defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge readings with the resampled schedule and write tidy rows
    Align(AlignArgs),
    /// Write the target schedule resampled onto the configured grid
    Resample(ResampleArgs),
    /// Print every measurement at the timestamp nearest to --at
    Snapshot(SnapshotArgs),
    /// Re-render on demand from stdin: enter uses the cache, `r` refreshes, `q` quits
    Watch(InputArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Sensor log CSV export
    #[arg(long)]
    sensors: PathBuf,
    /// Target schedule CSV
    #[arg(long)]
    schedule: PathBuf,
}

#[derive(Args, Debug)]
struct OutputArgs {
    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,
    /// Write here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AlignArgs {
    #[command(flatten)]
    inputs: InputArgs,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct ResampleArgs {
    /// Target schedule CSV
    #[arg(long)]
    schedule: PathBuf,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    #[command(flatten)]
    inputs: InputArgs,
    /// Timestamp to look up, in any accepted sensor timestamp format
    #[arg(long)]
    at: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Csv,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Command::Align(args) => {
            let mut dashboard = open_dashboard(config, &args.inputs)?;
            let rows = dashboard.render(false)?.rows()?;
            write_output(&rows, &args.output)?;
            info!(rows = rows.len(), "tidy rows written");
            Ok(())
        }
        Command::Resample(args) => {
            let schedule = read_schedule(&config, &args.schedule)
                .with_context(|| format!("failed to read schedule {}", args.schedule.display()))?;
            let resampled = resample_schedule(&schedule, config.resample_interval())?;
            let rows = target_rows(&resampled)?;
            write_output(&rows, &args.output)?;
            info!(rows = rows.len(), "resampled schedule written");
            Ok(())
        }
        Command::Snapshot(args) => {
            let mut dashboard = open_dashboard(config, &args.inputs)?;
            match snapshot_at(&mut dashboard, &args.at)? {
                Some(snapshot) => println!("{}", snapshot_table(&snapshot)),
                None => println!("No readings."),
            }
            Ok(())
        }
        Command::Watch(inputs) => {
            let mut dashboard = open_dashboard(config, &inputs)?;
            watch(
                &mut dashboard,
                io::stdin().lock(),
                io::stdout().lock(),
                io::stderr().lock(),
            )
        }
    }
}

/// `--config` wins over `$KILNLOG_CONFIG`; with neither, the defaults apply.
fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig> {
    let path = path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Ok(PipelineConfig::from_path(&path)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn open_dashboard(config: PipelineConfig, inputs: &InputArgs) -> Result<Dashboard<CsvFileSource>> {
    let source = CsvFileSource::new(
        &inputs.sensors,
        config.sensor_layout(),
        config.timestamp_parser()?,
    );
    Dashboard::from_schedule_file(config, &inputs.schedule, source)
        .with_context(|| format!("failed to read schedule {}", inputs.schedule.display()))
}

fn write_output<T: serde::Serialize>(rows: &[T], args: &OutputArgs) -> Result<()> {
    let format = OutputFormat::from(args.format);
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_rows(rows, format, BufWriter::new(file))?;
        }
        None => write_rows(rows, format, io::stdout().lock())?,
    }
    Ok(())
}

fn snapshot_at(dashboard: &mut Dashboard<CsvFileSource>, at: &str) -> Result<Option<Snapshot>> {
    let at = dashboard
        .config()
        .timestamp_parser()?
        .parse(at)
        .map_err(anyhow::Error::msg)
        .context("invalid --at timestamp")?;
    let rows = dashboard.render(false)?.rows()?;
    Ok(nearest_snapshot(&rows, at))
}

fn snapshot_table(snapshot: &Snapshot) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["measurement", "value", "annotation"]);
    for row in &snapshot.readings {
        table.add_row(vec![
            row.measurement.clone(),
            row.value.map(|v| format!("{v:.2}")).unwrap_or_default(),
            row.annotation.clone().unwrap_or_default(),
        ]);
    }
    table
}

/// Renders once, then once per input line: blank reuses the cache, `r` refetches, `q` stops.
fn watch(
    dashboard: &mut Dashboard<CsvFileSource>,
    input: impl BufRead,
    mut out: impl Write,
    mut errors: impl Write,
) -> Result<()> {
    let label = sensors_label(dashboard.cache().source().path());
    report(&label, dashboard.render(false), &mut out, &mut errors)?;

    for line in input.lines() {
        let line = line?;
        let rendered = match line.trim() {
            "" => dashboard.render(false),
            "r" => dashboard.render(true),
            "q" => break,
            other => {
                writeln!(errors, "unknown command '{other}' (enter re-renders, r refreshes, q quits)")?;
                continue;
            }
        };
        report(&label, rendered, &mut out, &mut errors)?;
        out.flush()?;
    }
    Ok(())
}

fn sensors_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Writes one summary line; a failed render goes to `errors` and is not fatal.
fn report(
    label: &str,
    rendered: kilnlog_core::Result<PipelineOutput>,
    out: &mut impl Write,
    errors: &mut impl Write,
) -> io::Result<()> {
    let rows = match rendered.and_then(|output| output.rows()) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "render failed");
            return writeln!(errors, "{label}: {err}");
        }
    };

    match latest_snapshot(&rows) {
        Some(snapshot) => {
            let readings: Vec<String> = snapshot
                .readings
                .iter()
                .map(|row| match row.value {
                    Some(v) => format!("{}={v:.2}", row.measurement),
                    None => format!("{}=-", row.measurement),
                })
                .collect();
            writeln!(
                out,
                "{label}: {} rows, latest {} {}",
                rows.len(),
                snapshot.timestamp,
                readings.join(" ")
            )
        }
        None => writeln!(out, "{label}: no rows"),
    }
}
