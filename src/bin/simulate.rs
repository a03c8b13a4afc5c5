//! CityPulse Dataset Simulation
//!
//! Generates a labelled sensor dataset for the configured nodes: one reading
//! per node per interval over the requested number of days, each tagged with
//! its Urban Stress Index, the rule-table verdict and the injected anomaly
//! kind (if any). Intended for training and evaluating external detectors.
//!
//! # Usage
//! ```bash
//! ./simulate --days 30 --interval 5 --seed 42 --format csv > mohali_sensor_data.csv
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use citypulse::config::{defaults, CityConfig};
use citypulse::processing::{calculate_stress_index, classify};
use citypulse::simulator::{InjectedAnomaly, SensorSimulator};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "citypulse-simulate")]
#[command(about = "Labelled sensor dataset generator for CityPulse")]
#[command(version = "1.0")]
struct Args {
    /// Days of history to generate (1-365)
    #[arg(short, long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=365))]
    days: u32,

    /// Minutes between readings (1-1440)
    #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=1440))]
    interval: u32,

    /// Fraction of readings with an injected anomaly
    #[arg(long, default_value_t = defaults::SIMULATOR_ANOMALY_RATE)]
    anomaly_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or csv
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file providing the node registry and UTC offset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Suppress the generation log (only output data)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Output Record
// ============================================================================

#[derive(Debug, Serialize)]
struct DatasetRow<'a> {
    timestamp: DateTime<Utc>,
    node_id: &'a str,
    node_name: &'a str,
    sector: &'a str,
    zone: String,
    noise: f64,
    temperature: f64,
    air_quality: i32,
    crowd_density: i32,
    stress_index: u8,
    is_anomaly: bool,
    injected: Option<InjectedAnomaly>,
}

const CSV_HEADER: &str = "timestamp,node_id,node_name,sector,zone,noise,temperature,air_quality,crowd_density,stress_index,is_anomaly,injected";

fn injected_label(kind: Option<InjectedAnomaly>) -> &'static str {
    match kind {
        None => "",
        Some(InjectedAnomaly::NoiseSpike) => "noise_spike",
        Some(InjectedAnomaly::HeatWave) => "heat_wave",
        Some(InjectedAnomaly::PollutionEvent) => "pollution_event",
        Some(InjectedAnomaly::CrowdSurge) => "crowd_surge",
    }
}

fn write_row(out: &mut impl Write, row: &DatasetRow<'_>, format: &str) -> Result<()> {
    match format {
        "csv" => writeln!(
            out,
            "{},{},\"{}\",\"{}\",{},{:.1},{:.1},{},{},{},{},{}",
            row.timestamp.to_rfc3339(),
            row.node_id,
            row.node_name,
            row.sector,
            row.zone,
            row.noise,
            row.temperature,
            row.air_quality,
            row.crowd_density,
            row.stress_index,
            u8::from(row.is_anomaly),
            injected_label(row.injected),
        )?,
        _ => writeln!(out, "{}", serde_json::to_string(row)?)?,
    }
    Ok(())
}

fn log_mission(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[simulate] {}", message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    if !(0.0..=1.0).contains(&args.anomaly_rate) {
        anyhow::bail!("--anomaly-rate must be within 0-1, got {}", args.anomaly_rate);
    }
    if args.format != "csv" && args.format != "json" {
        anyhow::bail!("--format must be csv or json, got {}", args.format);
    }

    let config = match &args.config {
        Some(path) => CityConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CityConfig::default(),
    };

    let mut simulator = SensorSimulator::with_optional_seed(args.seed, args.anomaly_rate, config.city.utc_offset());

    let end = Utc::now();
    let start = end - Duration::days(i64::from(args.days));
    let steps = i64::from(args.days) * 24 * 60 / i64::from(args.interval);

    log_mission(&"=".repeat(60), args.quiet);
    log_mission(&format!("CityPulse dataset: {}", config.city.name), args.quiet);
    log_mission(&format!("  Nodes: {}", config.nodes.len()), args.quiet);
    log_mission(&format!("  Span: {} days at {}-minute intervals ({} steps)", args.days, args.interval, steps), args.quiet);
    log_mission(&format!("  Anomaly rate: {:.1}%", args.anomaly_rate * 100.0), args.quiet);
    if let Some(seed) = args.seed {
        log_mission(&format!("  Random seed: {}", seed), args.quiet);
    }
    log_mission(&"=".repeat(60), args.quiet);

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(sink);

    if args.format == "csv" {
        writeln!(out, "{CSV_HEADER}")?;
    }

    let mut rows = 0u64;
    let mut injected = 0u64;
    let mut flagged = 0u64;

    for step in 0..steps {
        let timestamp = start + Duration::minutes(step * i64::from(args.interval));
        for node in &config.nodes {
            let sample = simulator.sample(node, timestamp);
            let reading = sample.reading;
            let stress_index = calculate_stress_index(&reading)?;
            let is_anomaly = classify(&reading, stress_index).is_anomaly;

            rows += 1;
            injected += u64::from(sample.injected.is_some());
            flagged += u64::from(is_anomaly);

            let row = DatasetRow {
                timestamp,
                node_id: &node.id,
                node_name: &node.name,
                sector: &node.sector,
                zone: node.zone.to_string(),
                noise: reading.noise,
                temperature: reading.temperature,
                air_quality: reading.air_quality,
                crowd_density: reading.crowd_density,
                stress_index,
                is_anomaly,
                injected: sample.injected,
            };
            write_row(&mut out, &row, &args.format)?;
        }
    }
    out.flush()?;

    log_mission(&format!("Rows written: {}", rows), args.quiet);
    log_mission(&format!("Injected anomalies: {}", injected), args.quiet);
    log_mission(&format!("Rule-flagged anomalies: {}", flagged), args.quiet);
    if let Some(path) = &args.output {
        log_mission(&format!("Output: {}", path.display()), args.quiet);
    }

    Ok(())
}
