//! Offline analyser: replay a capture file through the anomaly policies.
//!
//! Expects the capture's observations to be in the store already (see
//! `canopy-capture import`). Emits one JSON object per finding to the
//! anomalies (short window) and critical (long window + air temperature)
//! report files.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use base64::prelude::*;
use canopy_gateway::historical::{CaptureRecord, OfflineAnalysis, ReportRecord};
use canopy_gateway::policy::DataReading;
use canopy_gateway::store::PgStore;
use canopy_gateway::init_logging;
use canopy_types::Packet;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "canopy-historical", about = "Scan recorded traffic for anomalies and critical events")]
struct Args {
    /// Capture file (JSONL of capture records)
    capture: PathBuf,
    /// Time-series store URL
    #[arg(short, long, env = "CANOPY_STORE", default_value = "postgres://canopy@127.0.0.1/canopy")]
    store: String,
    /// Anomaly report output
    #[arg(long, default_value = "anomalies.jsonl")]
    anomalies: PathBuf,
    /// Critical-event report output
    #[arg(long, default_value = "critical.jsonl")]
    critical: PathBuf,
    /// Append to existing reports instead of truncating them
    #[arg(long)]
    append: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn open_report(path: &PathBuf, append: bool) -> anyhow::Result<BufWriter<std::fs::File>> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufWriter::new(file))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!("🌲 canopy historical analyser v{} starting", env!("CARGO_PKG_VERSION"));

    let store = PgStore::connect(&args.store).await.context("store unreachable")?;

    info!("reading capture {}", args.capture.display());
    let text = std::fs::read_to_string(&args.capture)
        .with_context(|| format!("cannot read {}", args.capture.display()))?;
    let mut records: Vec<CaptureRecord> = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("skipping capture line {}: {e}", n + 1),
        }
    }
    records.sort_by_key(|r| r.time);
    info!("{} capture records", records.len());

    let Some(first) = records.first() else {
        info!("empty capture, nothing to do");
        return Ok(());
    };

    let mut anomalies_out = open_report(&args.anomalies, args.append)?;
    let mut critical_out = open_report(&args.critical, args.append)?;

    let mut analysis = OfflineAnalysis::new(&store, first.time).await;
    let mut found_anomalies = 0usize;
    let mut found_critical = 0usize;

    for (n, record) in records.iter().enumerate() {
        let Some((raw, packet)) = record.decode() else {
            continue;
        };
        let reading = match &packet {
            Packet::DataRev31(p) => DataReading::from(p),
            Packet::DataRev32(p) => DataReading::from(p),
            _ => continue,
        };

        let outcome = analysis.scan(record.time, &reading).await;
        if !outcome.anomalies.is_empty() {
            found_anomalies += 1;
            let report = ReportRecord {
                timestamp: record.time,
                talker: reading.talker,
                events: outcome.anomalies.iter().map(|k| k.as_str().to_string()).collect(),
                packet: BASE64_STANDARD.encode(&raw),
            };
            writeln!(anomalies_out, "{}", serde_json::to_string(&report)?)?;
        }
        if !outcome.critical.is_empty() {
            found_critical += 1;
            let report = ReportRecord {
                timestamp: record.time,
                talker: reading.talker,
                events: outcome.critical.iter().map(|k| k.as_str().to_string()).collect(),
                packet: BASE64_STANDARD.encode(&raw),
            };
            writeln!(critical_out, "{}", serde_json::to_string(&report)?)?;
        }

        if (n + 1) % 1000 == 0 {
            info!("{}/{} packets scanned", n + 1, records.len());
        }
    }

    anomalies_out.flush()?;
    critical_out.flush()?;
    info!("done: {found_anomalies} anomalies, {found_critical} critical events");
    Ok(())
}
