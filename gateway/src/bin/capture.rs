//! Capture tooling: pull a legacy gateway's CSV export into a capture file,
//! replay a capture's observations into the store, or just count records.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use base64::prelude::*;
use canopy_gateway::historical::CaptureRecord;
use canopy_gateway::store::{ObservationStore, PgStore};
use canopy_gateway::init_logging;
use canopy_types::{Address, DataRev32, Light, Packet};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "canopy-capture", about = "Download, import and count packet captures")]
struct Args {
    #[command(subcommand)]
    command: Command,
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch `ttcloud.txt` exports over HTTP and write a capture file
    Download {
        /// Host serving the exports
        #[arg(short, long)]
        address: String,
        /// Gateway IDs (hex), one export per gateway
        #[arg(short, long, num_args = 1..)]
        clouds: Vec<String>,
        /// Capture file to write
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Replay a capture file's observation rows into the store
    Import {
        /// Capture file to read
        #[arg(short, long)]
        file: PathBuf,
        /// Time-series store URL
        #[arg(short, long, env = "CANOPY_STORE", default_value = "postgres://canopy@127.0.0.1/canopy")]
        store: String,
    },
    /// Count records in a capture file
    Count {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Download { address, clouds, file } => download(&address, &clouds, &file).await,
        Command::Import { file, store } => import(&file, &store).await,
        Command::Count { file } => count(&file),
    }
}

// ── download ──────────────────────────────────────────────────────────────────

async fn download(address: &str, clouds: &[String], file: &PathBuf) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let mut records: Vec<CaptureRecord> = Vec::new();

    for cloud in clouds {
        let gateway = Address::from_str(cloud)
            .with_context(|| format!("{cloud} is not a gateway address"))?;
        let url = format!("http://{address}/{cloud}/ttcloud.txt");
        info!("downloading {url}");
        let text = client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("download of {url} failed"))?
            .text()
            .await?;

        let mut unknown_types: BTreeSet<u8> = BTreeSet::new();
        let mut parsed = 0usize;
        for line in text.split("\r\n") {
            if line.is_empty() {
                continue;
            }
            match parse_export_line(gateway, line) {
                Ok(record) => {
                    records.push(record);
                    parsed += 1;
                }
                Err(ExportError::UnknownType(t)) => {
                    unknown_types.insert(t);
                }
                Err(ExportError::Malformed(reason)) => {
                    warn!("skipping export line ({reason}): {line}");
                }
            }
        }
        info!("{cloud}: {parsed} packets, unknown types {unknown_types:?}");
    }

    records.sort_by_key(|r| r.time);
    let mut out = std::fs::File::create(file)
        .with_context(|| format!("cannot create {}", file.display()))?;
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    info!("wrote {} records to {}", records.len(), file.display());
    Ok(())
}

enum ExportError {
    UnknownType(u8),
    Malformed(&'static str),
}

/// One line of a legacy export:
/// `<date>,<talker_hex>;<number_hex>;<type_hex>;<field>;<field>;…`
/// Data fields follow the wire order of the packet.
fn parse_export_line(gateway: Address, line: &str) -> Result<CaptureRecord, ExportError> {
    let parts: Vec<&str> = line.trim().split(';').collect();
    if parts.len() < 3 {
        return Err(ExportError::Malformed("too few fields"));
    }
    let head: Vec<&str> = parts[0].split(',').collect();
    if head.len() < 2 {
        return Err(ExportError::Malformed("missing talker address"));
    }
    let time = NaiveDateTime::parse_from_str(head[0], "%d.%m.%y %H:%M:%S")
        .map_err(|_| ExportError::Malformed("bad date"))?
        .and_utc()
        .timestamp();
    let talker = Address::from_str(head[1]).map_err(|_| ExportError::Malformed("bad talker"))?;
    let number =
        u8::from_str_radix(parts[1], 16).map_err(|_| ExportError::Malformed("bad number"))?;
    let packet_type =
        u8::from_str_radix(parts[2], 16).map_err(|_| ExportError::Malformed("bad type"))?;

    let int_field = |i: usize| -> Result<i64, ExportError> {
        parts
            .get(i)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or(ExportError::Malformed("bad numeric field"))
    };
    let float_field = |i: usize| -> Result<f32, ExportError> {
        parts
            .get(i)
            .and_then(|s| s.trim().parse::<f32>().ok())
            .ok_or(ExportError::Malformed("bad float field"))
    };

    let packet = match packet_type {
        canopy_types::packet::TAG_DATA_REV_3_2 => Packet::DataRev32(DataRev32 {
            receiver: gateway,
            sender: talker,
            number,
            time: int_field(3)? as u32,
            temperature_reference_cold: int_field(4)? as u32,
            temperature_heat_cold: int_field(5)? as u32,
            growth_sensor: int_field(6)? as u32,
            adc_bandgap: int_field(7)? as u32,
            number_of_bits: int_field(8)? as u8,
            air_relative_humidity: int_field(9)? as u8,
            air_temperature: int_field(10)? as i16,
            gravity_z_mean: int_field(11)? as i16,
            gravity_z_derivation: int_field(12)? as i16,
            gravity_y_mean: int_field(13)? as i16,
            gravity_y_derivation: int_field(14)? as i16,
            gravity_x_mean: int_field(15)? as i16,
            gravity_x_derivation: int_field(16)? as i16,
            temperature_reference_hot: int_field(17)? as u32,
            temperature_heat_hot: int_field(18)? as u32,
            stwc: int_field(19)? as u16,
            adc_volt_bat: int_field(20)? as u32,
        }),
        canopy_types::packet::TAG_LIGHT => {
            let mut as7263 = [0f32; 6];
            let mut as7262 = [0f32; 6];
            for (i, v) in as7263.iter_mut().enumerate() {
                *v = float_field(4 + i)?;
            }
            for (i, v) in as7262.iter_mut().enumerate() {
                *v = float_field(10 + i)?;
            }
            Packet::Light(Light {
                receiver: gateway,
                sender: talker,
                number,
                time: int_field(3)? as u32,
                as7263,
                as7262,
                integration_time: int_field(16)? as u8,
                gain: int_field(17)? as u8,
            })
        }
        other => return Err(ExportError::UnknownType(other)),
    };

    Ok(CaptureRecord {
        time,
        gateway,
        raw: BASE64_STANDARD.encode(packet.marshall()),
    })
}

// ── import ────────────────────────────────────────────────────────────────────

async fn import(file: &PathBuf, store_url: &str) -> anyhow::Result<()> {
    let store = PgStore::connect(store_url).await.context("store unreachable")?;
    let records = read_capture(file)?;
    info!("importing {} records", records.len());

    let mut written = 0usize;
    for record in &records {
        let Some((_, packet)) = record.decode() else {
            continue;
        };
        let rows = packet.observations();
        if rows.is_empty() {
            continue;
        }
        store
            .write(record.time, &rows)
            .await
            .context("observation write failed")?;
        written += rows.len();
    }
    info!("imported {written} observation rows");
    Ok(())
}

// ── count ─────────────────────────────────────────────────────────────────────

fn count(file: &PathBuf) -> anyhow::Result<()> {
    let records = read_capture(file)?;
    let mut per_gateway: std::collections::BTreeMap<String, usize> = Default::default();
    for record in &records {
        *per_gateway.entry(record.gateway.to_string()).or_default() += 1;
    }
    for (gateway, n) in &per_gateway {
        info!("{gateway}: {n} packets");
    }
    info!("total: {} packets", records.len());
    Ok(())
}

fn read_capture(file: &PathBuf) -> anyhow::Result<Vec<CaptureRecord>> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let mut records = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("skipping capture line {}: {e}", n + 1),
        }
    }
    Ok(records)
}
