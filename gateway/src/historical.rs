//! # historical
//!
//! Offline analysis over a capture file: the same policy primitives the live
//! engine runs, replayed against recorded traffic with two windows: the
//! short window for ordinary anomalies and the long window (plus the
//! air-temperature check) for critical events.
//!
//! Fleet baselines are recomputed from the store as packet time advances,
//! every [`ANALYSIS_WINDOW`] seconds, so each packet is judged against the
//! fleet as it looked back then.

use base64::prelude::*;
use canopy_types::{unmarshall, Address, Packet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregator::{aggregate_movement, aggregate_temperature};
use crate::policy::{
    evaluate_air_temperature, scan_anomalies, AnomalyKind, Baselines, DataReading,
    ANALYSIS_TIME_LONG, ANALYSIS_TIME_SHORT,
};
use crate::store::ObservationStore;

/// Seconds of packet time between baseline refreshes.
pub const ANALYSIS_WINDOW: i64 = 250;

/// One recorded packet: capture files are JSONL of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Receive time at the gateway, seconds.
    pub time: i64,
    /// Gateway that recorded the packet.
    pub gateway: Address,
    /// Base64 of the marshalled packet bytes.
    pub raw: String,
}

impl CaptureRecord {
    pub fn decode(&self) -> Option<(Vec<u8>, Packet)> {
        let raw = match BASE64_STANDARD.decode(&self.raw) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("capture record with bad base64: {e}");
                return None;
            }
        };
        match unmarshall(&raw) {
            Ok(packet) => Some((raw, packet)),
            Err(e) => {
                warn!("capture record does not decode: {e}");
                None
            }
        }
    }
}

/// One report line in `anomalies.jsonl` / `critical.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub timestamp: i64,
    pub talker: Address,
    pub events: Vec<String>,
    /// Base64 of the offending packet, for forensics.
    pub packet: String,
}

/// What one data packet looked like under both windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub anomalies: Vec<AnomalyKind>,
    pub critical: Vec<AnomalyKind>,
}

/// Replays the policy set over packet time, refreshing fleet baselines as it
/// goes.
pub struct OfflineAnalysis<'a> {
    store: &'a dyn ObservationStore,
    short: Baselines,
    long: Baselines,
    aggregated_at: i64,
}

impl<'a> OfflineAnalysis<'a> {
    pub async fn new(store: &'a dyn ObservationStore, start: i64) -> OfflineAnalysis<'a> {
        let mut analysis =
            OfflineAnalysis { store, short: Baselines::default(), long: Baselines::default(), aggregated_at: start };
        analysis.refresh(start).await;
        analysis
    }

    async fn refresh(&mut self, at: i64) {
        debug!("refreshing baselines at packet time {at}");
        self.short = Baselines {
            movement: aggregate_movement(self.store, at, ANALYSIS_TIME_SHORT).await,
            temperature: aggregate_temperature(self.store, at, ANALYSIS_TIME_SHORT).await,
        };
        self.long = Baselines {
            movement: aggregate_movement(self.store, at, ANALYSIS_TIME_LONG).await,
            temperature: aggregate_temperature(self.store, at, ANALYSIS_TIME_LONG).await,
        };
        self.aggregated_at = at;
    }

    pub async fn scan(&mut self, time: i64, reading: &DataReading) -> ScanOutcome {
        if time > self.aggregated_at + ANALYSIS_WINDOW {
            self.refresh(time).await;
        }

        let anomalies =
            scan_anomalies(self.store, reading, &self.short, time, ANALYSIS_TIME_SHORT).await;
        let mut critical =
            scan_anomalies(self.store, reading, &self.long, time, ANALYSIS_TIME_LONG).await;
        if evaluate_air_temperature(reading) {
            critical.push(AnomalyKind::AirTemperature);
        }
        ScanOutcome { anomalies, critical }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use canopy_types::{DataRev31, Helo};

    #[test]
    fn capture_records_round_trip_through_json() {
        let packet = Packet::Helo(Helo {
            receiver: Address::MULTICAST,
            sender: Address(0x5201_0352),
            number: 1,
        });
        let record = CaptureRecord {
            time: 1_700_000_000,
            gateway: Address(0xc203_0118),
            raw: BASE64_STANDARD.encode(packet.marshall()),
        };
        let line = serde_json::to_string(&record).unwrap();
        let parsed: CaptureRecord = serde_json::from_str(&line).unwrap();
        let (_, decoded) = parsed.decode().unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn corrupt_records_decode_to_none() {
        let record = CaptureRecord {
            time: 0,
            gateway: Address(1),
            raw: "@@not base64@@".into(),
        };
        assert!(record.decode().is_none());
    }

    #[tokio::test]
    async fn hot_air_is_critical_but_not_an_anomaly() {
        let store = MemoryStore::new();
        let mut analysis = OfflineAnalysis::new(&store, 1_700_000_000).await;

        let packet = DataRev31 {
            receiver: Address(0xc203_0118),
            sender: Address(0x5201_0352),
            number: 1,
            time: 0,
            temperature_reference: 34_000,
            temperature_heat: 34_500,
            growth_sensor: 41_000,
            adc_bandgap: 43_000,
            number_of_bits: 17,
            air_relative_humidity: 10,
            air_temperature: 600,
            gravity_z_mean: 0,
            gravity_z_derivation: 0,
            gravity_y_mean: 0,
            gravity_y_derivation: 0,
            gravity_x_mean: 0,
            gravity_x_derivation: 0,
            stwc: 0,
            adc_volt_bat: 98_304,
        };
        let outcome = analysis.scan(1_700_000_100, &DataReading::from(&packet)).await;
        assert_eq!(outcome.anomalies, vec![]);
        assert_eq!(outcome.critical, vec![AnomalyKind::AirTemperature]);
    }
}
