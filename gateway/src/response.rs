//! # response
//!
//! Response-time analyser. Listens on the sniffer topics where passive
//! observers mirror over-the-air traffic, pairs each command with the most
//! recent data/light packet from the same talker, and writes the latency as
//! a `response_time` row for dashboarding.

use std::collections::HashMap;
use std::sync::Arc;

use base64::prelude::*;
use canopy_types::observation::measurement;
use canopy_types::{topic, unmarshall, Address, Observation, Packet};
use tracing::{debug, info, warn};

use crate::bus::BusMessage;
use crate::store::ObservationStore;

pub struct ResponseAnalyser {
    store: Arc<dyn ObservationStore>,
    /// (talker, packet kind) → send time of the still-unanswered request.
    pending: HashMap<(Address, &'static str), f64>,
}

impl ResponseAnalyser {
    pub fn new(store: Arc<dyn ObservationStore>) -> Self {
        Self { store, pending: HashMap::new() }
    }

    pub fn subscriptions() -> Vec<String> {
        vec![topic::SNIFFER_PATTERN.to_string()]
    }

    pub async fn run(mut self, mut rx: tokio::sync::mpsc::Receiver<BusMessage>) -> anyhow::Result<()> {
        info!("response-time analyser running");
        while let Some(msg) = rx.recv().await {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64();
            self.handle(msg, now).await;
        }
        anyhow::bail!("bus subscription closed")
    }

    pub async fn handle(&mut self, msg: BusMessage, now: f64) {
        // sniffer/ttcloud/… mirrors the gateway side, sniffer/ttt/… the
        // talker side.
        let responder = if msg.topic.starts_with("sniffer/ttcloud") {
            "ttcloud"
        } else if msg.topic.starts_with("sniffer/ttt") {
            "ttt"
        } else {
            warn!("message on unexpected topic {}", msg.topic);
            return;
        };

        let raw = match BASE64_STANDARD.decode(&msg.payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("undecodable sniffer payload: {e}");
                return;
            }
        };
        let packet = match unmarshall(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!("dropping sniffed packet: {e}");
                return;
            }
        };

        match packet {
            Packet::Command1(c) => self.record(c.receiver, "data", responder, now).await,
            Packet::Command2(c) => self.record(c.receiver, "light", responder, now).await,
            Packet::DataRev31(p) => {
                self.pending.insert((p.sender, "data"), now);
            }
            Packet::DataRev32(p) => {
                self.pending.insert((p.sender, "data"), now);
            }
            Packet::Light(p) => {
                self.pending.insert((p.sender, "light"), now);
            }
            other => debug!("not interested in {} packets", other.kind()),
        }
    }

    async fn record(&mut self, talker: Address, packet_type: &'static str, responder: &str, now: f64) {
        let Some(request_time) = self.pending.get(&(talker, packet_type)) else {
            warn!("command for {talker} without a pending {packet_type} packet");
            return;
        };
        let response_time = now - request_time;
        info!("answer to {talker} from {responder}: {response_time:.3}s");

        let row = Observation {
            measurement: measurement::RESPONSE_TIME,
            talker,
            tags: vec![
                ("responder", responder.to_string()),
                ("packet_type", packet_type.to_string()),
            ],
            fields: vec![("response_time", response_time)],
        };
        if let Err(e) = self.store.write(now as i64, &[row]).await {
            warn!("response-time write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SeriesQuery};
    use canopy_types::{Command1, DataRev32};

    const GW: Address = Address(0xc203_0118);
    const TALKER: Address = Address(0x5201_0352);

    fn sniffed(topic: &str, packet: Packet) -> BusMessage {
        BusMessage {
            topic: topic.to_string(),
            payload: BASE64_STANDARD.encode(packet.marshall()).into_bytes(),
        }
    }

    fn data_packet() -> Packet {
        Packet::DataRev32(DataRev32 {
            receiver: GW,
            sender: TALKER,
            number: 1,
            time: 14_400,
            temperature_reference_cold: 34_167,
            temperature_reference_hot: 34_168,
            temperature_heat_cold: 34_298,
            temperature_heat_hot: 22_018,
            growth_sensor: 47_212,
            adc_bandgap: 43_585,
            number_of_bits: 17,
            air_relative_humidity: 30,
            air_temperature: 226,
            gravity_z_mean: 57,
            gravity_z_derivation: -803,
            gravity_y_mean: 3_986,
            gravity_y_derivation: 0,
            gravity_x_mean: 0,
            gravity_x_derivation: 0,
            stwc: 50_566,
            adc_volt_bat: 82_757,
        })
    }

    fn command_packet() -> Packet {
        Packet::Command1(Command1 {
            receiver: TALKER,
            sender: GW,
            command: 32,
            time: 14_460,
            sleep_interval: 600,
            reserved: 0,
            heating: 100,
            time_slot_length: 60,
            time_slot: 1,
        })
    }

    #[tokio::test]
    async fn latency_is_measured_between_request_and_reply() {
        let store = Arc::new(MemoryStore::new());
        let mut analyser = ResponseAnalyser::new(store.clone());

        analyser.handle(sniffed("sniffer/ttt/1", data_packet()), 100.0).await;
        analyser.handle(sniffed("sniffer/ttcloud/1", command_packet()), 103.5).await;

        let rows = store
            .query(SeriesQuery {
                measurement: measurement::RESPONSE_TIME,
                talker: Some(TALKER),
                since: 0,
                until: i64::MAX,
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].fields["response_time"] - 3.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn orphan_commands_write_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut analyser = ResponseAnalyser::new(store.clone());

        analyser.handle(sniffed("sniffer/ttcloud/1", command_packet()), 50.0).await;

        let rows = store
            .query(SeriesQuery {
                measurement: measurement::RESPONSE_TIME,
                talker: Some(TALKER),
                since: 0,
                until: i64::MAX,
            })
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
