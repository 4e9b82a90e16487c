//! # engine
//!
//! Per-gateway decision engine. Consumes decoded packets from its radio
//! bridge, fleet baselines from the aggregator, and coordinator verdicts;
//! writes observation rows; answers each talker with a tailored command.
//!
//! ## Concurrency
//! All state (`SlotTable`, sleep seeds, baselines) lives on one task fed by a
//! single `mpsc` queue: the bus subscription is the producer, `run` the only
//! consumer, so no field needs a lock. Evaluations are serialized per
//! gateway; a slow store query delays this gateway only.
//!
//! ## Error model
//! Decode errors drop the packet with no reply. Store and publish failures
//! degrade (empty history / no-op) and never abort an evaluation. A closed
//! subscription queue is fatal.

use std::collections::HashMap;
use std::sync::Arc;

use base64::prelude::*;
use canopy_types::{
    topic, unmarshall, Address, CloudHelo, DecodeError, HeloRequest, HeloResponse, Light,
    MovementBaseline, Packet, TemperatureBaseline,
};
use tracing::{debug, error, info, warn};

use crate::bus::{BusMessage, MessageBus};
use crate::policy::{self, AnomalyKind, Baselines, DataReading};
use crate::slots::SlotTable;
use crate::store::ObservationStore;

pub struct DecisionEngine {
    own: Address,
    /// Response-emission gate: false = observer mode, evaluate but publish
    /// no outbound packets.
    respond: bool,
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn ObservationStore>,
    slots: SlotTable,
    sleep_times: HashMap<Address, u16>,
    baselines: Baselines,
}

impl DecisionEngine {
    pub fn new(
        own: Address,
        respond: bool,
        bus: Arc<dyn MessageBus>,
        store: Arc<dyn ObservationStore>,
    ) -> Self {
        Self {
            own,
            respond,
            bus,
            store,
            slots: SlotTable::new(),
            sleep_times: HashMap::new(),
            baselines: Baselines::default(),
        }
    }

    /// Topics this engine instance consumes.
    pub fn subscriptions(own: Address) -> Vec<String> {
        vec![
            topic::receive(own),
            topic::GLOBAL_PATTERN.to_string(),
            topic::helo_response(own),
        ]
    }

    /// Drain the subscription queue until the bus dies.
    pub async fn run(mut self, mut rx: tokio::sync::mpsc::Receiver<BusMessage>) -> anyhow::Result<()> {
        info!("decision engine running for gateway {}", self.own);
        while let Some(msg) = rx.recv().await {
            self.handle(msg).await;
        }
        anyhow::bail!("bus subscription closed")
    }

    pub async fn handle(&mut self, msg: BusMessage) {
        debug!("message on {}", msg.topic);
        if msg.topic.starts_with("receive/") {
            self.handle_packet(&msg.payload).await;
        } else if msg.topic == topic::GLOBAL_MOVEMENT {
            self.handle_movement_baseline(&msg.payload);
        } else if msg.topic == topic::GLOBAL_TEMPERATURE {
            self.handle_temperature_baseline(&msg.payload);
        } else if msg.topic.starts_with("helo/response/") {
            self.handle_verdict(&msg.payload).await;
        } else {
            warn!("message on unexpected topic {}", msg.topic);
        }
    }

    // ── Baselines ─────────────────────────────────────────────────────────

    fn handle_movement_baseline(&mut self, payload: &[u8]) {
        match serde_json::from_slice::<MovementBaseline>(payload) {
            Ok(baseline) => {
                debug!("movement baseline updated: {baseline:?}");
                self.baselines.movement = Some(baseline);
            }
            Err(e) => warn!("bad movement baseline: {e}"),
        }
    }

    fn handle_temperature_baseline(&mut self, payload: &[u8]) {
        match serde_json::from_slice::<TemperatureBaseline>(payload) {
            Ok(baseline) => {
                debug!("temperature baseline updated: {baseline:?}");
                self.baselines.temperature = Some(baseline);
            }
            Err(e) => warn!("bad temperature baseline: {e}"),
        }
    }

    // ── Coordinator verdicts ──────────────────────────────────────────────

    async fn handle_verdict(&mut self, payload: &[u8]) {
        let response: HeloResponse = match serde_json::from_slice(payload) {
            Ok(r) => r,
            Err(e) => {
                warn!("bad helo response: {e}");
                return;
            }
        };
        if !response.connect {
            debug!("coordinator refused {}", response.tt_address);
            return;
        }

        let slot = self.slots.assign(response.tt_address);
        info!("talker {} connected, slot {slot}", response.tt_address);

        let helo = CloudHelo {
            receiver: response.tt_address,
            sender: self.own,
            command: policy::CONNECT_COMMAND,
            time: canopy_types::unix_now() as u32,
        };
        self.send(Packet::CloudHelo(helo)).await;
    }

    // ── Packets ───────────────────────────────────────────────────────────

    async fn handle_packet(&mut self, payload: &[u8]) {
        let raw = match BASE64_STANDARD.decode(payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("undecodable packet payload: {e}");
                return;
            }
        };
        let packet = match unmarshall(&raw) {
            Ok(p) => p,
            Err(e @ (DecodeError::Truncated { .. } | DecodeError::PayloadSize { .. })) => {
                warn!("dropping truncated packet: {e}");
                return;
            }
            Err(e @ DecodeError::UnknownTag(_)) => {
                warn!("dropping packet: {e}");
                return;
            }
        };
        debug!("{} from {}", packet.kind(), packet.sender());

        // Address filter before any evaluation.
        let receiver = packet.receiver();
        if receiver == Address::MULTICAST {
            // Any gateway may answer.
        } else if receiver == self.own {
            if !self.slots.is_known(packet.sender()) {
                let slot = self.slots.assign(packet.sender());
                debug!("first contact from {}, slot {slot}", packet.sender());
            }
        } else {
            debug!("addressed to {receiver}, not us, dropping");
            return;
        }

        match packet {
            Packet::Helo(helo) => self.on_helo(helo.sender).await,
            Packet::DataRev31(p) => self.on_data(&raw, DataReading::from(&p), packet.observations()).await,
            Packet::DataRev32(p) => self.on_data(&raw, DataReading::from(&p), packet.observations()).await,
            Packet::Light(p) => self.on_light(&raw, p).await,
            other => {
                warn!("ignoring {} packet from {}", other.kind(), other.sender());
            }
        }
    }

    /// A talker announced itself: ask the coordinator who owns it. The reply
    /// waits for the verdict.
    async fn on_helo(&mut self, talker: Address) {
        let request = HeloRequest { cloud_address: self.own, tt_address: talker };
        debug!("requesting assignment for {talker}");
        let payload = match serde_json::to_vec(&request) {
            Ok(p) => p,
            Err(e) => {
                error!("helo request serialization failed: {e}");
                return;
            }
        };
        if let Err(e) = self.bus.publish(topic::HELO_REQUEST, &payload).await {
            warn!("helo request publish failed: {e}");
        }
    }

    async fn on_data(
        &mut self,
        raw: &[u8],
        reading: DataReading,
        rows: Vec<canopy_types::Observation>,
    ) {
        let now = canopy_types::unix_now();
        let talker = reading.talker;

        let last_sleep = self.sleep_times.get(&talker).copied().unwrap_or(policy::SLEEP_TIME_DEFAULT);
        let mut sleep = policy::evaluate_battery(
            self.store.as_ref(),
            talker,
            reading.battery_millivolts,
            last_sleep,
            now,
        )
        .await;

        let mut anomalies = policy::scan_anomalies(
            self.store.as_ref(),
            &reading,
            &self.baselines,
            now,
            policy::ANALYSIS_TIME_SHORT,
        )
        .await;
        if policy::evaluate_air_temperature(&reading) {
            anomalies.push(AnomalyKind::AirTemperature);
        }

        if !anomalies.is_empty() {
            let kinds: Vec<&str> = anomalies.iter().map(|k| k.as_str()).collect();
            info!("{talker}: anomalies {kinds:?}, forcing minimum sleep");
            sleep = policy::SLEEP_TIME_MIN;
            self.publish_anomalies(raw, &anomalies).await;
        }
        self.sleep_times.insert(talker, sleep);

        if let Err(e) = self.store.write(now, &rows).await {
            warn!("observation write failed: {e}");
        }

        let reply = policy::data_reply(self.own, talker, sleep, self.slots.slot_of(talker), now);
        self.send(Packet::Command1(reply)).await;
    }

    async fn on_light(&mut self, raw: &[u8], packet: Light) {
        let now = canopy_types::unix_now();
        let talker = packet.sender;

        let bright = policy::evaluate_brightness(
            self.store.as_ref(),
            &packet,
            now,
            policy::ANALYSIS_TIME_SHORT,
        )
        .await;
        if bright {
            info!("{talker}: brightness anomaly");
            self.publish_anomalies(raw, &[AnomalyKind::Brightness]).await;
        }

        if let Err(e) = self.store.write(now, &packet.observations()).await {
            warn!("observation write failed: {e}");
        }

        let reply = policy::light_reply(self.own, talker, now);
        self.send(Packet::Command2(reply)).await;
    }

    /// Copy the offending packet bytes to the anomaly observers.
    async fn publish_anomalies(&self, raw: &[u8], kinds: &[AnomalyKind]) {
        let payload = BASE64_STANDARD.encode(raw);
        for kind in kinds {
            let topic = topic::anomaly(kind.as_str(), self.own);
            if let Err(e) = self.bus.publish(&topic, payload.as_bytes()).await {
                warn!("anomaly publish failed on {topic}: {e}");
            }
        }
    }

    /// Publish a reply to our bridge, unless the response gate is closed.
    async fn send(&self, packet: Packet) {
        if !self.respond {
            debug!("observer mode: holding {} to {}", packet.kind(), packet.receiver());
            return;
        }
        let payload = BASE64_STANDARD.encode(packet.marshall());
        if let Err(e) = self.bus.publish(&topic::command(self.own), payload.as_bytes()).await {
            warn!("command publish failed: {e}");
        }
    }
}
