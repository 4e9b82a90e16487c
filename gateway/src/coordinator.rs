//! # coordinator
//!
//! Network coordinator: binds each talker to the first gateway that claims
//! it. Single instance per fleet; the assignment table is process-local and
//! intentionally ephemeral; a restart lets the fleet re-sort itself.
//!
//! The mapping is monotone within a run: once a talker is bound, every later
//! claim by a different gateway is refused. No eviction, no rebalancing.

use std::collections::HashMap;
use std::sync::Arc;

use canopy_types::{topic, Address, HeloRequest, HeloResponse};
use tracing::{debug, info, warn};

use crate::bus::{BusMessage, MessageBus};

pub struct Coordinator {
    bus: Arc<dyn MessageBus>,
    assignments: HashMap<Address, Address>,
}

impl Coordinator {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus, assignments: HashMap::new() }
    }

    pub fn subscriptions() -> Vec<String> {
        vec![topic::HELO_REQUEST.to_string()]
    }

    pub async fn run(mut self, mut rx: tokio::sync::mpsc::Receiver<BusMessage>) -> anyhow::Result<()> {
        info!("coordinator running");
        while let Some(msg) = rx.recv().await {
            self.handle(msg).await;
        }
        anyhow::bail!("bus subscription closed")
    }

    pub async fn handle(&mut self, msg: BusMessage) {
        let request: HeloRequest = match serde_json::from_slice(&msg.payload) {
            Ok(r) => r,
            Err(e) => {
                warn!("bad helo request: {e}");
                return;
            }
        };

        let connect = self.decide(request.cloud_address, request.tt_address);
        debug!(
            "claim of {} by {} → connect={connect}",
            request.tt_address, request.cloud_address
        );

        let response = HeloResponse { tt_address: request.tt_address, connect };
        let payload = match serde_json::to_vec(&response) {
            Ok(p) => p,
            Err(e) => {
                warn!("helo response serialization failed: {e}");
                return;
            }
        };
        let reply_topic = topic::helo_response(request.cloud_address);
        if let Err(e) = self.bus.publish(&reply_topic, &payload).await {
            warn!("helo response publish failed: {e}");
        }
    }

    /// First claim wins; the winner keeps reconnecting, everyone else is
    /// refused for the process lifetime.
    pub fn decide(&mut self, gateway: Address, talker: Address) -> bool {
        match self.assignments.get(&talker) {
            None => {
                info!("assigning talker {talker} to gateway {gateway}");
                self.assignments.insert(talker, gateway);
                true
            }
            Some(assigned) => *assigned == gateway,
        }
    }
}
