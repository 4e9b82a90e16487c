//! # bridge
//!
//! Radio bridge: adapts radio frames to bus messages for one gateway address
//! and back. Stateless by design: it validates framing and the codec but
//! never looks at packet semantics; decisions belong to the engine.
//!
//! Inbound: strip the `FF FF 00 00` preamble, check the bytes decode, publish
//! base64 on `receive/<gateway>`. Outbound: take `command/<gateway>`, decode
//! base64, re-frame, transmit.

use std::sync::Arc;

use base64::prelude::*;
use canopy_types::{topic, unmarshall, Address, FRAME_PREAMBLE};
use tracing::{debug, info, warn};

use crate::bus::{BusMessage, MessageBus};
use crate::radio::RadioLink;

pub struct RadioBridge {
    own: Address,
    bus: Arc<dyn MessageBus>,
    radio: Arc<dyn RadioLink>,
}

impl RadioBridge {
    pub fn new(own: Address, bus: Arc<dyn MessageBus>, radio: Arc<dyn RadioLink>) -> Self {
        Self { own, bus, radio }
    }

    pub fn subscriptions(own: Address) -> Vec<String> {
        vec![topic::command(own)]
    }

    pub async fn run(self, mut rx: tokio::sync::mpsc::Receiver<BusMessage>) -> anyhow::Result<()> {
        info!("radio bridge running for gateway {}", self.own);
        loop {
            tokio::select! {
                frame = self.radio.recv_frame() => match frame {
                    Ok(frame) => self.on_frame(&frame).await,
                    Err(e) => warn!("radio receive error: {e}"),
                },
                msg = rx.recv() => match msg {
                    Some(msg) => self.on_command(&msg.payload).await,
                    None => anyhow::bail!("bus subscription closed"),
                },
            }
        }
    }

    pub async fn on_frame(&self, frame: &[u8]) {
        let Some(raw) = frame.strip_prefix(&FRAME_PREAMBLE[..]) else {
            warn!("frame without preamble ({} bytes), dropping", frame.len());
            return;
        };
        debug!("radio frame: {}", hex::encode(raw));
        if let Err(e) = unmarshall(raw) {
            warn!("undecodable frame, dropping: {e}");
            return;
        }
        let payload = BASE64_STANDARD.encode(raw);
        if let Err(e) = self.bus.publish(&topic::receive(self.own), payload.as_bytes()).await {
            warn!("receive publish failed: {e}");
        }
    }

    pub async fn on_command(&self, payload: &[u8]) {
        let raw = match BASE64_STANDARD.decode(payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("undecodable command payload: {e}");
                return;
            }
        };
        if let Err(e) = unmarshall(&raw) {
            warn!("refusing to transmit undecodable bytes: {e}");
            return;
        }
        let mut frame = Vec::with_capacity(FRAME_PREAMBLE.len() + raw.len());
        frame.extend_from_slice(&FRAME_PREAMBLE);
        frame.extend_from_slice(&raw);
        debug!("transmitting frame: {}", hex::encode(&raw));
        if let Err(e) = self.radio.send_frame(&frame).await {
            warn!("radio transmit failed: {e}");
        }
    }
}
