//! main.rs: dummy talker
//!
//! Plays one battery-powered talker against a live bus: announces itself
//! with a Helo, waits for the gateway's CloudHelo, then alternates data and
//! light packets on a randomized interval, logging every command that comes
//! back. Useful for exercising the whole engine/coordinator/aggregator
//! pipeline without a radio.

mod readings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::prelude::*;
use canopy_gateway::bus::{BusMessage, MessageBus, RedisBus};
use canopy_types::{topic, unmarshall, Address, Packet};
use clap::Parser;
use rand::Rng;
use tracing::{info, warn};

use readings::TalkerModel;

#[derive(Parser, Debug)]
#[command(name = "canopy-sim", about = "Dummy talker for pipeline testing")]
struct Args {
    /// Message bus URL
    #[arg(short, long, env = "CANOPY_BUS", default_value = "redis://127.0.0.1:6379")]
    bus: String,
    /// Gateway to talk to (hex address)
    #[arg(short, long, env = "CANOPY_ADDRESS")]
    gateway: Address,
    /// Our talker address (hex)
    #[arg(short, long, default_value = "52010352")]
    talker: Address,
    /// Shortest pause between packets, seconds
    #[arg(long, default_value = "10")]
    min_interval: u64,
    /// Longest pause between packets, seconds
    #[arg(long, default_value = "60")]
    max_interval: u64,
    #[arg(short, long)]
    verbose: bool,
}

fn log_command(talker: Address, msg: &BusMessage) {
    let raw = match BASE64_STANDARD.decode(&msg.payload) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("undecodable command payload: {e}");
            return;
        }
    };
    let packet = match unmarshall(&raw) {
        Ok(p) => p,
        Err(e) => {
            warn!("undecodable command: {e}");
            return;
        }
    };
    if packet.receiver() != talker {
        return;
    }
    match packet {
        Packet::CloudHelo(p) => info!("accepted by gateway {} (time {})", p.sender, p.time),
        Packet::Command1(p) => info!(
            "data command: sleep {}s, heating {}s, slot {} ({}s)",
            p.sleep_interval, p.heating, p.time_slot, p.time_slot_length
        ),
        Packet::Command2(p) => info!(
            "light command: integration {} gain {}",
            p.integration_time, p.gain
        ),
        other => info!("unexpected {} packet", other.kind()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if args.verbose { "canopy_sim=debug".into() } else { "canopy_sim=info".into() }
            }),
        )
        .init();

    info!(
        "🌲 canopy-sim v{}, talker {} against gateway {}",
        env!("CARGO_PKG_VERSION"),
        args.talker,
        args.gateway
    );

    let bus: Arc<dyn MessageBus> =
        Arc::new(RedisBus::connect(&args.bus).await.context("bus unreachable")?);
    let mut rx = bus
        .subscribe(&[topic::command(args.gateway)])
        .await
        .context("bus subscription failed")?;

    let receive_topic = topic::receive(args.gateway);
    let mut model = TalkerModel::new(args.talker, args.gateway);

    // Announce until a gateway takes us.
    info!("sending helo");
    let mut accepted = false;
    while !accepted {
        let payload = BASE64_STANDARD.encode(model.helo_packet().marshall());
        bus.publish(&receive_topic, payload.as_bytes()).await?;

        let deadline = tokio::time::sleep(Duration::from_secs(10));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    info!("no acceptance yet, re-announcing");
                    break;
                }
                msg = rx.recv() => {
                    let msg = msg.context("bus subscription closed")?;
                    if let Ok(raw) = BASE64_STANDARD.decode(&msg.payload) {
                        if let Ok(Packet::CloudHelo(p)) = unmarshall(&raw) {
                            if p.receiver == args.talker {
                                info!("accepted by {}", p.sender);
                                accepted = true;
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    // Replies are logged from their own task from here on.
    let talker = args.talker;
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            log_command(talker, &msg);
        }
        warn!("bus subscription closed");
    });

    // Measurement loop: pause, then send a data or light packet.
    loop {
        let wait = {
            let mut rng = rand::thread_rng();
            rng.gen_range(args.min_interval..=args.max_interval.max(args.min_interval))
        };
        info!("sleeping {wait}s");
        tokio::time::sleep(Duration::from_secs(wait)).await;

        let packet = {
            let mut rng = rand::thread_rng();
            if rng.gen_bool(0.5) { model.data_packet() } else { model.light_packet() }
        };
        info!("sending {}", packet.kind());
        let payload = BASE64_STANDARD.encode(packet.marshall());
        bus.publish(&receive_topic, payload.as_bytes()).await?;
    }
}
