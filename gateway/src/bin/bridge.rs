//! Radio-bridge process: one per gateway, next to the radio modem.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use canopy_gateway::bridge::RadioBridge;
use canopy_gateway::bus::{MessageBus, RedisBus};
use canopy_gateway::radio::{RadioLink, UdpRadio};
use canopy_gateway::init_logging;
use canopy_types::Address;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "canopy-bridge", about = "Adapts radio frames to bus messages for one gateway")]
struct Args {
    /// Gateway radio address (hex)
    #[arg(short, long, env = "CANOPY_ADDRESS")]
    address: Address,
    /// Message bus URL
    #[arg(short, long, env = "CANOPY_BUS", default_value = "redis://127.0.0.1:6379")]
    bus: String,
    /// UDP bind address for the radio link
    #[arg(long, env = "CANOPY_RADIO", default_value = "0.0.0.0:7373")]
    radio: String,
    /// Fixed transmit peer; defaults to answering the last frame's source
    #[arg(long)]
    peer: Option<SocketAddr>,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!(
        "🌲 canopy radio bridge v{} starting, gateway {}",
        env!("CARGO_PKG_VERSION"),
        args.address
    );

    let bus: Arc<dyn MessageBus> =
        Arc::new(RedisBus::connect(&args.bus).await.context("bus unreachable")?);
    let radio: Arc<dyn RadioLink> = Arc::new(
        UdpRadio::bind(&args.radio, args.peer)
            .await
            .context("radio link bind failed")?,
    );

    let rx = bus
        .subscribe(&RadioBridge::subscriptions(args.address))
        .await
        .context("bus subscription failed")?;
    let bridge = RadioBridge::new(args.address, bus, radio);

    tokio::select! {
        result = bridge.run(rx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
