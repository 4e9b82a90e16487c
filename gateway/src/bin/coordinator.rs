//! Network-coordinator process: single instance per fleet.

use std::sync::Arc;

use anyhow::Context;
use canopy_gateway::bus::{MessageBus, RedisBus};
use canopy_gateway::coordinator::Coordinator;
use canopy_gateway::init_logging;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "canopy-coordinator", about = "Assigns talkers to gateways, first claim wins")]
struct Args {
    /// Message bus URL
    #[arg(short, long, env = "CANOPY_BUS", default_value = "redis://127.0.0.1:6379")]
    bus: String,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!("🌲 canopy coordinator v{} starting", env!("CARGO_PKG_VERSION"));

    let bus: Arc<dyn MessageBus> =
        Arc::new(RedisBus::connect(&args.bus).await.context("bus unreachable")?);
    let rx = bus
        .subscribe(&Coordinator::subscriptions())
        .await
        .context("bus subscription failed")?;
    let coordinator = Coordinator::new(bus);

    tokio::select! {
        result = coordinator.run(rx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
