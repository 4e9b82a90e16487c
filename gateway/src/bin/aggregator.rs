//! Aggregator process: single instance, periodic fleet baselines.

use std::sync::Arc;

use anyhow::Context;
use canopy_gateway::aggregator::Aggregator;
use canopy_gateway::bus::{MessageBus, RedisBus};
use canopy_gateway::store::{ObservationStore, PgStore};
use canopy_gateway::init_logging;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "canopy-aggregator", about = "Publishes fleet-wide movement and temperature baselines")]
struct Args {
    /// Message bus URL
    #[arg(short, long, env = "CANOPY_BUS", default_value = "redis://127.0.0.1:6379")]
    bus: String,
    /// Time-series store URL
    #[arg(short, long, env = "CANOPY_STORE", default_value = "postgres://canopy@127.0.0.1/canopy")]
    store: String,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!("🌲 canopy aggregator v{} starting", env!("CARGO_PKG_VERSION"));

    let bus: Arc<dyn MessageBus> =
        Arc::new(RedisBus::connect(&args.bus).await.context("bus unreachable")?);
    let store: Arc<dyn ObservationStore> =
        Arc::new(PgStore::connect(&args.store).await.context("store unreachable")?);
    let aggregator = Aggregator::new(bus, store);

    tokio::select! {
        result = aggregator.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
