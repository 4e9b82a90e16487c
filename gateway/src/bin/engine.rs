//! Decision-engine process: one per gateway address.

use std::sync::Arc;

use anyhow::Context;
use canopy_gateway::bus::{MessageBus, RedisBus};
use canopy_gateway::engine::DecisionEngine;
use canopy_gateway::store::{ObservationStore, PgStore};
use canopy_gateway::init_logging;
use canopy_types::Address;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "canopy-engine", about = "Per-gateway decision engine")]
struct Args {
    /// Gateway radio address (hex)
    #[arg(short, long, env = "CANOPY_ADDRESS")]
    address: Address,
    /// Message bus URL
    #[arg(short, long, env = "CANOPY_BUS", default_value = "redis://127.0.0.1:6379")]
    bus: String,
    /// Time-series store URL
    #[arg(short, long, env = "CANOPY_STORE", default_value = "postgres://canopy@127.0.0.1/canopy")]
    store: String,
    /// Evaluate packets but publish no outbound replies (observer mode)
    #[arg(long)]
    no_response: bool,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!(
        "🌲 canopy decision engine v{} starting, gateway {}",
        env!("CARGO_PKG_VERSION"),
        args.address
    );

    let bus: Arc<dyn MessageBus> =
        Arc::new(RedisBus::connect(&args.bus).await.context("bus unreachable")?);
    let store: Arc<dyn ObservationStore> =
        Arc::new(PgStore::connect(&args.store).await.context("store unreachable")?);

    let rx = bus
        .subscribe(&DecisionEngine::subscriptions(args.address))
        .await
        .context("bus subscription failed")?;
    let engine = DecisionEngine::new(args.address, !args.no_response, bus, store);

    tokio::select! {
        result = engine.run(rx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
