//! Response-time analyser process: measures request→reply latency from
//! sniffed traffic.

use std::sync::Arc;

use anyhow::Context;
use canopy_gateway::bus::{MessageBus, RedisBus};
use canopy_gateway::response::ResponseAnalyser;
use canopy_gateway::store::{ObservationStore, PgStore};
use canopy_gateway::init_logging;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "canopy-response-time", about = "Logs reply latency from sniffer topics")]
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
    info!("🌲 canopy response-time analyser v{} starting", env!("CARGO_PKG_VERSION"));

    let bus: Arc<dyn MessageBus> =
        Arc::new(RedisBus::connect(&args.bus).await.context("bus unreachable")?);
    let store: Arc<dyn ObservationStore> =
        Arc::new(PgStore::connect(&args.store).await.context("store unreachable")?);

    let rx = bus
        .subscribe(&ResponseAnalyser::subscriptions())
        .await
        .context("bus subscription failed")?;
    let analyser = ResponseAnalyser::new(store);

    tokio::select! {
        result = analyser.run(rx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
