//! # canopy-gateway
//!
//! The canopy service crate: every long-lived process of the gateway suite
//! plus the offline tooling, built on one shared library.
//!
//! | Binary | Component |
//! |---|---|
//! | `canopy-engine` | per-gateway decision engine |
//! | `canopy-bridge` | per-gateway radio ↔ bus bridge |
//! | `canopy-coordinator` | fleet-wide talker↔gateway binding |
//! | `canopy-aggregator` | periodic fleet baselines |
//! | `canopy-historical` | offline anomaly/critical scan over a capture |
//! | `canopy-capture` | capture download / store import tooling |
//! | `canopy-response-time` | sniffer-fed latency measurements |
//!
//! Processes communicate exclusively through the bus (`bus::MessageBus`) and
//! the time-series store (`store::ObservationStore`); both are traits so
//! tests wire the in-memory doubles instead.

pub mod aggregator;
pub mod bridge;
pub mod bus;
pub mod coordinator;
pub mod engine;
pub mod historical;
pub mod policy;
pub mod radio;
pub mod response;
pub mod slots;
pub mod stats;
pub mod store;

/// Shared tracing setup for the binaries: RUST_LOG wins, otherwise `-v`
/// selects debug for our crates.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "canopy_gateway=debug,canopy_types=debug"
    } else {
        "canopy_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}
