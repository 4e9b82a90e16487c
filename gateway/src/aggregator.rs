//! # aggregator
//!
//! Fleet-baseline aggregator. Every [`AGGREGATION_INTERVAL`] it recomputes
//! fleet-wide statistics over the short analysis window and publishes them on
//! `global/movement` and `global/temperature`. Every decision engine keeps
//! the last value it saw; a transient skew between engines is fine; a
//! missing baseline just means "no anomaly" on the affected checks.
//!
//! The aggregation functions are also called by the offline analyser with an
//! explicit upper time bound.

use std::sync::Arc;
use std::time::Duration;

use canopy_types::observation::measurement;
use canopy_types::{topic, MovementBaseline, TemperatureBaseline};
use tracing::{debug, info, warn};

use crate::bus::MessageBus;
use crate::policy::ANALYSIS_TIME_SHORT;
use crate::stats::{mean, stdev};
use crate::store::{ObservationStore, SeriesQuery};

/// Recompute cadence, seconds.
pub const AGGREGATION_INTERVAL: u64 = 600;

/// Per-axis mean/stdev of every gravity derivative in the window, fleet-wide.
/// `None` when any axis has no data at all.
pub async fn aggregate_movement(
    store: &dyn ObservationStore,
    until: i64,
    window: i64,
) -> Option<MovementBaseline> {
    let rows = match store
        .query(SeriesQuery {
            measurement: measurement::GRAVITY,
            talker: None,
            since: until - window,
            until,
        })
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("movement aggregation query failed: {e}");
            return None;
        }
    };

    let axis = |field: &str| -> Vec<f64> {
        rows.iter().filter_map(|r| r.fields.get(field).copied()).collect()
    };
    let x = axis("x_derivation");
    let y = axis("y_derivation");
    let z = axis("z_derivation");
    if x.is_empty() || y.is_empty() || z.is_empty() {
        debug!("no movement data: [x: {}, y: {}, z: {}]", x.len(), y.len(), z.len());
        return None;
    }

    Some(MovementBaseline {
        mean_x: mean(&x),
        stdev_x: stdev(&x),
        mean_y: mean(&y),
        stdev_y: stdev(&y),
        mean_z: mean(&z),
        stdev_z: stdev(&z),
    })
}

/// Stdev of the cold/hot probe delta series in the window, fleet-wide.
/// `None` below two usable rows per probe.
pub async fn aggregate_temperature(
    store: &dyn ObservationStore,
    until: i64,
    window: i64,
) -> Option<TemperatureBaseline> {
    let rows = match store
        .query(SeriesQuery {
            measurement: measurement::STEM_TEMPERATURE,
            talker: None,
            since: until - window,
            until,
        })
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("temperature aggregation query failed: {e}");
            return None;
        }
    };

    let mut deltas_cold = Vec::new();
    let mut deltas_hot = Vec::new();
    for row in &rows {
        let (Some(rc), Some(rh), Some(hc), Some(hh)) = (
            row.fields.get("ttt_reference_probe_cold"),
            row.fields.get("ttt_reference_probe_hot"),
            row.fields.get("ttt_heat_probe_cold"),
            row.fields.get("ttt_heat_probe_hot"),
        ) else {
            continue;
        };
        deltas_cold.push((hc - rc).abs());
        deltas_hot.push((hh - rh).abs());
    }
    if deltas_cold.len() < 2 || deltas_hot.len() < 2 {
        debug!("insufficient temperature data: {} rows", deltas_cold.len());
        return None;
    }

    Some(TemperatureBaseline {
        stdev_delta_cold: stdev(&deltas_cold),
        stdev_delta_hot: stdev(&deltas_hot),
    })
}

pub struct Aggregator {
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn ObservationStore>,
}

impl Aggregator {
    pub fn new(bus: Arc<dyn MessageBus>, store: Arc<dyn ObservationStore>) -> Self {
        Self { bus, store }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("aggregator running, {AGGREGATION_INTERVAL}s cadence");
        let mut ticker = tokio::time::interval(Duration::from_secs(AGGREGATION_INTERVAL));
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One aggregation round; publishes whatever could be computed.
    pub async fn tick(&self) {
        let now = canopy_types::unix_now();

        match aggregate_movement(self.store.as_ref(), now, ANALYSIS_TIME_SHORT).await {
            Some(baseline) => {
                debug!("publishing movement baseline: {baseline:?}");
                self.publish(topic::GLOBAL_MOVEMENT, &baseline).await;
            }
            None => debug!("no movement baseline this round"),
        }

        match aggregate_temperature(self.store.as_ref(), now, ANALYSIS_TIME_SHORT).await {
            Some(baseline) => {
                debug!("publishing temperature baseline: {baseline:?}");
                self.publish(topic::GLOBAL_TEMPERATURE, &baseline).await;
            }
            None => debug!("no temperature baseline this round"),
        }
    }

    async fn publish<T: serde::Serialize>(&self, topic: &str, value: &T) {
        let payload = match serde_json::to_vec(value) {
            Ok(p) => p,
            Err(e) => {
                warn!("baseline serialization failed: {e}");
                return;
            }
        };
        if let Err(e) = self.bus.publish(topic, &payload).await {
            warn!("baseline publish failed on {topic}: {e}");
        }
    }
}
