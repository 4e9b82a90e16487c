//! # policy
//!
//! Decision policies over live packets and windowed history. The decision
//! engine runs them per packet; the offline analyser runs the same functions
//! over recorded traffic with a second, longer window.
//!
//! All thresholds are fixed at design time. Every evaluation degrades
//! gracefully: a failed or empty history query means "no anomaly" (or, for
//! the sleep regression, "keep the previous interval") and never aborts the
//! packet.

use canopy_types::observation::measurement;
use canopy_types::{
    Address, Command1, Command2, DataRev31, DataRev32, Light, MovementBaseline,
    TemperatureBaseline,
};
use tracing::{debug, warn};

use crate::stats::{linear_fit, mean, stdev};
use crate::store::{ObservationStore, SeriesQuery, StoredRow};

/// Gain of the sleep-interval control loop.
pub const RDE: f64 = 1.0;
/// Multiplier on stdev in every 3-sigma anomaly rule.
pub const CONFIDENCE: f64 = 3.0;
/// Floor for any emitted sleep interval, seconds.
pub const SLEEP_TIME_MIN: u16 = 300;
/// Regression seed before a talker has any decided interval.
pub const SLEEP_TIME_DEFAULT: u16 = 600;
/// Slot length handed out in every data reply, seconds.
pub const TIME_SLOT_LENGTH: u8 = 60;
/// Raw air reading at or above this is critical (tenths of °C).
pub const CRITICAL_AIR_TEMPERATURE: i16 = 500;
/// Short analysis window: 2 days.
pub const ANALYSIS_TIME_SHORT: i64 = 172_800;
/// Long analysis window (offline critical scan): 7 days.
pub const ANALYSIS_TIME_LONG: i64 = 604_800;
/// Target battery voltage of the control loop, millivolts.
pub const TARGET_VOLTAGE: f64 = 3700.0;
/// Regression horizon: predict the battery 48 h out.
pub const PREDICTION_HORIZON: i64 = 48 * 3600;

pub const DATA_COMMAND: u8 = 32;
pub const LIGHT_COMMAND: u8 = 33;
pub const CONNECT_COMMAND: u8 = 190;
pub const LIGHT_INTEGRATION_TIME: u8 = 50;
pub const LIGHT_GAIN: u8 = 3;

/// Spectral weights for the near-infrared bank, biased toward the infrared
/// end where a fire signature shows first.
pub const RED_SCALARS: [f64; 6] = [0.4, 0.5, 1.0, 2.0, 3.0, 5.0];
/// The visible bank is weighted uniformly.
pub const BLUE_SCALARS: [f64; 6] = [1.0; 6];

/// The anomaly classes a packet can trip. The name doubles as the
/// `anomaly/<kind>/<gateway>` topic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    Position,
    Movement,
    StemTemperature,
    AirTemperature,
    Brightness,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::Position => "position",
            AnomalyKind::Movement => "movement",
            AnomalyKind::StemTemperature => "stem_temperature",
            AnomalyKind::AirTemperature => "air_temperature",
            AnomalyKind::Brightness => "brightness",
        }
    }
}

/// Fleet baselines as last seen from the aggregator. Absent until the first
/// publish; policies degrade to "no anomaly" without them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Baselines {
    pub movement: Option<MovementBaseline>,
    pub temperature: Option<TemperatureBaseline>,
}

/// Normalized view over the two data revisions: calibrated probe
/// temperatures, battery millivolts, gravity triples.
#[derive(Debug, Clone, Copy)]
pub struct DataReading {
    pub talker: Address,
    pub battery_millivolts: f64,
    pub probes: StemProbes,
    pub gravity_mean: [f64; 3],
    pub gravity_derivation: [f64; 3],
    pub air_temperature: i16,
}

/// Probe temperatures in °C after calibration.
#[derive(Debug, Clone, Copy)]
pub struct StemProbes {
    pub reference_cold: f64,
    pub reference_hot: f64,
    pub heat_cold: f64,
    pub heat_hot: f64,
}

impl StemProbes {
    pub fn delta_cold(&self) -> f64 {
        (self.heat_cold - self.reference_cold).abs()
    }

    pub fn delta_hot(&self) -> f64 {
        (self.heat_hot - self.reference_hot).abs()
    }
}

impl From<&DataRev32> for DataReading {
    fn from(p: &DataRev32) -> Self {
        use canopy_types::calib::compute_temperature;
        DataReading {
            talker: p.sender,
            battery_millivolts: p.battery_millivolts(),
            probes: StemProbes {
                reference_cold: compute_temperature(p.temperature_reference_cold),
                reference_hot: compute_temperature(p.temperature_reference_hot),
                heat_cold: compute_temperature(p.temperature_heat_cold),
                heat_hot: compute_temperature(p.temperature_heat_hot),
            },
            gravity_mean: [p.gravity_x_mean as f64, p.gravity_y_mean as f64, p.gravity_z_mean as f64],
            gravity_derivation: [
                p.gravity_x_derivation as f64,
                p.gravity_y_derivation as f64,
                p.gravity_z_derivation as f64,
            ],
            air_temperature: p.air_temperature,
        }
    }
}

impl From<&DataRev31> for DataReading {
    fn from(p: &DataRev31) -> Self {
        use canopy_types::calib::compute_temperature;
        let reference = compute_temperature(p.temperature_reference);
        let heat = compute_temperature(p.temperature_heat);
        DataReading {
            talker: p.sender,
            battery_millivolts: p.battery_millivolts(),
            probes: StemProbes {
                reference_cold: reference,
                reference_hot: reference,
                heat_cold: heat,
                heat_hot: heat,
            },
            gravity_mean: [p.gravity_x_mean as f64, p.gravity_y_mean as f64, p.gravity_z_mean as f64],
            gravity_derivation: [
                p.gravity_x_derivation as f64,
                p.gravity_y_derivation as f64,
                p.gravity_z_derivation as f64,
            ],
            air_temperature: p.air_temperature,
        }
    }
}

// ── Series helpers ────────────────────────────────────────────────────────────

/// Run a query, degrading a store failure to an empty history.
async fn series(store: &dyn ObservationStore, q: SeriesQuery) -> Vec<StoredRow> {
    match store.query(q).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("store query failed ({}, treating as empty): {e}", q.measurement);
            Vec::new()
        }
    }
}

fn column(rows: &[StoredRow], field: &str) -> Vec<f64> {
    rows.iter().filter_map(|r| r.fields.get(field).copied()).collect()
}

// ── Battery / sleep regression ────────────────────────────────────────────────

/// Fit the talker's recent voltage trend, extrapolate 48 h, and nudge the
/// sleep interval toward holding 3700 mV:
/// `sleep = last + RDE · (3700 − v(now + 48 h))`, floored at
/// [`SLEEP_TIME_MIN`]. An empty history keeps the previous interval.
pub async fn evaluate_battery(
    store: &dyn ObservationStore,
    talker: Address,
    battery_millivolts: f64,
    last_sleep: u16,
    now: i64,
) -> u16 {
    if !battery_millivolts.is_finite() {
        warn!("{talker}: implausible battery reading, keeping sleep {last_sleep}");
        return last_sleep.max(SLEEP_TIME_MIN);
    }

    let rows = series(
        store,
        SeriesQuery {
            measurement: measurement::POWER,
            talker: Some(talker),
            since: now - ANALYSIS_TIME_SHORT,
            until: now,
        },
    )
    .await;

    let mut points: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| r.fields.get("ttt_voltage").map(|v| (r.time as f64, *v)))
        .collect();
    if points.is_empty() {
        debug!("{talker}: no voltage history, keeping sleep {last_sleep}");
        return last_sleep.max(SLEEP_TIME_MIN);
    }
    points.push((now as f64, battery_millivolts));

    let fit = linear_fit(&points);
    let predicted = fit.predict((now + PREDICTION_HORIZON) as f64);
    let sleep = last_sleep as f64 + RDE * (TARGET_VOLTAGE - predicted);
    let sleep = sleep.clamp(SLEEP_TIME_MIN as f64, u16::MAX as f64) as u16;
    debug!(
        "{talker}: voltage {battery_millivolts:.0} mV, predicted {predicted:.0} mV, sleep {last_sleep} → {sleep}"
    );
    sleep
}

// ── Gravity: position and movement ────────────────────────────────────────────

/// Position anomaly: the packet's gravity means against the talker's own
/// windowed history, 3-sigma per axis. Needs at least two points on every
/// axis.
pub async fn evaluate_position(
    store: &dyn ObservationStore,
    reading: &DataReading,
    at: i64,
    window: i64,
) -> bool {
    let rows = series(
        store,
        SeriesQuery {
            measurement: measurement::GRAVITY,
            talker: Some(reading.talker),
            since: at - window,
            until: at,
        },
    )
    .await;

    let axes = ["x_mean", "y_mean", "z_mean"];
    let mut history: [Vec<f64>; 3] = Default::default();
    for (i, field) in axes.iter().enumerate() {
        history[i] = column(&rows, field);
        if history[i].len() < 2 {
            debug!("{}: axis {field} has {} points, skipping position check", reading.talker, history[i].len());
            return false;
        }
    }

    history.iter().zip(reading.gravity_mean).any(|(axis, current)| {
        (current - mean(axis)).abs() > stdev(axis) * CONFIDENCE
    })
}

/// Movement anomaly: the packet's gravity derivatives against the fleet
/// baseline, 3-sigma per axis. No baseline yet means no anomaly.
pub fn evaluate_movement(reading: &DataReading, baseline: Option<&MovementBaseline>) -> bool {
    let Some(b) = baseline else {
        debug!("no movement baseline yet");
        return false;
    };
    let [x, y, z] = reading.gravity_derivation;
    (x - b.mean_x).abs() > b.stdev_x * CONFIDENCE
        || (y - b.mean_y).abs() > b.stdev_y * CONFIDENCE
        || (z - b.mean_z).abs() > b.stdev_z * CONFIDENCE
}

// ── Stem temperature ──────────────────────────────────────────────────────────

/// Stem-temperature anomaly: current probe deltas against the talker's
/// historical mean delta, scaled by the fleet's delta stdev. Needs both a
/// history and a baseline.
pub async fn evaluate_stem_temperature(
    store: &dyn ObservationStore,
    reading: &DataReading,
    baseline: Option<&TemperatureBaseline>,
    at: i64,
    window: i64,
) -> bool {
    let Some(b) = baseline else {
        debug!("no temperature baseline yet");
        return false;
    };

    let rows = series(
        store,
        SeriesQuery {
            measurement: measurement::STEM_TEMPERATURE,
            talker: Some(reading.talker),
            since: at - window,
            until: at,
        },
    )
    .await;

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
    if deltas_cold.is_empty() {
        debug!("{}: no stem-temperature history", reading.talker);
        return false;
    }

    let mean_cold = mean(&deltas_cold);
    let mean_hot = mean(&deltas_hot);
    (reading.probes.delta_cold() - mean_cold).abs() > b.stdev_delta_cold * CONFIDENCE
        || (reading.probes.delta_hot() - mean_hot).abs() > b.stdev_delta_hot * CONFIDENCE
}

// ── Air temperature ───────────────────────────────────────────────────────────

/// Critical heat: raw air reading at or above 50.0 °C.
pub fn evaluate_air_temperature(reading: &DataReading) -> bool {
    reading.air_temperature >= CRITICAL_AIR_TEMPERATURE
}

// ── Composed scans ────────────────────────────────────────────────────────────

/// The history-based anomaly set (position, movement, stem temperature) for
/// one window. The live engine adds [`evaluate_air_temperature`] on top; the
/// offline critical scan runs this with the long window.
pub async fn scan_anomalies(
    store: &dyn ObservationStore,
    reading: &DataReading,
    baselines: &Baselines,
    at: i64,
    window: i64,
) -> Vec<AnomalyKind> {
    let mut kinds = Vec::new();
    if evaluate_position(store, reading, at, window).await {
        kinds.push(AnomalyKind::Position);
    }
    if evaluate_movement(reading, baselines.movement.as_ref()) {
        kinds.push(AnomalyKind::Movement);
    }
    if evaluate_stem_temperature(store, reading, baselines.temperature.as_ref(), at, window).await {
        kinds.push(AnomalyKind::StemTemperature);
    }
    kinds
}

// ── Light / brightness ────────────────────────────────────────────────────────

/// Weighted scalar brightness of one spectrometer bank.
pub fn scaled_brightness(values: &[f64], scalars: &[f64; 6]) -> f64 {
    values.iter().zip(scalars).map(|(v, s)| v * s).sum::<f64>() / 6.0
}

/// Brightness anomaly: either bank's scaled value against the talker's
/// windowed history, 3-sigma. The flag does not alter the reply; it is
/// logged and published for observers.
pub async fn evaluate_brightness(
    store: &dyn ObservationStore,
    packet: &Light,
    at: i64,
    window: i64,
) -> bool {
    use canopy_types::packet::{AS7262_WAVELENGTHS, AS7263_WAVELENGTHS};

    let current_red = scaled_brightness(
        &packet.as7263.iter().map(|v| *v as f64).collect::<Vec<_>>(),
        &RED_SCALARS,
    );
    let current_blue = scaled_brightness(
        &packet.as7262.iter().map(|v| *v as f64).collect::<Vec<_>>(),
        &BLUE_SCALARS,
    );

    let bank_history = |rows: &[StoredRow], wavelengths: &[u16; 6], scalars: &[f64; 6]| {
        rows.iter()
            .filter_map(|row| {
                let values: Option<Vec<f64>> = wavelengths
                    .iter()
                    .map(|wl| row.fields.get(&wl.to_string()).copied())
                    .collect();
                values.map(|v| scaled_brightness(&v, scalars))
            })
            .collect::<Vec<f64>>()
    };

    let red_rows = series(
        store,
        SeriesQuery {
            measurement: measurement::AS7263,
            talker: Some(packet.sender),
            since: at - window,
            until: at,
        },
    )
    .await;
    let blue_rows = series(
        store,
        SeriesQuery {
            measurement: measurement::AS7262,
            talker: Some(packet.sender),
            since: at - window,
            until: at,
        },
    )
    .await;

    let red = bank_history(&red_rows, &AS7263_WAVELENGTHS, &RED_SCALARS);
    let blue = bank_history(&blue_rows, &AS7262_WAVELENGTHS, &BLUE_SCALARS);
    if red.is_empty() || blue.is_empty() {
        debug!("{}: no light history", packet.sender);
        return false;
    }

    (current_blue - mean(&blue)).abs() > stdev(&blue) * CONFIDENCE
        || (current_red - mean(&red)).abs() > stdev(&red) * CONFIDENCE
}

// ── Reply composition ─────────────────────────────────────────────────────────

/// Reply to a data packet. `heating` is always an even sixth of the sleep
/// interval; the slot is whatever the gateway has on file (0 = unassigned).
pub fn data_reply(own: Address, talker: Address, sleep: u16, slot: u8, now: i64) -> Command1 {
    Command1 {
        receiver: talker,
        sender: own,
        command: DATA_COMMAND,
        time: now as u32,
        sleep_interval: sleep,
        reserved: 0,
        heating: sleep / 6,
        time_slot_length: TIME_SLOT_LENGTH,
        time_slot: slot,
    }
}

/// Reply to a light packet. Fixed spectrometer settings on current firmware.
pub fn light_reply(own: Address, talker: Address, now: i64) -> Command2 {
    Command2 {
        receiver: talker,
        sender: own,
        command: LIGHT_COMMAND,
        time: now as u32,
        integration_time: LIGHT_INTEGRATION_TIME,
        gain: LIGHT_GAIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use canopy_types::Observation;
    use std::sync::Arc;

    const NOW: i64 = 1_700_000_000;
    const TALKER: Address = Address(0x5201_0352);

    fn gravity_row(x: f64, y: f64, z: f64) -> Observation {
        Observation {
            measurement: measurement::GRAVITY,
            talker: TALKER,
            tags: vec![],
            fields: vec![("x_mean", x), ("y_mean", y), ("z_mean", z)],
        }
    }

    fn voltage_row(v: f64) -> Observation {
        Observation {
            measurement: measurement::POWER,
            talker: TALKER,
            tags: vec![],
            fields: vec![("ttt_voltage", v)],
        }
    }

    fn reading() -> DataReading {
        DataReading {
            talker: TALKER,
            battery_millivolts: 3700.0,
            probes: StemProbes {
                reference_cold: 20.0,
                reference_hot: 20.0,
                heat_cold: 21.0,
                heat_hot: 21.0,
            },
            gravity_mean: [0.0, 4000.0, 60.0],
            gravity_derivation: [0.0, 0.0, 0.0],
            air_temperature: 220,
        }
    }

    #[tokio::test]
    async fn empty_history_keeps_the_previous_sleep() {
        let store = Arc::new(MemoryStore::new());
        let sleep = evaluate_battery(store.as_ref(), TALKER, 3700.0, SLEEP_TIME_DEFAULT, NOW).await;
        assert_eq!(sleep, SLEEP_TIME_DEFAULT);
    }

    #[tokio::test]
    async fn balanced_battery_holds_the_interval() {
        // Declining from 3800 mV two days ago to 3750 mV now extrapolates to
        // exactly 3700 mV at the 48 h horizon: zero correction.
        let store = MemoryStore::new();
        for i in 0..=8 {
            let t = NOW - ANALYSIS_TIME_SHORT + 1 + i * (ANALYSIS_TIME_SHORT / 8);
            let v = 3800.0 - 50.0 * (t - (NOW - ANALYSIS_TIME_SHORT)) as f64 / ANALYSIS_TIME_SHORT as f64;
            store.write(t, &[voltage_row(v)]).await.unwrap();
        }
        let sleep = evaluate_battery(&store, TALKER, 3750.0, 3600, NOW).await;
        assert!((3599..=3601).contains(&sleep), "sleep drifted to {sleep}");
    }

    #[tokio::test]
    async fn draining_battery_stretches_the_interval() {
        let store = MemoryStore::new();
        store.write(NOW - 86_400, &[voltage_row(3800.0)]).await.unwrap();
        let sleep = evaluate_battery(&store, TALKER, 3600.0, 600, NOW).await;
        // 200 mV over one day keeps falling; the 48 h prediction is far below
        // 3700, so the interval grows.
        assert!(sleep > 600, "sleep was {sleep}");
    }

    #[tokio::test]
    async fn sleep_never_drops_below_the_floor() {
        let store = MemoryStore::new();
        store.write(NOW - 86_400, &[voltage_row(3700.0)]).await.unwrap();
        // Overfull battery: the correction is strongly negative.
        let sleep = evaluate_battery(&store, TALKER, 4500.0, 600, NOW).await;
        assert_eq!(sleep, SLEEP_TIME_MIN);
    }

    #[tokio::test]
    async fn position_needs_two_points_per_axis() {
        let store = MemoryStore::new();
        store.write(NOW - 100, &[gravity_row(0.0, 4000.0, 60.0)]).await.unwrap();
        assert!(!evaluate_position(&store, &reading(), NOW, ANALYSIS_TIME_SHORT).await);
    }

    #[tokio::test]
    async fn zero_spread_history_flags_any_deviation() {
        let store = MemoryStore::new();
        store.write(NOW - 200, &[gravity_row(0.0, 4000.0, 60.0)]).await.unwrap();
        store.write(NOW - 100, &[gravity_row(0.0, 4000.0, 60.0)]).await.unwrap();

        let mut r = reading();
        assert!(!evaluate_position(&store, &r, NOW, ANALYSIS_TIME_SHORT).await);
        r.gravity_mean[2] = 61.0;
        assert!(evaluate_position(&store, &r, NOW, ANALYSIS_TIME_SHORT).await);
    }

    #[test]
    fn movement_without_baseline_is_silent() {
        let mut r = reading();
        r.gravity_derivation = [9_999.0, 9_999.0, 9_999.0];
        assert!(!evaluate_movement(&r, None));
    }

    #[test]
    fn movement_trips_three_sigma() {
        let baseline = MovementBaseline {
            mean_x: 0.0,
            stdev_x: 10.0,
            mean_y: 0.0,
            stdev_y: 10.0,
            mean_z: 0.0,
            stdev_z: 10.0,
        };
        let mut r = reading();
        r.gravity_derivation = [29.0, 0.0, 0.0];
        assert!(!evaluate_movement(&r, Some(&baseline)));
        r.gravity_derivation = [31.0, 0.0, 0.0];
        assert!(evaluate_movement(&r, Some(&baseline)));
    }

    #[tokio::test]
    async fn stem_temperature_needs_history_and_baseline() {
        let store = MemoryStore::new();
        let r = reading();
        let baseline = TemperatureBaseline { stdev_delta_cold: 0.1, stdev_delta_hot: 0.1 };
        assert!(!evaluate_stem_temperature(&store, &r, None, NOW, ANALYSIS_TIME_SHORT).await);
        assert!(
            !evaluate_stem_temperature(&store, &r, Some(&baseline), NOW, ANALYSIS_TIME_SHORT).await
        );
    }

    #[tokio::test]
    async fn stem_temperature_flags_a_runaway_delta() {
        let store = MemoryStore::new();
        let probe_row = Observation {
            measurement: measurement::STEM_TEMPERATURE,
            talker: TALKER,
            tags: vec![],
            fields: vec![
                ("ttt_reference_probe_cold", 20.0),
                ("ttt_reference_probe_hot", 20.0),
                ("ttt_heat_probe_cold", 21.0),
                ("ttt_heat_probe_hot", 21.0),
            ],
        };
        store.write(NOW - 200, &[probe_row.clone()]).await.unwrap();
        store.write(NOW - 100, &[probe_row]).await.unwrap();

        let baseline = TemperatureBaseline { stdev_delta_cold: 0.5, stdev_delta_hot: 0.5 };
        let mut r = reading();
        // Historical delta is 1.0 °C; ours matches.
        assert!(
            !evaluate_stem_temperature(&store, &r, Some(&baseline), NOW, ANALYSIS_TIME_SHORT).await
        );
        // A 4 °C delta sits 3 °C off the mean, past 3 × 0.5.
        r.probes.heat_cold = 24.0;
        assert!(
            evaluate_stem_temperature(&store, &r, Some(&baseline), NOW, ANALYSIS_TIME_SHORT).await
        );
    }

    #[test]
    fn air_temperature_critical_at_fifty_degrees() {
        let mut r = reading();
        r.air_temperature = 499;
        assert!(!evaluate_air_temperature(&r));
        r.air_temperature = 500;
        assert!(evaluate_air_temperature(&r));
        r.air_temperature = 600;
        assert!(evaluate_air_temperature(&r));
    }

    #[test]
    fn replies_compose_per_contract() {
        let own = Address(0xc203_0118);
        let reply = data_reply(own, TALKER, 300, 2, NOW);
        assert_eq!(reply.receiver, TALKER);
        assert_eq!(reply.sender, own);
        assert_eq!(reply.command, DATA_COMMAND);
        assert_eq!(reply.sleep_interval, 300);
        assert_eq!(reply.heating, 50);
        assert_eq!(reply.time_slot_length, TIME_SLOT_LENGTH);
        assert_eq!(reply.time_slot, 2);
        assert_eq!(reply.reserved, 0);

        let light = light_reply(own, TALKER, NOW);
        assert_eq!(light.command, LIGHT_COMMAND);
        assert_eq!(light.integration_time, 50);
        assert_eq!(light.gain, 3);
    }

    #[test]
    fn heating_is_floor_of_a_sixth() {
        for sleep in [300u16, 301, 305, 600, 3600] {
            let reply = data_reply(Address(1), TALKER, sleep, 0, NOW);
            assert_eq!(reply.heating, sleep / 6);
        }
    }

    #[test]
    fn brightness_weights_favour_infrared() {
        let flat = [10.0; 6];
        let red = scaled_brightness(&flat, &RED_SCALARS);
        let blue = scaled_brightness(&flat, &BLUE_SCALARS);
        assert!((blue - 10.0).abs() < 1e-9);
        assert!((red - 10.0 * (0.4 + 0.5 + 1.0 + 2.0 + 3.0 + 5.0) / 6.0).abs() < 1e-9);
    }
}
