//! JSON schemas for the non-packet bus topics.
//!
//! Packet-carrying topics (`receive/…`, `command/…`, `anomaly/…`, `sniffer/…`)
//! move base64 of the marshalled wire bytes instead; these structs cover the
//! coordination and baseline topics only.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// `helo/request`: a gateway claiming a talker that just announced itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeloRequest {
    pub cloud_address: Address,
    pub tt_address: Address,
}

/// `helo/response/<gateway>`: the coordinator's verdict on a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeloResponse {
    pub tt_address: Address,
    pub connect: bool,
}

/// `global/movement`: fleet-wide gravity-derivative statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementBaseline {
    pub mean_x: f64,
    pub stdev_x: f64,
    pub mean_y: f64,
    pub stdev_y: f64,
    pub mean_z: f64,
    pub stdev_z: f64,
}

/// `global/temperature`: fleet-wide spread of the probe delta series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBaseline {
    pub stdev_delta_cold: f64,
    pub stdev_delta_hot: f64,
}
