//! # canopy-types
//!
//! Shared wire types for the canopy gateway suite.
//!
//! These types are used by:
//! - `gateway`: decoding talker packets, composing replies, expanding packets
//!   into time-series observation rows
//! - `canopy-sim`: producing talker packets against a live bus
//! - the offline analyser and capture tooling, which replay the same codec
//!   over recorded traffic
//!
//! ## Wire format
//!
//! Packets travel base64-encoded on the bus and preamble-framed
//! (`FF FF 00 00`) on the radio. Every multi-byte field is little-endian,
//! hard-coded, regardless of host order. Round-trip is byte-exact both ways:
//! decode∘encode and encode∘decode are identities on valid inputs.

pub mod address;
pub mod calib;
pub mod message;
pub mod observation;
pub mod packet;
pub mod topic;

pub use address::Address;
pub use message::{HeloRequest, HeloResponse, MovementBaseline, TemperatureBaseline};
pub use observation::Observation;
pub use packet::{
    unmarshall, CloudHelo, Command1, Command2, DataRev31, DataRev32, DecodeError, Helo, Light,
    Packet, FRAME_PREAMBLE,
};

/// Wall-clock seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
