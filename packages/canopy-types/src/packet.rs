//! Binary wire codec for talker radio packets.
//!
//! Every packet starts with a 9-byte header (receiver address u32,
//! sender address u32, type tag u8) followed by a fixed-size payload
//! selected by the tag. All multi-byte fields are little-endian on the wire
//! regardless of host order; the accessors here are the `_le` variants
//! exclusively.
//!
//! Decoding is exact: a payload that is shorter *or* longer than the tag's
//! fixed size is rejected, and an unknown tag is an error, never silently
//! accepted. `unmarshall(marshall(p)) == p` for every packet value, and
//! `marshall(unmarshall(b)) == b` for every valid buffer.

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::address::Address;

/// Header bytes: receiver (4) + sender (4) + tag (1).
pub const HEADER_LEN: usize = 9;

/// Radio frames carry this preamble ahead of the marshalled packet.
pub const FRAME_PREAMBLE: [u8; 4] = [0xFF, 0xFF, 0x00, 0x00];

/// Center wavelengths (nm) of the near-infrared spectrometer bank.
pub const AS7263_WAVELENGTHS: [u16; 6] = [610, 680, 730, 760, 810, 860];
/// Center wavelengths (nm) of the visible-light spectrometer bank.
pub const AS7262_WAVELENGTHS: [u16; 6] = [450, 500, 550, 570, 600, 650];

pub const TAG_HELO: u8 = 5;
pub const TAG_CLOUD_HELO: u8 = 65;
pub const TAG_COMMAND1: u8 = 66;
pub const TAG_DATA_REV_3_1: u8 = 69;
pub const TAG_LIGHT: u8 = 73;
pub const TAG_COMMAND2: u8 = 74;
pub const TAG_DATA_REV_3_2: u8 = 77;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Frame shorter than the packet header.
    #[error("frame too short for packet header: {got} bytes, need {HEADER_LEN}")]
    Truncated { got: usize },
    /// Payload length does not match the tag's fixed size (short or long).
    #[error("tag {tag:#04x} carries a {expected}-byte payload, got {got}")]
    PayloadSize { tag: u8, expected: usize, got: usize },
    #[error("unknown packet tag {0:#04x}")]
    UnknownTag(u8),
}

// ── Packet variants ───────────────────────────────────────────────────────────

/// Power-up announcement, talker → multicast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Helo {
    pub receiver: Address,
    pub sender: Address,
    pub number: u8,
}

/// Gateway's acceptance reply to a Helo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloudHelo {
    pub receiver: Address,
    pub sender: Address,
    pub command: u8,
    /// Gateway wall clock, seconds; talkers sync to it.
    pub time: u32,
}

/// Reply to a data packet: sleep schedule, heating pulse and TDMA slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command1 {
    pub receiver: Address,
    pub sender: Address,
    pub command: u8,
    pub time: u32,
    /// Seconds until the talker's next measurement cycle.
    pub sleep_interval: u16,
    /// Unused on current firmware; echoed verbatim.
    pub reserved: u16,
    /// Stem-heating pulse duration, seconds.
    pub heating: u16,
    pub time_slot_length: u8,
    /// Assigned TDMA slot, 0 while unassigned.
    pub time_slot: u8,
}

/// Reply to a light packet: spectrometer gain and integration settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command2 {
    pub receiver: Address,
    pub sender: Address,
    pub command: u8,
    pub time: u32,
    pub integration_time: u8,
    pub gain: u8,
}

/// Measurement report from revision 3.1 hardware.
///
/// Carries one reading per probe pair (no cold/hot split) and a single raw
/// battery voltage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRev31 {
    pub receiver: Address,
    pub sender: Address,
    pub number: u8,
    pub time: u32,
    pub temperature_reference: u32,
    pub temperature_heat: u32,
    pub growth_sensor: u16,
    pub adc_bandgap: u16,
    pub number_of_bits: u8,
    pub air_relative_humidity: u8,
    /// Tenths of a degree Celsius.
    pub air_temperature: i16,
    pub gravity_z_mean: i16,
    pub gravity_z_derivation: i16,
    pub gravity_y_mean: i16,
    pub gravity_y_derivation: i16,
    pub gravity_x_mean: i16,
    pub gravity_x_derivation: i16,
    /// Stem water content counter (StWC); passed through verbatim.
    pub stwc: u16,
    pub adc_volt_bat: u32,
}

/// Measurement report from revision 3.2 hardware.
///
/// Positionally close to revision 3.1 but the probe temperatures come as
/// cold/hot pairs and the battery as an (ADC, bandgap) pair. The hot halves
/// sit *after* the gravity block on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRev32 {
    pub receiver: Address,
    pub sender: Address,
    pub number: u8,
    pub time: u32,
    pub temperature_reference_cold: u32,
    pub temperature_reference_hot: u32,
    pub temperature_heat_cold: u32,
    pub temperature_heat_hot: u32,
    pub growth_sensor: u32,
    pub adc_bandgap: u32,
    pub number_of_bits: u8,
    pub air_relative_humidity: u8,
    /// Tenths of a degree Celsius.
    pub air_temperature: i16,
    pub gravity_z_mean: i16,
    pub gravity_z_derivation: i16,
    pub gravity_y_mean: i16,
    pub gravity_y_derivation: i16,
    pub gravity_x_mean: i16,
    pub gravity_x_derivation: i16,
    /// Stem water content counter (StWC); passed through verbatim.
    pub stwc: u16,
    pub adc_volt_bat: u32,
}

/// Two-bank spectrometer report; six 32-bit floats per bank, in the order of
/// [`AS7263_WAVELENGTHS`] / [`AS7262_WAVELENGTHS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub receiver: Address,
    pub sender: Address,
    pub number: u8,
    pub time: u32,
    pub as7263: [f32; 6],
    pub as7262: [f32; 6],
    pub integration_time: u8,
    pub gain: u8,
}

/// Tagged union over the seven wire packet kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Packet {
    Helo(Helo),
    CloudHelo(CloudHelo),
    Command1(Command1),
    Command2(Command2),
    DataRev31(DataRev31),
    DataRev32(DataRev32),
    Light(Light),
}

impl Packet {
    pub fn tag(&self) -> u8 {
        match self {
            Packet::Helo(_) => TAG_HELO,
            Packet::CloudHelo(_) => TAG_CLOUD_HELO,
            Packet::Command1(_) => TAG_COMMAND1,
            Packet::Command2(_) => TAG_COMMAND2,
            Packet::DataRev31(_) => TAG_DATA_REV_3_1,
            Packet::DataRev32(_) => TAG_DATA_REV_3_2,
            Packet::Light(_) => TAG_LIGHT,
        }
    }

    pub fn receiver(&self) -> Address {
        match self {
            Packet::Helo(p) => p.receiver,
            Packet::CloudHelo(p) => p.receiver,
            Packet::Command1(p) => p.receiver,
            Packet::Command2(p) => p.receiver,
            Packet::DataRev31(p) => p.receiver,
            Packet::DataRev32(p) => p.receiver,
            Packet::Light(p) => p.receiver,
        }
    }

    pub fn sender(&self) -> Address {
        match self {
            Packet::Helo(p) => p.sender,
            Packet::CloudHelo(p) => p.sender,
            Packet::Command1(p) => p.sender,
            Packet::Command2(p) => p.sender,
            Packet::DataRev31(p) => p.sender,
            Packet::DataRev32(p) => p.sender,
            Packet::Light(p) => p.sender,
        }
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Helo(_) => "helo",
            Packet::CloudHelo(_) => "cloud-helo",
            Packet::Command1(_) => "command1",
            Packet::Command2(_) => "command2",
            Packet::DataRev31(_) => "data-rev3.1",
            Packet::DataRev32(_) => "data-rev3.2",
            Packet::Light(_) => "light",
        }
    }

    /// Encode to wire bytes, header first. Total length is fixed per tag.
    pub fn marshall(&self) -> Vec<u8> {
        let tag = self.tag();
        let mut buf = Vec::with_capacity(HEADER_LEN + payload_len(tag));
        buf.put_u32_le(self.receiver().value());
        buf.put_u32_le(self.sender().value());
        buf.put_u8(tag);
        match self {
            Packet::Helo(p) => {
                buf.put_u8(p.number);
            }
            Packet::CloudHelo(p) => {
                buf.put_u8(p.command);
                buf.put_u32_le(p.time);
            }
            Packet::Command1(p) => {
                buf.put_u8(p.command);
                buf.put_u32_le(p.time);
                buf.put_u16_le(p.sleep_interval);
                buf.put_u16_le(p.reserved);
                buf.put_u16_le(p.heating);
                buf.put_u8(p.time_slot_length);
                buf.put_u8(p.time_slot);
            }
            Packet::Command2(p) => {
                buf.put_u8(p.command);
                buf.put_u32_le(p.time);
                buf.put_u8(p.integration_time);
                buf.put_u8(p.gain);
            }
            Packet::DataRev31(p) => {
                buf.put_u8(p.number);
                buf.put_u32_le(p.time);
                buf.put_u32_le(p.temperature_reference);
                buf.put_u32_le(p.temperature_heat);
                buf.put_u16_le(p.growth_sensor);
                buf.put_u16_le(p.adc_bandgap);
                buf.put_u8(p.number_of_bits);
                buf.put_u8(p.air_relative_humidity);
                buf.put_i16_le(p.air_temperature);
                buf.put_i16_le(p.gravity_z_mean);
                buf.put_i16_le(p.gravity_z_derivation);
                buf.put_i16_le(p.gravity_y_mean);
                buf.put_i16_le(p.gravity_y_derivation);
                buf.put_i16_le(p.gravity_x_mean);
                buf.put_i16_le(p.gravity_x_derivation);
                buf.put_u16_le(p.stwc);
                buf.put_u32_le(p.adc_volt_bat);
            }
            Packet::DataRev32(p) => {
                buf.put_u8(p.number);
                buf.put_u32_le(p.time);
                buf.put_u32_le(p.temperature_reference_cold);
                buf.put_u32_le(p.temperature_heat_cold);
                buf.put_u32_le(p.growth_sensor);
                buf.put_u32_le(p.adc_bandgap);
                buf.put_u8(p.number_of_bits);
                buf.put_u8(p.air_relative_humidity);
                buf.put_i16_le(p.air_temperature);
                buf.put_i16_le(p.gravity_z_mean);
                buf.put_i16_le(p.gravity_z_derivation);
                buf.put_i16_le(p.gravity_y_mean);
                buf.put_i16_le(p.gravity_y_derivation);
                buf.put_i16_le(p.gravity_x_mean);
                buf.put_i16_le(p.gravity_x_derivation);
                buf.put_u32_le(p.temperature_reference_hot);
                buf.put_u32_le(p.temperature_heat_hot);
                buf.put_u16_le(p.stwc);
                buf.put_u32_le(p.adc_volt_bat);
            }
            Packet::Light(p) => {
                buf.put_u8(p.number);
                buf.put_u32_le(p.time);
                for v in p.as7263 {
                    buf.put_f32_le(v);
                }
                for v in p.as7262 {
                    buf.put_f32_le(v);
                }
                buf.put_u8(p.integration_time);
                buf.put_u8(p.gain);
            }
        }
        buf
    }
}

/// Fixed payload size for a known tag.
fn payload_len(tag: u8) -> usize {
    match tag {
        TAG_HELO => 1,
        TAG_CLOUD_HELO => 5,
        TAG_COMMAND1 => 13,
        TAG_COMMAND2 => 7,
        TAG_DATA_REV_3_1 => 39,
        TAG_DATA_REV_3_2 => 51,
        TAG_LIGHT => 55,
        _ => 0,
    }
}

/// Decode one wire frame (preamble already stripped).
pub fn unmarshall(raw: &[u8]) -> Result<Packet, DecodeError> {
    if raw.len() < HEADER_LEN {
        return Err(DecodeError::Truncated { got: raw.len() });
    }
    let mut buf = raw;
    let receiver = Address(buf.get_u32_le());
    let sender = Address(buf.get_u32_le());
    let tag = buf.get_u8();

    let expected = match tag {
        TAG_HELO | TAG_CLOUD_HELO | TAG_COMMAND1 | TAG_COMMAND2 | TAG_DATA_REV_3_1
        | TAG_DATA_REV_3_2 | TAG_LIGHT => payload_len(tag),
        other => return Err(DecodeError::UnknownTag(other)),
    };
    if buf.remaining() != expected {
        return Err(DecodeError::PayloadSize { tag, expected, got: buf.remaining() });
    }

    let packet = match tag {
        TAG_HELO => Packet::Helo(Helo { receiver, sender, number: buf.get_u8() }),
        TAG_CLOUD_HELO => Packet::CloudHelo(CloudHelo {
            receiver,
            sender,
            command: buf.get_u8(),
            time: buf.get_u32_le(),
        }),
        TAG_COMMAND1 => Packet::Command1(Command1 {
            receiver,
            sender,
            command: buf.get_u8(),
            time: buf.get_u32_le(),
            sleep_interval: buf.get_u16_le(),
            reserved: buf.get_u16_le(),
            heating: buf.get_u16_le(),
            time_slot_length: buf.get_u8(),
            time_slot: buf.get_u8(),
        }),
        TAG_COMMAND2 => Packet::Command2(Command2 {
            receiver,
            sender,
            command: buf.get_u8(),
            time: buf.get_u32_le(),
            integration_time: buf.get_u8(),
            gain: buf.get_u8(),
        }),
        TAG_DATA_REV_3_1 => {
            let number = buf.get_u8();
            let time = buf.get_u32_le();
            let temperature_reference = buf.get_u32_le();
            let temperature_heat = buf.get_u32_le();
            let growth_sensor = buf.get_u16_le();
            let adc_bandgap = buf.get_u16_le();
            let number_of_bits = buf.get_u8();
            let air_relative_humidity = buf.get_u8();
            let air_temperature = buf.get_i16_le();
            let gravity_z_mean = buf.get_i16_le();
            let gravity_z_derivation = buf.get_i16_le();
            let gravity_y_mean = buf.get_i16_le();
            let gravity_y_derivation = buf.get_i16_le();
            let gravity_x_mean = buf.get_i16_le();
            let gravity_x_derivation = buf.get_i16_le();
            let stwc = buf.get_u16_le();
            let adc_volt_bat = buf.get_u32_le();
            Packet::DataRev31(DataRev31 {
                receiver,
                sender,
                number,
                time,
                temperature_reference,
                temperature_heat,
                growth_sensor,
                adc_bandgap,
                number_of_bits,
                air_relative_humidity,
                air_temperature,
                gravity_z_mean,
                gravity_z_derivation,
                gravity_y_mean,
                gravity_y_derivation,
                gravity_x_mean,
                gravity_x_derivation,
                stwc,
                adc_volt_bat,
            })
        }
        TAG_DATA_REV_3_2 => {
            let number = buf.get_u8();
            let time = buf.get_u32_le();
            let temperature_reference_cold = buf.get_u32_le();
            let temperature_heat_cold = buf.get_u32_le();
            let growth_sensor = buf.get_u32_le();
            let adc_bandgap = buf.get_u32_le();
            let number_of_bits = buf.get_u8();
            let air_relative_humidity = buf.get_u8();
            let air_temperature = buf.get_i16_le();
            let gravity_z_mean = buf.get_i16_le();
            let gravity_z_derivation = buf.get_i16_le();
            let gravity_y_mean = buf.get_i16_le();
            let gravity_y_derivation = buf.get_i16_le();
            let gravity_x_mean = buf.get_i16_le();
            let gravity_x_derivation = buf.get_i16_le();
            let temperature_reference_hot = buf.get_u32_le();
            let temperature_heat_hot = buf.get_u32_le();
            let stwc = buf.get_u16_le();
            let adc_volt_bat = buf.get_u32_le();
            Packet::DataRev32(DataRev32 {
                receiver,
                sender,
                number,
                time,
                temperature_reference_cold,
                temperature_reference_hot,
                temperature_heat_cold,
                temperature_heat_hot,
                growth_sensor,
                adc_bandgap,
                number_of_bits,
                air_relative_humidity,
                air_temperature,
                gravity_z_mean,
                gravity_z_derivation,
                gravity_y_mean,
                gravity_y_derivation,
                gravity_x_mean,
                gravity_x_derivation,
                stwc,
                adc_volt_bat,
            })
        }
        TAG_LIGHT => {
            let number = buf.get_u8();
            let time = buf.get_u32_le();
            let mut as7263 = [0f32; 6];
            for v in as7263.iter_mut() {
                *v = buf.get_f32_le();
            }
            let mut as7262 = [0f32; 6];
            for v in as7262.iter_mut() {
                *v = buf.get_f32_le();
            }
            Packet::Light(Light {
                receiver,
                sender,
                number,
                time,
                as7263,
                as7262,
                integration_time: buf.get_u8(),
                gain: buf.get_u8(),
            })
        }
        _ => unreachable!("tag validated above"),
    };
    Ok(packet)
}
