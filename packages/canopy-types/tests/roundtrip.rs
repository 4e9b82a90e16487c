//! Codec round-trip tests against captured radio traffic.
//!
//! The hex buffers below are real frames recorded at a gateway (preamble
//! already stripped). Decode and re-encode must reproduce every byte.

use canopy_types::packet::{self, unmarshall, DecodeError, Packet};
use canopy_types::{Address, DataRev31};

const RAW_HELO: &str = "4a4a4a4a520103520502";
const RAW_CLOUD_HELO: &str = "52010352180103c241be52d84860";
const RAW_DATA_REV_3_2: &str = "180103c2520103524d014038000077850000fa8500006cb8000041aa0000111ee2003900ddfc920f000000000000788500000256000086c545430100";
const RAW_LIGHT: &str = "180103c252010352490240380000d10793414856da411448754256158f428151b34230d4b34245216742e5156842247e304244c42d42ea760f42d9e10b423203";
const RAW_COMMAND1: &str = "52010352180103c242188cd84860100e000058022d02";
const RAW_COMMAND2: &str = "52010352180103c24a5289e148603203";

fn all_samples() -> Vec<Vec<u8>> {
    [
        RAW_HELO,
        RAW_CLOUD_HELO,
        RAW_DATA_REV_3_2,
        RAW_LIGHT,
        RAW_COMMAND1,
        RAW_COMMAND2,
    ]
    .iter()
    .map(|s| hex::decode(s).unwrap())
    .collect()
}

#[test]
fn every_sample_survives_decode_then_encode() {
    for raw in all_samples() {
        let packet = unmarshall(&raw).unwrap();
        assert_eq!(packet.marshall(), raw, "byte mismatch for {}", packet.kind());
    }
}

#[test]
fn every_sample_survives_encode_then_decode() {
    for raw in all_samples() {
        let packet = unmarshall(&raw).unwrap();
        assert_eq!(unmarshall(&packet.marshall()).unwrap(), packet);
    }
}

#[test]
fn helo_fields() {
    let raw = hex::decode(RAW_HELO).unwrap();
    let Packet::Helo(p) = unmarshall(&raw).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(p.receiver, Address::MULTICAST);
    assert_eq!(p.sender, Address(0x5201_0352));
    assert_eq!(p.number, 2);
}

#[test]
fn cloud_helo_fields() {
    let raw = hex::decode(RAW_CLOUD_HELO).unwrap();
    let Packet::CloudHelo(p) = unmarshall(&raw).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(p.receiver, Address(0x5201_0352));
    assert_eq!(p.sender, Address(0xc203_0118));
    assert_eq!(p.command, 190);
    assert_eq!(p.time, 1_615_386_706);
}

#[test]
fn data_rev_3_2_fields() {
    let raw = hex::decode(RAW_DATA_REV_3_2).unwrap();
    let Packet::DataRev32(p) = unmarshall(&raw).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(p.number, 1);
    assert_eq!(p.time, 14400);
    assert_eq!(p.temperature_reference_cold, 34167);
    assert_eq!(p.temperature_reference_hot, 34168);
    assert_eq!(p.temperature_heat_cold, 34298);
    assert_eq!(p.temperature_heat_hot, 22018);
    assert_eq!(p.growth_sensor, 47212);
    assert_eq!(p.adc_bandgap, 43585);
    assert_eq!(p.number_of_bits, 17);
    assert_eq!(p.air_relative_humidity, 30);
    assert_eq!(p.air_temperature, 226);
    assert_eq!(p.gravity_z_mean, 57);
    assert_eq!(p.gravity_z_derivation, -803);
    assert_eq!(p.gravity_y_mean, 3986);
    assert_eq!(p.gravity_y_derivation, 0);
    assert_eq!(p.gravity_x_mean, 0);
    assert_eq!(p.gravity_x_derivation, 0);
    assert_eq!(p.stwc, 50566);
    assert_eq!(p.adc_volt_bat, 82757);
}

#[test]
fn light_fields() {
    let raw = hex::decode(RAW_LIGHT).unwrap();
    let Packet::Light(p) = unmarshall(&raw).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(p.number, 2);
    assert_eq!(p.time, 14400);
    assert!((p.as7263[0] - 18.378_817).abs() < 1e-4, "610 nm: {}", p.as7263[0]);
    assert!((p.as7263[5] - 89.914_43).abs() < 1e-4, "860 nm: {}", p.as7263[5]);
    assert!((p.as7262[0] - 57.782_49).abs() < 1e-4, "450 nm: {}", p.as7262[0]);
    assert!((p.as7262[5] - 34.970_554).abs() < 1e-4, "650 nm: {}", p.as7262[5]);
    assert_eq!(p.integration_time, 50);
    assert_eq!(p.gain, 3);
}

#[test]
fn command1_fields() {
    let raw = hex::decode(RAW_COMMAND1).unwrap();
    let Packet::Command1(p) = unmarshall(&raw).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(p.command, 24);
    assert_eq!(p.time, 1_615_386_764);
    assert_eq!(p.sleep_interval, 3600);
    assert_eq!(p.reserved, 0);
    assert_eq!(p.heating, 600);
    assert_eq!(p.time_slot_length, 45);
    assert_eq!(p.time_slot, 2);
}

#[test]
fn command2_fields() {
    let raw = hex::decode(RAW_COMMAND2).unwrap();
    let Packet::Command2(p) = unmarshall(&raw).unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(p.command, 82);
    assert_eq!(p.time, 1_615_389_065);
    assert_eq!(p.integration_time, 50);
    assert_eq!(p.gain, 3);
}

// No rev 3.1 frame survives in the capture archive; a synthetic value pins
// the layout instead.
#[test]
fn data_rev_3_1_round_trips() {
    let packet = Packet::DataRev31(DataRev31 {
        receiver: Address(0xc203_0118),
        sender: Address(0x5201_0352),
        number: 7,
        time: 86_400,
        temperature_reference: 34_000,
        temperature_heat: 34_500,
        growth_sensor: 41_000,
        adc_bandgap: 43_000,
        number_of_bits: 17,
        air_relative_humidity: 55,
        air_temperature: -35,
        gravity_z_mean: 60,
        gravity_z_derivation: -790,
        gravity_y_mean: 4_001,
        gravity_y_derivation: 3,
        gravity_x_mean: -12,
        gravity_x_derivation: 1,
        stwc: 50_000,
        adc_volt_bat: 98_304,
    });
    let raw = packet.marshall();
    assert_eq!(raw.len(), 48);
    assert_eq!(raw[8], packet::TAG_DATA_REV_3_1);
    assert_eq!(unmarshall(&raw).unwrap(), packet);
}

#[test]
fn rejects_short_header() {
    assert_eq!(unmarshall(&[0u8; 4]), Err(DecodeError::Truncated { got: 4 }));
}

#[test]
fn rejects_unknown_tag() {
    let mut raw = hex::decode(RAW_HELO).unwrap();
    raw[8] = 0x2a;
    assert_eq!(unmarshall(&raw), Err(DecodeError::UnknownTag(0x2a)));
}

#[test]
fn rejects_truncated_payload() {
    let raw = hex::decode(RAW_DATA_REV_3_2).unwrap();
    let short = &raw[..raw.len() - 1];
    assert_eq!(
        unmarshall(short),
        Err(DecodeError::PayloadSize { tag: packet::TAG_DATA_REV_3_2, expected: 51, got: 50 })
    );
}

#[test]
fn rejects_oversized_payload() {
    let mut raw = hex::decode(RAW_COMMAND2).unwrap();
    raw.push(0x00);
    assert_eq!(
        unmarshall(&raw),
        Err(DecodeError::PayloadSize { tag: packet::TAG_COMMAND2, expected: 7, got: 8 })
    );
}
