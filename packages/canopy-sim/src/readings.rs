//! readings.rs: synthetic talker measurements
//!
//! Produces plausible packet payloads for a healthy tree: probe counters in
//! the band real hardware reports, a slowly draining battery, small gravity
//! jitter. Values vary per call so the gateway's history fills with a
//! believable series.

use canopy_types::{unix_now, Address, DataRev32, Light, Packet};
use rand::Rng;

/// Battery drain per emitted packet, ADC counts. Visible in the gateway's
/// regression after a few hours of simulated traffic.
const DRAIN_PER_PACKET: u32 = 8;

pub struct TalkerModel {
    talker: Address,
    gateway: Address,
    number: u8,
    adc_volt_bat: u32,
}

impl TalkerModel {
    pub fn new(talker: Address, gateway: Address) -> Self {
        Self { talker, gateway, number: 0, adc_volt_bat: 84_000 }
    }

    fn next_number(&mut self) -> u8 {
        self.number = self.number.wrapping_add(1);
        self.number
    }

    pub fn data_packet(&mut self) -> Packet {
        let mut rng = rand::thread_rng();
        self.adc_volt_bat = self.adc_volt_bat.saturating_sub(DRAIN_PER_PACKET);

        let reference_cold = rng.gen_range(33_900..34_400);
        let reference_hot = reference_cold + rng.gen_range(0..40);
        Packet::DataRev32(DataRev32 {
            receiver: self.gateway,
            sender: self.talker,
            number: self.next_number(),
            time: unix_now() as u32,
            temperature_reference_cold: reference_cold,
            temperature_reference_hot: reference_hot,
            temperature_heat_cold: reference_cold + rng.gen_range(80..200),
            temperature_heat_hot: reference_hot + rng.gen_range(80..200),
            growth_sensor: rng.gen_range(46_000..48_000),
            adc_bandgap: rng.gen_range(43_400..43_700),
            number_of_bits: 17,
            air_relative_humidity: rng.gen_range(25..75),
            air_temperature: rng.gen_range(150..280),
            gravity_z_mean: rng.gen_range(40..70),
            gravity_z_derivation: rng.gen_range(-850..-750),
            gravity_y_mean: rng.gen_range(3_900..4_050),
            gravity_y_derivation: rng.gen_range(-10..10),
            gravity_x_mean: rng.gen_range(-20..20),
            gravity_x_derivation: rng.gen_range(-10..10),
            stwc: rng.gen_range(50_000..51_000),
            adc_volt_bat: self.adc_volt_bat,
        })
    }

    pub fn light_packet(&mut self) -> Packet {
        let mut rng = rand::thread_rng();
        let mut bank = |base: f32| -> [f32; 6] {
            let mut values = [0f32; 6];
            for v in values.iter_mut() {
                *v = base + rng.gen_range(-5.0f32..5.0);
            }
            values
        };
        Packet::Light(Light {
            receiver: self.gateway,
            sender: self.talker,
            number: self.next_number(),
            time: unix_now() as u32,
            as7263: bank(60.0),
            as7262: bank(45.0),
            integration_time: 50,
            gain: 3,
        })
    }

    pub fn helo_packet(&mut self) -> Packet {
        Packet::Helo(canopy_types::Helo {
            receiver: Address::MULTICAST,
            sender: self.talker,
            number: self.next_number(),
        })
    }
}
