//! Time-series observation rows.
//!
//! One inbound packet expands into one or more tagged rows; the store keeps
//! them keyed by measurement name + talker tag at second granularity. Raw
//! counters are stored next to their calibrated (`ttt_`-prefixed) values so
//! odd readings can be audited later.

use crate::address::Address;
use crate::calib::{battery_voltage_rev_3_1, battery_voltage_rev_3_2, compute_temperature};
use crate::packet::{
    DataRev31, DataRev32, Light, Packet, AS7262_WAVELENGTHS, AS7263_WAVELENGTHS,
};

pub mod measurement {
    pub const STEM_TEMPERATURE: &str = "stem_temperature";
    pub const GROWTH: &str = "growth";
    pub const POWER: &str = "power";
    pub const STEM_WATER: &str = "stem_water";
    pub const AIR: &str = "air";
    pub const GRAVITY: &str = "gravity";
    pub const AS7263: &str = "AS7263";
    pub const AS7262: &str = "AS7262";
    pub const RESPONSE_TIME: &str = "response_time";
}

/// One row, ready for the store. Field names double as query keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub measurement: &'static str,
    pub talker: Address,
    pub tags: Vec<(&'static str, String)>,
    pub fields: Vec<(&'static str, f64)>,
}

impl Packet {
    /// Observation rows for this packet; empty for packet kinds that carry no
    /// measurements (handshakes and commands).
    pub fn observations(&self) -> Vec<Observation> {
        match self {
            Packet::DataRev31(p) => p.observations(),
            Packet::DataRev32(p) => p.observations(),
            Packet::Light(p) => p.observations(),
            _ => Vec::new(),
        }
    }
}

impl DataRev32 {
    pub fn battery_millivolts(&self) -> f64 {
        battery_voltage_rev_3_2(self.adc_volt_bat, self.adc_bandgap)
    }

    pub fn observations(&self) -> Vec<Observation> {
        vec![
            Observation {
                measurement: measurement::STEM_TEMPERATURE,
                talker: self.sender,
                tags: vec![("heating", "true".into())],
                fields: vec![
                    ("reference_probe_cold", self.temperature_reference_cold as f64),
                    ("reference_probe_hot", self.temperature_reference_hot as f64),
                    ("heat_probe_cold", self.temperature_heat_cold as f64),
                    ("heat_probe_hot", self.temperature_heat_hot as f64),
                    ("ttt_reference_probe_cold", compute_temperature(self.temperature_reference_cold)),
                    ("ttt_reference_probe_hot", compute_temperature(self.temperature_reference_hot)),
                    ("ttt_heat_probe_cold", compute_temperature(self.temperature_heat_cold)),
                    ("ttt_heat_probe_hot", compute_temperature(self.temperature_heat_hot)),
                ],
            },
            Observation {
                measurement: measurement::GROWTH,
                talker: self.sender,
                tags: vec![],
                fields: vec![("distance", self.growth_sensor as f64)],
            },
            Observation {
                measurement: measurement::POWER,
                talker: self.sender,
                tags: vec![],
                fields: vec![
                    ("bandgap", self.adc_bandgap as f64),
                    ("voltage", self.adc_volt_bat as f64),
                    ("ttt_voltage", self.battery_millivolts()),
                ],
            },
            Observation {
                measurement: measurement::STEM_WATER,
                talker: self.sender,
                tags: vec![],
                fields: vec![("content", self.stwc as f64)],
            },
            Observation {
                measurement: measurement::AIR,
                talker: self.sender,
                tags: vec![],
                fields: vec![
                    ("temperature", self.air_temperature as f64),
                    ("humidity", self.air_relative_humidity as f64),
                ],
            },
            Observation {
                measurement: measurement::GRAVITY,
                talker: self.sender,
                tags: vec![],
                fields: vec![
                    ("x_mean", self.gravity_x_mean as f64),
                    ("x_derivation", self.gravity_x_derivation as f64),
                    ("y_mean", self.gravity_y_mean as f64),
                    ("y_derivation", self.gravity_y_derivation as f64),
                    ("z_mean", self.gravity_z_mean as f64),
                    ("z_derivation", self.gravity_z_derivation as f64),
                ],
            },
        ]
    }
}

impl DataRev31 {
    pub fn battery_millivolts(&self) -> f64 {
        battery_voltage_rev_3_1(self.adc_volt_bat)
    }

    /// Revision 3.1 probes carry no cold/hot split; the single reading fills
    /// both columns so downstream queries see the same schema as rev 3.2.
    pub fn observations(&self) -> Vec<Observation> {
        vec![
            Observation {
                measurement: measurement::STEM_TEMPERATURE,
                talker: self.sender,
                tags: vec![("heating", "false".into())],
                fields: vec![
                    ("reference_probe_cold", self.temperature_reference as f64),
                    ("reference_probe_hot", self.temperature_reference as f64),
                    ("heat_probe_cold", self.temperature_heat as f64),
                    ("heat_probe_hot", self.temperature_heat as f64),
                    ("ttt_reference_probe_cold", compute_temperature(self.temperature_reference)),
                    ("ttt_reference_probe_hot", compute_temperature(self.temperature_reference)),
                    ("ttt_heat_probe_cold", compute_temperature(self.temperature_heat)),
                    ("ttt_heat_probe_hot", compute_temperature(self.temperature_heat)),
                ],
            },
            Observation {
                measurement: measurement::GROWTH,
                talker: self.sender,
                tags: vec![],
                fields: vec![("distance", self.growth_sensor as f64)],
            },
            Observation {
                measurement: measurement::POWER,
                talker: self.sender,
                tags: vec![],
                fields: vec![
                    ("bandgap", self.adc_bandgap as f64),
                    ("voltage", self.adc_volt_bat as f64),
                    ("ttt_voltage", self.battery_millivolts()),
                ],
            },
            Observation {
                measurement: measurement::STEM_WATER,
                talker: self.sender,
                tags: vec![],
                fields: vec![("content", self.stwc as f64)],
            },
            Observation {
                measurement: measurement::AIR,
                talker: self.sender,
                tags: vec![],
                fields: vec![
                    ("temperature", self.air_temperature as f64),
                    ("humidity", self.air_relative_humidity as f64),
                ],
            },
            Observation {
                measurement: measurement::GRAVITY,
                talker: self.sender,
                tags: vec![],
                fields: vec![
                    ("x_mean", self.gravity_x_mean as f64),
                    ("x_derivation", self.gravity_x_derivation as f64),
                    ("y_mean", self.gravity_y_mean as f64),
                    ("y_derivation", self.gravity_y_derivation as f64),
                    ("z_mean", self.gravity_z_mean as f64),
                    ("z_derivation", self.gravity_z_derivation as f64),
                ],
            },
        ]
    }
}

impl Light {
    pub fn observations(&self) -> Vec<Observation> {
        let tags = vec![
            ("gain", self.gain.to_string()),
            ("integration_time", self.integration_time.to_string()),
        ];
        let bank = |values: &[f32; 6], wavelengths: &[u16; 6]| -> Vec<(&'static str, f64)> {
            wavelengths
                .iter()
                .zip(values.iter())
                .map(|(wl, v)| (wavelength_field(*wl), *v as f64))
                .collect()
        };
        vec![
            Observation {
                measurement: measurement::AS7263,
                talker: self.sender,
                tags: tags.clone(),
                fields: bank(&self.as7263, &AS7263_WAVELENGTHS),
            },
            Observation {
                measurement: measurement::AS7262,
                talker: self.sender,
                tags,
                fields: bank(&self.as7262, &AS7262_WAVELENGTHS),
            },
        ]
    }
}

/// Spectrometer rows key fields by wavelength.
pub fn wavelength_field(wavelength: u16) -> &'static str {
    match wavelength {
        450 => "450",
        500 => "500",
        550 => "550",
        570 => "570",
        600 => "600",
        610 => "610",
        650 => "650",
        680 => "680",
        730 => "730",
        760 => "760",
        810 => "810",
        860 => "860",
        _ => unreachable!("no such spectrometer channel"),
    }
}
