//! Sensor calibration curves shared by the live policies, the observation
//! rows and the offline analyser.

/// Bandgap reference voltage of the talker ADC, millivolts.
pub const MV_BANDGAP: f64 = 1100.0;

/// Convert a raw stem-probe measurement to degrees Celsius.
///
/// Third-order polynomial fitted to the probe response, rounded to two
/// decimals so stored values compare stably across runs.
pub fn compute_temperature(measurement: u32) -> f64 {
    let m = measurement as f64;
    let t = 127.6 - 6.045e-3 * m + 1.26e-7 * m * m - 1.15e-12 * m * m * m;
    (t * 100.0).round() / 100.0
}

/// Battery voltage in millivolts for revision 3.2 hardware, which reports the
/// battery ADC reading next to a bandgap reference reading.
pub fn battery_voltage_rev_3_2(adc_volt_bat: u32, adc_bandgap: u32) -> f64 {
    2.0 * MV_BANDGAP * (adc_volt_bat as f64 / adc_bandgap as f64)
}

/// Battery voltage in millivolts for revision 3.1 hardware, which reports a
/// single raw voltage counter.
pub fn battery_voltage_rev_3_1(voltage: u32) -> f64 {
    650.0 + 131_072.0 * (1100.0 / voltage as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_is_rounded_to_two_decimals() {
        let t = compute_temperature(34167);
        assert_eq!(t, (t * 100.0).round() / 100.0);
    }

    #[test]
    fn rev_3_2_voltage_scales_with_bandgap() {
        // Equal readings mean the battery sits at twice the bandgap voltage.
        assert_eq!(battery_voltage_rev_3_2(1000, 1000), 2200.0);
    }

    #[test]
    fn rev_3_1_voltage_is_inverse_in_the_counter() {
        assert!(battery_voltage_rev_3_1(100_000) > battery_voltage_rev_3_1(200_000));
    }
}
