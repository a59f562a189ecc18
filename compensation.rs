//! Floating-point compensation formulas (datasheet 8.1).
//!
//! Temperature runs first. Pressure and humidity take the result in degrees
//! Celsius, not the datasheet's `t_fine` (`°C * 5120`), so their values
//! differ from the datasheet reference for the same raw input.

use crate::calibration::CalibParams;
use crate::error::InvalidCalibration;
use crate::structs::{Measurement, RawData};

/// Returns degrees Celsius.
pub fn compute_temperature(calib: &CalibParams, raw_value: u32) -> f64 {
    let ut = f64::from(raw_value);
    let t1 = f64::from(calib.dig_t1);
    let v1 = (ut / 16384.0 - t1 / 1024.0) * f64::from(calib.dig_t2);
    let v2 = (ut / 131072.0 - t1 / 8192.0)
        * (ut / 131072.0 - t1 / 8192.0)
        * f64::from(calib.dig_t3);
    (v1 + v2) / 5120.0
}

/// Returns hectopascal, or `None` when `dig_P1` zeroes the divisor.
pub fn compute_pressure(calib: &CalibParams, raw_value: u32, temperature: f64) -> Option<f64> {
    let mut v1 = temperature / 2.0 - 64000.0;
    let mut v2 = v1 * v1 * f64::from(calib.dig_p6) / 32768.0;
    v2 += v1 * f64::from(calib.dig_p5) * 2.0;
    v2 = v2 / 4.0 + f64::from(calib.dig_p4) * 65536.0;
    v1 = (f64::from(calib.dig_p3) * v1 * v1 / 524288.0 + f64::from(calib.dig_p2) * v1)
        / 524288.0;
    v1 = (1.0 + v1 / 32768.0) * f64::from(calib.dig_p1);
    if v1 == 0.0 {
        return None;
    }
    let mut p = 1048576.0 - f64::from(raw_value);
    p = (p - v2 / 4096.0) * 6250.0 / v1;
    v1 = f64::from(calib.dig_p9) * p * p / 2147483648.0;
    v2 = p * f64::from(calib.dig_p8) / 32768.0;
    p += (v1 + v2 + f64::from(calib.dig_p7)) / 16.0;
    Some(p / 100.0)
}

/// Returns relative humidity in percent, clamped to 0..=100.
pub fn compute_humidity(calib: &CalibParams, raw_value: u16, temperature: f64) -> f64 {
    let mut h = temperature - 76800.0;
    h = (f64::from(raw_value)
        - (f64::from(calib.dig_h4) * 64.0 + f64::from(calib.dig_h5) / 16384.0 * h))
        * (f64::from(calib.dig_h2) / 65536.0
            * (1.0
                + f64::from(calib.dig_h6) / 67108864.0
                    * h
                    * (1.0 + f64::from(calib.dig_h3) / 67108864.0 * h)));
    h *= 1.0 - f64::from(calib.dig_h1) * h / 524288.0;
    h.clamp(0.0, 100.0)
}

/// Converts one raw reading into physical units.
pub fn compensate(raw: &RawData, calib: &CalibParams) -> Result<Measurement, InvalidCalibration> {
    let temperature = compute_temperature(calib, raw.temperature);
    let pressure = compute_pressure(calib, raw.pressure, temperature).ok_or(InvalidCalibration)?;
    let humidity = compute_humidity(calib, raw.humidity, temperature);
    Ok(Measurement {
        temperature,
        humidity,
        pressure,
    })
}
