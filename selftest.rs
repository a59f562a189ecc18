//! Device self-test (datasheet 10.2).
//!
//! Chip id and trimming parameters are not validated.

use core::fmt;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::bus::Bus;
use crate::device::Bme280;
use crate::error::{Error, Result};
use crate::registers::ADC_20BIT_MASK;
use crate::structs::{Mode, Oversampling};

const TEMPERATURE_LIMITS: (f64, f64) = (0.0, 40.0);
const HUMIDITY_LIMITS: (f64, f64) = (20.0, 80.0);
const PRESSURE_LIMITS: (f64, f64) = (900.0, 1100.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestFailure {
    Communication,
    TemperatureBondWire,
    PressureBondWire,
    ImplausibleTemperature,
    ImplausiblePressure,
    ImplausibleHumidity,
}

impl SelfTestFailure {
    pub fn code(&self) -> u8 {
        match self {
            SelfTestFailure::Communication => 10,
            SelfTestFailure::TemperatureBondWire => 30,
            SelfTestFailure::PressureBondWire => 31,
            SelfTestFailure::ImplausibleTemperature => 40,
            SelfTestFailure::ImplausiblePressure => 41,
            SelfTestFailure::ImplausibleHumidity => 42,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SelfTestFailure::Communication => "Communication error or wrong device found",
            SelfTestFailure::TemperatureBondWire => {
                "Temperature bond wire failure or MEMS defect"
            }
            SelfTestFailure::PressureBondWire => "Pressure bond wire failure or MEMS defect",
            SelfTestFailure::ImplausibleTemperature => {
                "Implausible temperature (default limits: 0...40°C)"
            }
            SelfTestFailure::ImplausiblePressure => {
                "Implausible pressure (default limits: 900...1100 hPa)"
            }
            SelfTestFailure::ImplausibleHumidity => {
                "Implausible humidity (default limits: 20...80 %rH)"
            }
        }
    }
}

impl fmt::Display for SelfTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestResult {
    Passed,
    Failed(SelfTestFailure),
}

impl SelfTestResult {
    /// 0 on success, otherwise the failure code.
    pub fn code(&self) -> u8 {
        match self {
            SelfTestResult::Passed => 0,
            SelfTestResult::Failed(failure) => failure.code(),
        }
    }

    pub fn is_passed(&self) -> bool {
        *self == SelfTestResult::Passed
    }
}

impl fmt::Display for SelfTestResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SelfTestResult::Passed => write!(f, "0 Sensor OK"),
            SelfTestResult::Failed(failure) => fmt::Display::fmt(failure, f),
        }
    }
}

fn is_stuck(raw_value: u32) -> bool {
    let masked = raw_value & ADC_20BIT_MASK;
    masked == 0 || masked == ADC_20BIT_MASK
}

fn outside((min, max): (f64, f64), value: f64) -> bool {
    value < min || value > max
}

fn checks<I2C, D>(device: &mut Bme280<I2C, D>) -> Result<Option<SelfTestFailure>, I2C::Error>
where
    I2C: Bus,
    D: DelayNs,
{
    if device.reset().is_err() {
        return Ok(Some(SelfTestFailure::Communication));
    }

    device.initialize(
        Mode::Forced,
        Oversampling::X1,
        Oversampling::X1,
        Oversampling::X1,
    )?;

    let raw = device.read_raw()?;
    if is_stuck(raw.temperature) {
        return Ok(Some(SelfTestFailure::TemperatureBondWire));
    }
    if is_stuck(raw.pressure) {
        return Ok(Some(SelfTestFailure::PressureBondWire));
    }

    let measurement = device.read_compensated()?;
    if outside(TEMPERATURE_LIMITS, measurement.temperature) {
        return Ok(Some(SelfTestFailure::ImplausibleTemperature));
    }
    if outside(HUMIDITY_LIMITS, measurement.humidity) {
        return Ok(Some(SelfTestFailure::ImplausibleHumidity));
    }
    if outside(PRESSURE_LIMITS, measurement.pressure) {
        return Ok(Some(SelfTestFailure::ImplausiblePressure));
    }

    Ok(None)
}

/// Runs the self-test sequence, stopping at the first failed check.
///
/// Leaves the device configured for forced mode with x1 oversampling.
///
/// # Errors
/// Bus failures are reported as `SelfTestFailure::Communication`; only
/// `DeviceTimeout` and `InvalidCalibration` come back as `Err`.
pub fn run<I2C, D>(device: &mut Bme280<I2C, D>) -> Result<SelfTestResult, I2C::Error>
where
    I2C: Bus,
    D: DelayNs,
{
    info!("Running self-test");
    let result = match checks(device) {
        Ok(None) => SelfTestResult::Passed,
        Ok(Some(failure)) => SelfTestResult::Failed(failure),
        Err(Error::Communication(_)) => SelfTestResult::Failed(SelfTestFailure::Communication),
        Err(e) => return Err(e),
    };
    match result {
        SelfTestResult::Passed => info!("Self-test passed"),
        SelfTestResult::Failed(failure) => warn!("Self-test failed: {}", failure),
    }
    Ok(result)
}
