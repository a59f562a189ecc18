//! Driver for the Bosch BME280 temperature/humidity/pressure sensor.
//!
//! The bus is anything implementing [`bus::Bus`], which covers every
//! `embedded_hal::i2c::I2c` (on a Raspberry Pi: `rppal::i2c::I2c`). Waits
//! go through an `embedded_hal::delay::DelayNs`.
//!
//! ```no_run
//! use rppal::hal::Delay;
//! use rppal::i2c::I2c;
//! use rpbme280::{Bme280, Mode, Oversampling, ADDR_BME280};
//!
//! let i2c = I2c::new().unwrap();
//! let mut bme280 = Bme280::new(i2c, Delay::new(), ADDR_BME280);
//! bme280
//!     .initialize(Mode::Forced, Oversampling::X1, Oversampling::X1, Oversampling::X1)
//!     .unwrap();
//! println!("{}", bme280.read_compensated().unwrap());
//! ```

pub mod bus;
pub mod calibration;
pub mod compensation;
mod device;
pub mod error;
pub mod registers;
pub mod selftest;
mod structs;

pub use calibration::CalibParams;
pub use device::{Bme280, DEFAULT_TIMEOUT_MS};
pub use error::Error;
pub use registers::ADDR_BME280;
pub use selftest::{SelfTestFailure, SelfTestResult};
pub use structs::{DeviceConfig, Filter, Measurement, Mode, Oversampling, RawData, Standby};
