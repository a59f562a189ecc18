use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::bus::Bus;
use crate::calibration::CalibParams;
use crate::compensation;
use crate::error::{Error, Result};
use crate::registers::*;
use crate::structs::{DeviceConfig, Measurement, Mode, Oversampling, RawData};

/// Upper bound on how long `read_raw` waits for the status register.
pub const DEFAULT_TIMEOUT_MS: u32 = 500;

// Startup time after a soft reset.
const RESET_DELAY_MS: u32 = 2;
// Time for new settings to take effect.
const CONFIGURE_DELAY_MS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DeviceState {
    Uninitialized,
    Ready {
        config: DeviceConfig,
        calib: CalibParams,
    },
}

/// BME280 attached to a register bus.
///
/// Settings and trimming parameters live here and are only touched through
/// `&mut self`; put the driver behind a `Mutex` to share it between threads.
pub struct Bme280<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    timeout_us: u64,
    state: DeviceState,
}

impl<I2C, D> Bme280<I2C, D>
where
    I2C: Bus,
    D: DelayNs,
{
    /// Creates an uninitialized driver. No bus traffic happens here.
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Bme280 {
            i2c,
            delay,
            address,
            timeout_us: u64::from(DEFAULT_TIMEOUT_MS) * 1000,
            state: DeviceState::Uninitialized,
        }
    }

    /// Overrides how long `read_raw` polls before giving up.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_us = u64::from(timeout_ms) * 1000;
        self
    }

    /// Releases the bus and delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, DeviceState::Ready { .. })
    }

    /// Settings last written by `configure`.
    pub fn config(&self) -> Option<DeviceConfig> {
        match self.state {
            DeviceState::Ready { config, .. } => Some(config),
            DeviceState::Uninitialized => None,
        }
    }

    /// Trimming parameters decoded by the last `configure`.
    pub fn calibration(&self) -> Option<CalibParams> {
        match self.state {
            DeviceState::Ready { calib, .. } => Some(calib),
            DeviceState::Uninitialized => None,
        }
    }

    fn read_into(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), I2C::Error> {
        self.i2c
            .read_block(self.address, register, buffer)
            .map_err(Error::Communication)
    }

    fn write_reg(&mut self, register: u8, value: u8) -> Result<(), I2C::Error> {
        debug!("Writing {:#04x} to register {:#04x}", value, register);
        self.i2c
            .write_byte(self.address, register, value)
            .map_err(Error::Communication)
    }

    /// Resets all settings on the device and waits for it to reboot.
    pub fn reset(&mut self) -> Result<(), I2C::Error> {
        debug!("Initiating soft reset");
        self.write_reg(REG_RESET, RESET_COMMAND)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.state = DeviceState::Uninitialized;
        Ok(())
    }

    /// Reads `(chip_id, chip_version)`. A BME280 reports id 0x60.
    pub fn read_chip_id(&mut self) -> Result<(u8, u8), I2C::Error> {
        let mut buffer = [0u8; REG_CHIP_ID_LEN];
        self.read_into(REG_CHIP_ID, &mut buffer)?;
        Ok((buffer[0], buffer[1]))
    }

    fn read_calib(&mut self) -> Result<CalibParams, I2C::Error> {
        let mut calib1 = [0u8; REG_CALIB_00_LEN];
        let mut calib2 = [0u8; REG_CALIB_26_LEN];
        self.read_into(REG_CALIB_00, &mut calib1)?;
        self.read_into(REG_CALIB_26, &mut calib2)?;
        let calib = CalibParams::decode(&calib1, &calib2);
        debug!("Got calibration data: {:?}", calib);
        Ok(calib)
    }

    /// Reads back `ctrl_meas` as `(mode, temperature, pressure)` oversampling.
    pub fn read_ctrl_meas(&mut self) -> Result<(Mode, Oversampling, Oversampling), I2C::Error> {
        let mut ctrl_meas = [0u8];
        self.read_into(REG_CTRL_MEAS, &mut ctrl_meas)?;
        let value = ctrl_meas[0];
        Ok((
            Mode::from_bits(value),
            Oversampling::from_bits(value >> 5),
            Oversampling::from_bits(value >> 2),
        ))
    }

    /// Writes settings to the device and loads its trimming parameters.
    ///
    /// `ctrl_hum` only takes effect on the next `ctrl_meas` write, so it
    /// goes out first.
    pub fn configure(&mut self, config: DeviceConfig) -> Result<(), I2C::Error> {
        self.state = DeviceState::Uninitialized;
        self.write_reg(REG_CTRL_HUM, config.ctrl_hum())?;
        self.write_reg(REG_CONFIG, config.config())?;
        self.write_reg(REG_CTRL_MEAS, config.ctrl_meas())?;

        let calib = self.read_calib()?;
        self.state = DeviceState::Ready { config, calib };
        self.delay.delay_ms(CONFIGURE_DELAY_MS);
        Ok(())
    }

    /// `configure` with default standby time and filter.
    pub fn initialize(
        &mut self,
        mode: Mode,
        temperature: Oversampling,
        humidity: Oversampling,
        pressure: Oversampling,
    ) -> Result<(), I2C::Error> {
        self.configure(DeviceConfig::new(mode, temperature, humidity, pressure))
    }

    fn ready(&self) -> Result<(DeviceConfig, CalibParams), I2C::Error> {
        match self.state {
            DeviceState::Ready { config, calib } => Ok((config, calib)),
            DeviceState::Uninitialized => Err(Error::NotInitialized),
        }
    }

    // Forced mode drops back to sleep after each conversion, so ctrl_meas
    // has to be written again to start the next one.
    fn refresh(&mut self, config: &DeviceConfig) -> Result<(), I2C::Error> {
        self.write_reg(REG_CTRL_MEAS, config.ctrl_meas())
    }

    fn is_measuring(&mut self) -> Result<bool, I2C::Error> {
        let mut status = [0u8];
        self.read_into(REG_STATUS, &mut status)?;
        Ok(status[0] & STATUS_MEASURING != 0)
    }

    /// Triggers a measurement and returns the uncompensated ADC values.
    ///
    /// # Errors
    /// `NotInitialized` before `configure`, `DeviceTimeout` when the
    /// status register still reports a running conversion after the
    /// configured timeout.
    pub fn read_raw(&mut self) -> Result<RawData, I2C::Error> {
        let (config, _) = self.ready()?;
        self.refresh(&config)?;

        let wait_us = config.settle_time_us();
        let mut waited_us = u64::from(wait_us);
        self.delay.delay_us(wait_us);

        while self.is_measuring()? {
            if waited_us >= self.timeout_us {
                warn!("Measurement still running after {} us", waited_us);
                return Err(Error::DeviceTimeout);
            }
            self.delay.delay_us(wait_us);
            waited_us = waited_us.saturating_add(u64::from(wait_us));
        }

        let mut data = [0u8; REG_ADC_VALUE_LEN];
        self.read_into(REG_ADC_VALUE, &mut data)?;
        let raw = RawData::from_burst(&data);
        debug!("Got raw data: {:?}", raw);
        Ok(raw)
    }

    /// Triggers a measurement and returns temperature, humidity and pressure.
    pub fn read_compensated(&mut self) -> Result<Measurement, I2C::Error> {
        let (_, calib) = self.ready()?;
        let raw = self.read_raw()?;
        Ok(compensation::compensate(&raw, &calib)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
    use embedded_hal_mock::eh1::delay::{CheckedDelay, NoopDelay, Transaction as DelayTransaction};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = ADDR_BME280;

    fn configure_transactions(calib1: Vec<u8>, calib2: Vec<u8>) -> Vec<I2cTransaction> {
        vec![
            I2cTransaction::write(ADDR, vec![REG_CTRL_HUM, 0x01]),
            I2cTransaction::write(ADDR, vec![REG_CONFIG, 0x00]),
            I2cTransaction::write(ADDR, vec![REG_CTRL_MEAS, 0b001_001_01]),
            I2cTransaction::write_read(ADDR, vec![REG_CALIB_00], calib1),
            I2cTransaction::write_read(ADDR, vec![REG_CALIB_26], calib2),
        ]
    }

    // dig_T2 = 8192, dig_P1 = 6250, dig_H2 = 16384, everything else 0
    fn round_calib_blocks() -> (Vec<u8>, Vec<u8>) {
        let mut calib1 = vec![0u8; REG_CALIB_00_LEN];
        calib1[2..4].copy_from_slice(&8192u16.to_le_bytes());
        calib1[6..8].copy_from_slice(&6250u16.to_le_bytes());
        let mut calib2 = vec![0u8; REG_CALIB_26_LEN];
        calib2[0..2].copy_from_slice(&16384u16.to_le_bytes());
        (calib1, calib2)
    }

    // ut = 256000, up = 947251, uh = 200
    fn round_burst() -> Vec<u8> {
        let up: u32 = 947251;
        let ut: u32 = 256000;
        vec![
            (up >> 12) as u8,
            (up >> 4) as u8,
            (up << 4) as u8,
            (ut >> 12) as u8,
            (ut >> 4) as u8,
            (ut << 4) as u8,
            0x00,
            200,
        ]
    }

    // Answers every read with the "measuring" status bit set.
    struct BusyBus {
        reads: u32,
    }

    impl ErrorType for BusyBus {
        type Error = ErrorKind;
    }

    impl I2c for BusyBus {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> core::result::Result<(), Self::Error> {
            for operation in operations {
                if let Operation::Read(buffer) = operation {
                    buffer.fill(STATUS_MEASURING);
                    self.reads += 1;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn reset() {
        let i2c = I2cMock::new(&[I2cTransaction::write(ADDR, vec![0xE0, 0xB6])]);
        let delay = CheckedDelay::new(&[DelayTransaction::delay_ms(2)]);
        let mut bme280 = Bme280::new(i2c, delay, ADDR);
        bme280.reset().unwrap();
        let (mut i2c, mut delay) = bme280.release();
        i2c.done();
        delay.done();

        let i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![0xE0, 0xB6]).with_error(ErrorKind::Other)
        ]);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR);
        assert_eq!(
            bme280.reset(),
            Err(Error::Communication(ErrorKind::Other))
        );
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }

    #[test]
    fn read_chip_id() {
        let i2c = I2cMock::new(&[I2cTransaction::write_read(
            ADDR,
            vec![REG_CHIP_ID],
            vec![0x60, 0x00],
        )]);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR);
        assert_eq!(bme280.read_chip_id().unwrap(), (0x60, 0x00));
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }

    #[test]
    fn configure_writes_humidity_before_ctrl_meas() {
        let (calib1, calib2) = round_calib_blocks();
        let i2c = I2cMock::new(&configure_transactions(calib1, calib2));
        let delay = CheckedDelay::new(&[DelayTransaction::delay_ms(4)]);
        let mut bme280 = Bme280::new(i2c, delay, ADDR);
        assert!(!bme280.is_initialized());
        bme280
            .initialize(
                Mode::Forced,
                Oversampling::X1,
                Oversampling::X1,
                Oversampling::X1,
            )
            .unwrap();
        assert!(bme280.is_initialized());
        assert_eq!(bme280.config(), Some(DeviceConfig::default()));
        let calib = bme280.calibration().unwrap();
        assert_eq!(calib.dig_t2, 8192);
        assert_eq!(calib.dig_p1, 6250);
        assert_eq!(calib.dig_h2, 16384);
        let (mut i2c, mut delay) = bme280.release();
        i2c.done();
        delay.done();
    }

    #[test]
    fn read_ctrl_meas() {
        let i2c = I2cMock::new(&[
            I2cTransaction::write_read(ADDR, vec![REG_CTRL_MEAS], vec![0b010_101_11]),
            I2cTransaction::write_read(ADDR, vec![REG_CTRL_MEAS], vec![0b111_000_10]),
        ]);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR);
        assert_eq!(
            bme280.read_ctrl_meas().unwrap(),
            (Mode::Normal, Oversampling::X2, Oversampling::X16)
        );
        assert_eq!(
            bme280.read_ctrl_meas().unwrap(),
            (Mode::Forced, Oversampling::X16, Oversampling::Skipped)
        );
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }

    #[test]
    fn configure_failure_leaves_device_uninitialized() {
        let i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![REG_CTRL_HUM, 0x01]).with_error(ErrorKind::Other)
        ]);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR);
        assert_eq!(
            bme280.configure(DeviceConfig::default()),
            Err(Error::Communication(ErrorKind::Other))
        );
        assert!(!bme280.is_initialized());
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }

    #[test]
    fn measuring_before_configure_fails() {
        let i2c = I2cMock::new(&[]);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR);
        assert_eq!(bme280.read_raw(), Err(Error::NotInitialized));
        assert_eq!(bme280.read_compensated(), Err(Error::NotInitialized));
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }

    #[test]
    fn reset_forgets_configuration() {
        let (calib1, calib2) = round_calib_blocks();
        let mut expectations = configure_transactions(calib1, calib2);
        expectations.push(I2cTransaction::write(ADDR, vec![REG_RESET, RESET_COMMAND]));
        let i2c = I2cMock::new(&expectations);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR);
        bme280.configure(DeviceConfig::default()).unwrap();
        bme280.reset().unwrap();
        assert_eq!(bme280.read_raw(), Err(Error::NotInitialized));
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }

    #[test]
    fn read_raw_rearms_and_polls_status() {
        let (calib1, calib2) = round_calib_blocks();
        let mut expectations = configure_transactions(calib1, calib2);
        expectations.extend([
            // ctrl_meas again, without ctrl_hum
            I2cTransaction::write(ADDR, vec![REG_CTRL_MEAS, 0b001_001_01]),
            I2cTransaction::write_read(ADDR, vec![REG_STATUS], vec![0x08]),
            I2cTransaction::write_read(ADDR, vec![REG_STATUS], vec![0x09]),
            I2cTransaction::write_read(ADDR, vec![REG_STATUS], vec![0x01]),
            I2cTransaction::write_read(ADDR, vec![REG_ADC_VALUE], round_burst()),
        ]);
        let i2c = I2cMock::new(&expectations);
        // 8 ms settle time before the first poll and after each busy one
        let delay = CheckedDelay::new(&[
            DelayTransaction::delay_ms(4),
            DelayTransaction::delay_us(8000),
            DelayTransaction::delay_us(8000),
            DelayTransaction::delay_us(8000),
        ]);
        let mut bme280 = Bme280::new(i2c, delay, ADDR);
        bme280.configure(DeviceConfig::default()).unwrap();
        let raw = bme280.read_raw().unwrap();
        assert_eq!(
            raw,
            RawData {
                pressure: 947251,
                temperature: 256000,
                humidity: 200,
            }
        );
        let (mut i2c, mut delay) = bme280.release();
        i2c.done();
        delay.done();
    }

    #[test]
    fn read_compensated() {
        let (calib1, calib2) = round_calib_blocks();
        let mut expectations = configure_transactions(calib1, calib2);
        expectations.extend([
            I2cTransaction::write(ADDR, vec![REG_CTRL_MEAS, 0b001_001_01]),
            I2cTransaction::write_read(ADDR, vec![REG_STATUS], vec![0x00]),
            I2cTransaction::write_read(ADDR, vec![REG_ADC_VALUE], round_burst()),
        ]);
        let i2c = I2cMock::new(&expectations);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR);
        bme280.configure(DeviceConfig::default()).unwrap();
        let m = bme280.read_compensated().unwrap();
        assert!((m.temperature - 25.0).abs() < 1e-6);
        assert!((m.humidity - 50.0).abs() < 1e-6);
        assert!((m.pressure - 1013.25).abs() < 1e-6);
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }

    #[test]
    fn stuck_status_times_out() {
        let (calib1, calib2) = round_calib_blocks();
        let mut expectations = configure_transactions(calib1, calib2);
        expectations.push(I2cTransaction::write(ADDR, vec![REG_CTRL_MEAS, 0b001_001_01]));
        // 8 ms settle time against a 20 ms timeout: polls after 8, 16 and 24 ms
        for _ in 0..3 {
            expectations.push(I2cTransaction::write_read(ADDR, vec![REG_STATUS], vec![0x08]));
        }
        let i2c = I2cMock::new(&expectations);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR).with_timeout_ms(20);
        bme280.configure(DeviceConfig::default()).unwrap();
        assert_eq!(bme280.read_raw(), Err(Error::DeviceTimeout));
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }

    #[test]
    fn long_timeout_does_not_overflow() {
        // Beyond u32::MAX microseconds
        let mut bme280 =
            Bme280::new(BusyBus { reads: 0 }, NoopDelay, ADDR).with_timeout_ms(5_000_000);
        bme280.configure(DeviceConfig::default()).unwrap();
        assert_eq!(bme280.read_raw(), Err(Error::DeviceTimeout));
        let (i2c, _) = bme280.release();
        // two calibration blocks, then one status poll per 8 ms
        assert_eq!(i2c.reads, 2 + 625_000);
    }

    #[test]
    fn invalid_calibration_is_reported() {
        // dig_P1 = 0
        let mut expectations =
            configure_transactions(vec![0u8; REG_CALIB_00_LEN], vec![0u8; REG_CALIB_26_LEN]);
        expectations.extend([
            I2cTransaction::write(ADDR, vec![REG_CTRL_MEAS, 0b001_001_01]),
            I2cTransaction::write_read(ADDR, vec![REG_STATUS], vec![0x00]),
            I2cTransaction::write_read(ADDR, vec![REG_ADC_VALUE], round_burst()),
        ]);
        let i2c = I2cMock::new(&expectations);
        let mut bme280 = Bme280::new(i2c, NoopDelay, ADDR);
        bme280.configure(DeviceConfig::default()).unwrap();
        assert_eq!(bme280.read_compensated(), Err(Error::InvalidCalibration));
        let (mut i2c, _) = bme280.release();
        i2c.done();
    }
}
