use core::fmt;

/// Power mode, `mode[1:0]` of `ctrl_meas`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Sleep = 0,
    /// One measurement, then the device falls back to sleep.
    Forced = 1,
    Normal = 3,
}

impl Mode {
    /// Decodes the 2-bit field. `0b01` and `0b10` both mean forced mode.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Mode::Sleep,
            3 => Mode::Normal,
            _ => Mode::Forced,
        }
    }
}

/// Oversampling code for `osrs_t`, `osrs_p` and `osrs_h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Oversampling {
    /// Measurement skipped, output set to 0x80000 (0x8000 for humidity).
    Skipped = 0,
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    /// Decodes the 3-bit field. Codes above 5 are all x16 on the device.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Oversampling::Skipped,
            1 => Oversampling::X1,
            2 => Oversampling::X2,
            3 => Oversampling::X4,
            4 => Oversampling::X8,
            _ => Oversampling::X16,
        }
    }
}

/// Inactive time between two measurements in normal mode, `t_sb[2:0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Standby {
    Ms0_5 = 0,
    Ms62_5 = 1,
    Ms125 = 2,
    Ms250 = 3,
    Ms500 = 4,
    Ms1000 = 5,
    Ms10 = 6,
    Ms20 = 7,
}

/// IIR filter coefficient, `filter[2:0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Filter {
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

/// Settings written to `ctrl_hum`, `config` and `ctrl_meas`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub mode: Mode,
    pub temperature: Oversampling,
    pub humidity: Oversampling,
    pub pressure: Oversampling,
    pub standby: Standby,
    pub filter: Filter,
}

impl Default for DeviceConfig {
    /// Forced mode, x1 oversampling, filter off.
    fn default() -> Self {
        DeviceConfig::new(
            Mode::Forced,
            Oversampling::X1,
            Oversampling::X1,
            Oversampling::X1,
        )
    }
}

impl DeviceConfig {
    pub fn new(
        mode: Mode,
        temperature: Oversampling,
        humidity: Oversampling,
        pressure: Oversampling,
    ) -> Self {
        DeviceConfig {
            mode,
            temperature,
            humidity,
            pressure,
            standby: Standby::Ms0_5,
            filter: Filter::Off,
        }
    }

    pub fn with_standby(mut self, standby: Standby) -> Self {
        self.standby = standby;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn ctrl_hum(&self) -> u8 {
        self.humidity as u8
    }

    pub fn ctrl_meas(&self) -> u8 {
        ((self.temperature as u8) << 5) | ((self.pressure as u8) << 2) | self.mode as u8
    }

    pub fn config(&self) -> u8 {
        ((self.standby as u8) << 5) | ((self.filter as u8) << 2)
    }

    /// Worst-case conversion time in microseconds, derived from the
    /// oversampling codes: `1 + 2*ot + (2*op + 0.5) + (2*oh + 0.5)` ms.
    pub fn settle_time_us(&self) -> u32 {
        let ot = self.temperature as u32;
        let op = self.pressure as u32;
        let oh = self.humidity as u32;
        1000 + 2000 * ot + (2000 * op + 500) + (2000 * oh + 500)
    }
}

/// Uncompensated ADC values from the 0xF7..0xFE burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawData {
    pub pressure: u32,
    pub temperature: u32,
    pub humidity: u16,
}

impl RawData {
    pub fn from_burst(data: &[u8; 8]) -> Self {
        let data = data.map(u32::from);
        RawData {
            pressure: (data[0] << 12) | (data[1] << 4) | (data[2] >> 4),
            temperature: (data[3] << 12) | (data[4] << 4) | (data[5] >> 4),
            humidity: ((data[6] << 8) | data[7]) as u16,
        }
    }
}

/// Compensated reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent, within 0..=100.
    pub humidity: f64,
    /// Hectopascal.
    pub pressure: f64,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Temperature: {:.2} C", self.temperature)?;
        writeln!(f, "Humidity: {:.2} %", self.humidity)?;
        write!(f, "Pressure: {:.2} hPa", self.pressure)
    }
}
