// BME280 register addresses.
// cf. https://trac.switch-science.com/wiki/BME280

// BME280 I2C default slave address (SDO tied to GND).
pub const ADDR_BME280: u8 = 0x76;

pub const REG_CHIP_ID: u8 = 0xD0;
pub const REG_CHIP_ID_LEN: usize = 2;
pub const REG_RESET: u8 = 0xE0;
pub const REG_CALIB_00: u8 = 0x88;
// 0x88 - 0xA1, dig_H1 sits in the last byte
pub const REG_CALIB_00_LEN: usize = 26;
pub const REG_CALIB_26: u8 = 0xE1;
pub const REG_CALIB_26_LEN: usize = 7;
pub const REG_CTRL_HUM: u8 = 0xF2;
pub const REG_STATUS: u8 = 0xF3;
pub const REG_CTRL_MEAS: u8 = 0xF4;
pub const REG_CONFIG: u8 = 0xF5;
pub const REG_ADC_VALUE: u8 = 0xF7;
pub const REG_ADC_VALUE_LEN: usize = 8;

/// Written to `REG_RESET` to run the power-on-reset procedure.
pub const RESET_COMMAND: u8 = 0xB6;

/// `measuring[0]` in the status register, set while a conversion runs.
pub const STATUS_MEASURING: u8 = 0x08;

/// Largest 20-bit ADC value.
pub const ADC_20BIT_MASK: u32 = 0xF_FFFF;
