//! Trimming parameters stored in the sensor NVM.
//!
//! Two blocks are read: 0x88..0xA1 for temperature, pressure and `dig_H1`,
//! and 0xE1..0xE7 for the remaining humidity parameters. `dig_H4` and
//! `dig_H5` are 12-bit values sharing the nibbles of 0xE5.

use crate::registers::{REG_CALIB_00_LEN, REG_CALIB_26_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibParams {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

fn get_ushort(block: &[u8], index: usize) -> u16 {
    u16::from_le_bytes([block[index], block[index + 1]])
}

fn get_short(block: &[u8], index: usize) -> i16 {
    i16::from_le_bytes([block[index], block[index + 1]])
}

fn get_char(block: &[u8], index: usize) -> i8 {
    block[index] as i8
}

impl CalibParams {
    /// Splits the two raw calibration blocks into individual parameters.
    pub fn decode(calib1: &[u8; REG_CALIB_00_LEN], calib2: &[u8; REG_CALIB_26_LEN]) -> Self {
        // 0xE4 / 0xE5[3:0] and 0xE6 / 0xE5[7:4]
        let dig_h4 = (i16::from(get_char(calib2, 3)) << 4) | (i16::from(calib2[4]) & 0x0F);
        let dig_h5 = (i16::from(get_char(calib2, 5)) << 4) | (i16::from(calib2[4] >> 4) & 0x0F);

        CalibParams {
            dig_t1: get_ushort(calib1, 0),
            dig_t2: get_short(calib1, 2),
            dig_t3: get_short(calib1, 4),
            dig_p1: get_ushort(calib1, 6),
            dig_p2: get_short(calib1, 8),
            dig_p3: get_short(calib1, 10),
            dig_p4: get_short(calib1, 12),
            dig_p5: get_short(calib1, 14),
            dig_p6: get_short(calib1, 16),
            dig_p7: get_short(calib1, 18),
            dig_p8: get_short(calib1, 20),
            dig_p9: get_short(calib1, 22),
            // 0xA0 is unused
            dig_h1: calib1[25],
            dig_h2: get_short(calib2, 0),
            dig_h3: calib2[2],
            dig_h4,
            dig_h5,
            dig_h6: get_char(calib2, 6),
        }
    }
}
