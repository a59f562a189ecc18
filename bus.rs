use embedded_hal::i2c::{ErrorType, I2c};

/// Register-level access to a device on a two-wire bus.
///
/// Every `embedded_hal::i2c::I2c` implementation (e.g. `rppal::i2c::I2c`)
/// is a `Bus`.
pub trait Bus {
    type Error;

    /// Fills `buffer` with consecutive registers starting at `register`.
    fn read_block(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Writes a single register.
    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), Self::Error>;
}

impl<T: I2c> Bus for T {
    type Error = <T as ErrorType>::Error;

    fn read_block(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), <T as ErrorType>::Error> {
        self.write_read(address, &[register], buffer)
    }

    fn write_byte(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> Result<(), <T as ErrorType>::Error> {
        self.write(address, &[register, value])
    }
}
