use core::fmt;

/// Errors returned by the BME280 driver.
///
/// `E` is the error type of the underlying bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error<E> {
    /// The bus read or write failed.
    Communication(E),
    /// A measurement was requested before the device was configured.
    NotInitialized,
    /// The pressure trimming coefficients lead to a division by zero.
    InvalidCalibration,
    /// The status register kept reporting a running conversion.
    DeviceTimeout,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Communication(e) => write!(f, "bus communication failed: {:?}", e),
            Error::NotInitialized => write!(f, "device is not initialized"),
            Error::InvalidCalibration => fmt::Display::fmt(&InvalidCalibration, f),
            Error::DeviceTimeout => write!(f, "timed out waiting for measurement to finish"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for Error<E> {}

/// Pressure compensation is undefined for the given trimming parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCalibration;

impl fmt::Display for InvalidCalibration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "trimming parameters make pressure compensation undefined")
    }
}

impl std::error::Error for InvalidCalibration {}

impl<E> From<InvalidCalibration> for Error<E> {
    fn from(_: InvalidCalibration) -> Self {
        Error::InvalidCalibration
    }
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;
