use std::error::Error;
use std::process;

use log::info;
use rppal::hal::Delay;
use rppal::i2c::I2c;

use rpbme280::{selftest, Bme280, DeviceConfig, ADDR_BME280};

// I2C bus the sensor is wired to (/dev/i2c-1).
const I2C_BUS: u8 = 1;

fn run() -> Result<(), Box<dyn Error>> {
    let i2c = I2c::with_bus(I2C_BUS)?;
    let mut bme280 = Bme280::new(i2c, Delay::new(), ADDR_BME280);

    let result = selftest::run(&mut bme280)?;
    if result.is_passed() {
        println!("self-test success");
    } else {
        println!("self-test failed: {}", result);
    }

    let config = DeviceConfig::default();
    info!("Configuring sensor with {:?}", config);
    bme280.configure(config)?;

    let measurement = bme280.read_compensated()?;
    println!("{}", measurement);
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
