// VitalsWatch: LSM6DS3 IMU Driver
//
// Register-level driver over the shared I2C bus.  The pedometer block of the
// same chip is configured separately (see `crate::pedometer`).

use embedded_hal::i2c::I2c;

use crate::bus::SharedBus;
use crate::config::*;
use crate::sample::{Motion, Vec3};

// LSM6DS3 register addresses
pub(crate) const REG_WHO_AM_I: u8 = 0x0F;
pub(crate) const REG_CTRL1_XL: u8 = 0x10;
pub(crate) const REG_CTRL2_G: u8 = 0x11;
pub(crate) const REG_OUTX_L_G: u8 = 0x22; // Start of 12-byte gyro+accel burst

// LSM6DS3 and LSM6DS3TR-C
const WHO_AM_I_EXPECTED: [u8; 2] = [0x69, 0x6A];

const CTRL1_XL_416HZ_2G: u8 = 0x60;
const CTRL2_G_416HZ_2000DPS: u8 = 0x6C;

pub struct Lsm6ds3<'a, I2C> {
    bus: SharedBus<'a, I2C>,
}

impl<'a, I2C: I2c> Lsm6ds3<'a, I2C> {
    pub fn new(bus: SharedBus<'a, I2C>) -> Self {
        Self { bus }
    }

    /// Configure accel (±2 g) and gyro (±2000 °/s), both at 416 Hz.
    pub fn init(&self) -> anyhow::Result<()> {
        let id = self.bus.read_reg(I2C_ADDR_LSM6DS3, REG_WHO_AM_I)?;
        if !WHO_AM_I_EXPECTED.contains(&id) {
            anyhow::bail!("unexpected LSM6DS3 WHO_AM_I 0x{:02X}", id);
        }

        self.bus
            .write_reg(I2C_ADDR_LSM6DS3, REG_CTRL1_XL, CTRL1_XL_416HZ_2G)?;
        self.bus
            .write_reg(I2C_ADDR_LSM6DS3, REG_CTRL2_G, CTRL2_G_416HZ_2000DPS)?;

        log::info!("LSM6DS3 initialised (±2g, ±2000°/s, 416Hz)");
        Ok(())
    }

    /// Burst-read all 6 axes and convert to physical units.
    pub fn read_motion(&self) -> anyhow::Result<Motion> {
        let mut raw = [0u8; 12];
        self.bus.read_regs(I2C_ADDR_LSM6DS3, REG_OUTX_L_G, &mut raw)?;

        let axis = |i: usize, scale: f32| i16::from_le_bytes([raw[i], raw[i + 1]]) as f32 * scale;

        Ok(Motion {
            gyro: Vec3::new(
                axis(0, GYRO_SCALE_2000),
                axis(2, GYRO_SCALE_2000),
                axis(4, GYRO_SCALE_2000),
            ),
            accel: Vec3::new(
                axis(6, ACCEL_SCALE_2G),
                axis(8, ACCEL_SCALE_2G),
                axis(10, ACCEL_SCALE_2G),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::bus::fake::RegisterBus;

    fn bus_with_imu() -> Mutex<RegisterBus> {
        let mut bus = RegisterBus::default().with_device(I2C_ADDR_LSM6DS3);
        bus.set(I2C_ADDR_LSM6DS3, REG_WHO_AM_I, &[0x69]);
        Mutex::new(bus)
    }

    #[test]
    fn init_writes_ranges() {
        let bus = bus_with_imu();
        Lsm6ds3::new(SharedBus::new(&bus)).init().unwrap();

        let bus = bus.lock().unwrap();
        assert_eq!(bus.get(I2C_ADDR_LSM6DS3, REG_CTRL1_XL), 0x60);
        assert_eq!(bus.get(I2C_ADDR_LSM6DS3, REG_CTRL2_G), 0x6C);
    }

    #[test]
    fn init_rejects_wrong_identity() {
        let bus = bus_with_imu();
        bus.lock().unwrap().set(I2C_ADDR_LSM6DS3, REG_WHO_AM_I, &[0x68]);
        assert!(Lsm6ds3::new(SharedBus::new(&bus)).init().is_err());
        // Nothing configured on a foreign chip.
        assert_eq!(bus.lock().unwrap().get(I2C_ADDR_LSM6DS3, REG_CTRL1_XL), 0);
    }

    #[test]
    fn missing_device_fails_init_and_reads() {
        let bus = Mutex::new(RegisterBus::default());
        let imu = Lsm6ds3::new(SharedBus::new(&bus));
        assert!(imu.init().is_err());
        assert!(imu.read_motion().is_err());
    }

    #[test]
    fn motion_is_scaled() {
        let bus = bus_with_imu();
        // gyro x = 1000 LSB, accel z = 16393 LSB (~1 g)
        let mut raw = [0u8; 12];
        raw[0..2].copy_from_slice(&1000i16.to_le_bytes());
        raw[2..4].copy_from_slice(&(-500i16).to_le_bytes());
        raw[10..12].copy_from_slice(&16393i16.to_le_bytes());
        bus.lock().unwrap().set(I2C_ADDR_LSM6DS3, REG_OUTX_L_G, &raw);

        let motion = Lsm6ds3::new(SharedBus::new(&bus)).read_motion().unwrap();
        assert!((motion.gyro.x - 70.0).abs() < 1e-3);
        assert!((motion.gyro.y + 35.0).abs() < 1e-3);
        assert_eq!(motion.gyro.z, 0.0);
        assert!((motion.accel.z - 1.0).abs() < 1e-3);
        assert_eq!(motion.accel.x, 0.0);
    }
}
