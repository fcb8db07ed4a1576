// VitalsWatch: LSM6DS3 Embedded Pedometer
//
// The step counter runs inside the IMU's digital-functions block.  Enabling
// that block (CTRL10_C) also zeroes the counter, so every reconfiguration
// starts counting from 0 again.

use std::fmt;

use embedded_hal::i2c::I2c;

use crate::bus::SharedBus;
use crate::config::*;
use crate::drivers::imu::REG_CTRL1_XL;

pub(crate) const REG_INT1_CTRL: u8 = 0x0D;
pub(crate) const REG_CTRL10_C: u8 = 0x19;
pub(crate) const REG_STEP_COUNTER_L: u8 = 0x4B;
pub(crate) const REG_STEP_COUNTER_H: u8 = 0x4C;
pub(crate) const REG_TAP_CFG: u8 = 0x58;

const FS_XL_2G: u8 = 0x00;
const ODR_XL_26HZ: u8 = 0x20;
const CTRL10_FUNC_EN: u8 = 0x3E; // embedded functions + gyro axes
const TAP_CFG_PEDO_EN: u8 = 0x40;
const INT1_STEP_DETECTOR: u8 = 0x10;

/// Configuration sequence, in the order it has to be applied.
const CONFIG_SEQUENCE: [(u8, u8); 4] = [
    (REG_CTRL1_XL, FS_XL_2G | ODR_XL_26HZ),
    (REG_CTRL10_C, CTRL10_FUNC_EN),
    (REG_TAP_CFG, TAP_CFG_PEDO_EN),
    (REG_INT1_CTRL, INT1_STEP_DETECTOR),
];

/// One or more pedometer configuration writes were not acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedometerConfigError {
    pub failures: u8,
}

impl fmt::Display for PedometerConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pedometer configuration failed ({} of {} writes)",
            self.failures,
            CONFIG_SEQUENCE.len()
        )
    }
}

impl std::error::Error for PedometerConfigError {}

pub struct Pedometer<'a, I2C> {
    bus: SharedBus<'a, I2C>,
}

impl<'a, I2C: I2c> Pedometer<'a, I2C> {
    pub fn new(bus: SharedBus<'a, I2C>) -> Self {
        Self { bus }
    }

    /// Apply the full configuration sequence.  Every write is attempted even
    /// after a failure; the error carries how many were rejected.
    pub fn configure(&self) -> Result<(), PedometerConfigError> {
        let mut failures = 0u8;
        for (reg, value) in CONFIG_SEQUENCE {
            if let Err(e) = self.bus.write_reg(I2C_ADDR_LSM6DS3, reg, value) {
                log::error!("Pedometer register 0x{:02X} write failed: {}", reg, e);
                failures += 1;
            }
        }

        if failures != 0 {
            return Err(PedometerConfigError { failures });
        }
        log::info!("Pedometer configured (±2g, 26Hz, step detector on INT1)");
        Ok(())
    }

    /// Re-enable the embedded functions, which zeroes the step counter.
    pub fn reset_step_counter(&self) -> anyhow::Result<()> {
        self.bus
            .write_reg(I2C_ADDR_LSM6DS3, REG_CTRL10_C, CTRL10_FUNC_EN)?;
        log::info!("Step counter reset");
        Ok(())
    }

    /// Steps since the last reset.  The two bytes are read separately, so a
    /// step landing between them can tear the value by one LSB.
    pub fn read_step_count(&self) -> anyhow::Result<u16> {
        let high = self.bus.read_reg(I2C_ADDR_LSM6DS3, REG_STEP_COUNTER_H)?;
        let low = self.bus.read_reg(I2C_ADDR_LSM6DS3, REG_STEP_COUNTER_L)?;
        Ok(((high as u16) << 8) | low as u16)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::bus::fake::{Access, RegisterBus};

    fn imu_bus() -> Mutex<RegisterBus> {
        let mut bus = RegisterBus::default().with_device(I2C_ADDR_LSM6DS3);
        bus.clear_on_write(
            I2C_ADDR_LSM6DS3,
            REG_CTRL10_C,
            &[REG_STEP_COUNTER_L, REG_STEP_COUNTER_H],
        );
        Mutex::new(bus)
    }

    #[test]
    fn configure_writes_sequence_in_order() {
        let bus = imu_bus();
        Pedometer::new(SharedBus::new(&bus)).configure().unwrap();

        let bus = bus.lock().unwrap();
        let writes: Vec<(u8, u8)> = bus
            .log
            .iter()
            .filter_map(|a| match a {
                Access::Write { reg, data, .. } => Some((*reg, data[0])),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![(0x10, 0x20), (0x19, 0x3E), (0x58, 0x40), (0x0D, 0x10)]);
    }

    #[test]
    fn every_single_write_failure_is_fatal() {
        for (reg, _) in CONFIG_SEQUENCE {
            let bus = imu_bus();
            bus.lock().unwrap().fail_write(I2C_ADDR_LSM6DS3, reg);
            let err = Pedometer::new(SharedBus::new(&bus)).configure().unwrap_err();
            assert_eq!(err.failures, 1);

            // Remaining writes are still attempted.
            assert_eq!(bus.lock().unwrap().log.len(), CONFIG_SEQUENCE.len());
        }
    }

    #[test]
    fn missing_imu_counts_all_failures() {
        let bus = Mutex::new(RegisterBus::default());
        let err = Pedometer::new(SharedBus::new(&bus)).configure().unwrap_err();
        assert_eq!(err, PedometerConfigError { failures: 4 });
        assert_eq!(err.to_string(), "pedometer configuration failed (4 of 4 writes)");
    }

    #[test]
    fn step_count_reads_high_then_low() {
        let bus = imu_bus();
        bus.lock()
            .unwrap()
            .set(I2C_ADDR_LSM6DS3, REG_STEP_COUNTER_L, &[0xFC, 0x05]);
        let pedometer = Pedometer::new(SharedBus::new(&bus));
        assert_eq!(pedometer.read_step_count().unwrap(), 1532);

        let bus = bus.lock().unwrap();
        let regs: Vec<u8> = bus
            .log
            .iter()
            .filter_map(|a| match a {
                Access::Read { reg, .. } => Some(*reg),
                _ => None,
            })
            .collect();
        assert_eq!(regs, vec![REG_STEP_COUNTER_H, REG_STEP_COUNTER_L]);
    }

    #[test]
    fn reset_zeroes_counter() {
        let bus = imu_bus();
        let pedometer = Pedometer::new(SharedBus::new(&bus));
        pedometer.configure().unwrap();
        bus.lock()
            .unwrap()
            .set(I2C_ADDR_LSM6DS3, REG_STEP_COUNTER_L, &[0x10, 0x02]);
        assert_eq!(pedometer.read_step_count().unwrap(), 528);

        pedometer.reset_step_counter().unwrap();
        assert_eq!(pedometer.read_step_count().unwrap(), 0);
    }
}
