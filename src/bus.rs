// VitalsWatch: Shared I2C Bus
//
// All three sensors hang off one I2C controller.  Each driver keeps a
// reference to the same mutex and locks it for exactly one transaction.

use std::sync::Mutex;

use anyhow::anyhow;
use embedded_hal::i2c::I2c;

/// Handle to an I2C bus shared by several register-level drivers.
pub struct SharedBus<'a, I2C> {
    bus: &'a Mutex<I2C>,
}

impl<I2C> Clone for SharedBus<'_, I2C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I2C> Copy for SharedBus<'_, I2C> {}

impl<'a, I2C: I2c> SharedBus<'a, I2C> {
    pub fn new(bus: &'a Mutex<I2C>) -> Self {
        Self { bus }
    }

    /// Write `value` to register `reg` of device `addr`.
    pub fn write_reg(&self, addr: u8, reg: u8, value: u8) -> anyhow::Result<()> {
        self.write(addr, &[reg, value])
    }

    /// Raw write; the first byte is the register pointer.
    pub fn write(&self, addr: u8, bytes: &[u8]) -> anyhow::Result<()> {
        let mut bus = self.lock()?;
        bus.write(addr, bytes)
            .map_err(|e| anyhow!("i2c write to 0x{:02X} failed: {:?}", addr, e))
    }

    /// Set the register pointer to `reg`, then read `buf.len()` bytes.
    pub fn read_regs(&self, addr: u8, reg: u8, buf: &mut [u8]) -> anyhow::Result<()> {
        let mut bus = self.lock()?;
        bus.write_read(addr, &[reg], buf)
            .map_err(|e| anyhow!("i2c read of 0x{:02X}/0x{:02X} failed: {:?}", addr, reg, e))
    }

    pub fn read_reg(&self, addr: u8, reg: u8) -> anyhow::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_regs(addr, reg, &mut buf)?;
        Ok(buf[0])
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'a, I2C>> {
        self.bus.lock().map_err(|_| anyhow!("i2c bus mutex poisoned"))
    }
}
