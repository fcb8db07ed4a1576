// VitalsWatch: MCP9808 Ambient Temperature Driver

use embedded_hal::i2c::I2c;

use crate::bus::SharedBus;
use crate::config::*;

const REG_AMBIENT: u8 = 0x05;
const REG_MANUFACTURER_ID: u8 = 0x06;
const REG_DEVICE_ID: u8 = 0x07;

const MANUFACTURER_ID: u16 = 0x0054;
const DEVICE_ID: u8 = 0x04;

pub struct Mcp9808<'a, I2C> {
    bus: SharedBus<'a, I2C>,
}

impl<'a, I2C: I2c> Mcp9808<'a, I2C> {
    pub fn new(bus: SharedBus<'a, I2C>) -> Self {
        Self { bus }
    }

    /// Check manufacturer and device IDs.  The sensor powers up in
    /// continuous conversion mode, so nothing needs to be written.
    pub fn init(&self) -> anyhow::Result<()> {
        let manufacturer = self.read_u16(REG_MANUFACTURER_ID)?;
        let device = self.read_u16(REG_DEVICE_ID)?;
        if manufacturer != MANUFACTURER_ID || (device >> 8) as u8 != DEVICE_ID {
            anyhow::bail!(
                "unexpected MCP9808 ids (manufacturer 0x{:04X}, device 0x{:04X})",
                manufacturer,
                device
            );
        }
        log::info!("MCP9808 initialised");
        Ok(())
    }

    /// Ambient temperature in °C (0.0625 °C resolution).
    pub fn read_temperature(&self) -> anyhow::Result<f32> {
        let raw = self.read_u16(REG_AMBIENT)? & 0x1FFF;
        // 13-bit two's complement; shift the sign bit up to i16's.
        let signed = ((raw << 3) as i16) >> 3;
        Ok(signed as f32 * 0.0625)
    }

    fn read_u16(&self, reg: u8) -> anyhow::Result<u16> {
        let mut buf = [0u8; 2];
        self.bus.read_regs(I2C_ADDR_MCP9808, reg, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
}
