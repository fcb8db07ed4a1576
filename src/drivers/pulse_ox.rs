// VitalsWatch: Pulse-Oximeter Driver
//
// DFRobot SEN0344 module (MAX30102 front end plus an on-board MCU that runs
// the heart-rate/SpO2 algorithm).  The MCU publishes results in a small
// register file; a zero result means "no valid reading yet".

use embedded_hal::i2c::I2c;

use crate::bus::SharedBus;
use crate::config::*;
use crate::sample::{Vitals, UNAVAILABLE};

const REG_DEVICE_ADDR: u8 = 0x04;
const REG_RESULTS: u8 = 0x0C; // SpO2, reserved, heart rate (u32 BE), reserved
const REG_TEMPERATURE: u8 = 0x14;
const REG_COLLECT: u8 = 0x20;

const DEVICE_ADDR_EXPECTED: u16 = 0x0020;
const COLLECT_START: [u8; 2] = [0x00, 0x01];

pub struct PulseOximeter<'a, I2C> {
    bus: SharedBus<'a, I2C>,
}

impl<'a, I2C: I2c> PulseOximeter<'a, I2C> {
    pub fn new(bus: SharedBus<'a, I2C>) -> Self {
        Self { bus }
    }

    /// Check presence and tell the module to start measuring.
    pub fn init(&self) -> anyhow::Result<()> {
        let mut buf = [0u8; 2];
        self.bus.read_regs(I2C_ADDR_PULSE_OX, REG_DEVICE_ADDR, &mut buf)?;
        let addr = u16::from_be_bytes(buf);
        if addr != DEVICE_ADDR_EXPECTED {
            anyhow::bail!("pulse oximeter reported address 0x{:04X}", addr);
        }

        let [hi, lo] = COLLECT_START;
        self.bus.write(I2C_ADDR_PULSE_OX, &[REG_COLLECT, hi, lo])?;

        log::info!("Pulse oximeter initialised, collection started");
        Ok(())
    }

    /// Latest heart rate and SpO2.  Either may be the [`UNAVAILABLE`]
    /// sentinel when the module has no confident reading (e.g. poor skin
    /// contact).
    pub fn read_vitals(&self) -> anyhow::Result<Vitals> {
        let mut raw = [0u8; 8];
        self.bus.read_regs(I2C_ADDR_PULSE_OX, REG_RESULTS, &mut raw)?;

        let spo2 = raw[0];
        let heart_rate = u32::from_be_bytes([raw[2], raw[3], raw[4], raw[5]]);

        Ok(Vitals {
            heart_rate: if heart_rate == 0 { UNAVAILABLE } else { heart_rate as f32 },
            spo2: if spo2 == 0 { UNAVAILABLE } else { spo2 as f32 },
        })
    }

    /// Temperature of the sensor board, which sits against the skin (°C).
    pub fn read_skin_temperature(&self) -> anyhow::Result<f32> {
        let mut raw = [0u8; 2];
        self.bus.read_regs(I2C_ADDR_PULSE_OX, REG_TEMPERATURE, &mut raw)?;
        Ok(raw[0] as f32 + raw[1] as f32 / 100.0)
    }
}
