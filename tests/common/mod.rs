// Shared fakes for the integration tests: a register-map I2C bus holding the
// three sensors, and recording sinks.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use vitalswatch::config::*;
use vitalswatch::publish::ble::{Characteristic, GattNotifier};
use vitalswatch::publish::telemetry::{Connectivity, HttpGet};

pub const REG_WHO_AM_I: u8 = 0x0F;
pub const REG_CTRL10_C: u8 = 0x19;
pub const REG_OUTX_L_G: u8 = 0x22;
pub const REG_STEP_COUNTER_L: u8 = 0x4B;
pub const REG_PULSE_ADDR: u8 = 0x04;
pub const REG_PULSE_RESULTS: u8 = 0x0C;
pub const REG_PULSE_TEMP: u8 = 0x14;
pub const REG_MCP_AMBIENT: u8 = 0x05;
pub const REG_MCP_MANUFACTURER_ID: u8 = 0x06;
pub const REG_MCP_DEVICE_ID: u8 = 0x07;

#[derive(Default)]
pub struct Board {
    regs: std::collections::HashMap<u8, Vec<u8>>,
    failing_writes: Vec<(u8, u8)>,
    pub reads: usize,
    /// `(device, register)` of every read, in order.
    pub read_log: Vec<(u8, u8)>,
}

impl Board {
    /// All three sensors present and answering with a plausible reading.
    pub fn healthy() -> Self {
        let mut board = Self::default();
        board.set(I2C_ADDR_LSM6DS3, REG_WHO_AM_I, &[0x69]);
        board.set(I2C_ADDR_PULSE_OX, REG_PULSE_ADDR, &[0x00, 0x20]);
        board.set(I2C_ADDR_MCP9808, REG_MCP_MANUFACTURER_ID, &[0x00, 0x54]);
        board.set(I2C_ADDR_MCP9808, REG_MCP_DEVICE_ID, &[0x04, 0x00]);
        board.set_vitals(72, 98);
        board.set(I2C_ADDR_PULSE_OX, REG_PULSE_TEMP, &[36, 10]);
        // 24.25 °C
        board.set(I2C_ADDR_MCP9808, REG_MCP_AMBIENT, &[0x01, 0x84]);
        board
    }

    /// Store `bytes` at register `reg`.  MCP9808 registers are 16-bit words,
    /// the other two devices use one byte per register.
    pub fn set(&mut self, addr: u8, reg: u8, bytes: &[u8]) {
        let start = offset(addr, reg);
        let regs = self.regs.entry(addr).or_insert_with(|| vec![0u8; 512]);
        regs[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn set_vitals(&mut self, heart_rate: u8, spo2: u8) {
        self.set(I2C_ADDR_PULSE_OX, REG_PULSE_RESULTS, &[spo2, 0, 0, 0, 0, heart_rate, 0, 0]);
    }

    pub fn set_steps(&mut self, steps: u16) {
        self.set(I2C_ADDR_LSM6DS3, REG_STEP_COUNTER_L, &steps.to_le_bytes());
    }

    pub fn set_motion(&mut self, gyro: [i16; 3], accel: [i16; 3]) {
        let mut raw = Vec::with_capacity(12);
        for v in gyro.iter().chain(accel.iter()) {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        self.set(I2C_ADDR_LSM6DS3, REG_OUTX_L_G, &raw);
    }

    pub fn fail_write(&mut self, addr: u8, reg: u8) {
        self.failing_writes.push((addr, reg));
    }
}

fn offset(addr: u8, reg: u8) -> usize {
    if addr == I2C_ADDR_MCP9808 {
        reg as usize * 2
    } else {
        reg as usize
    }
}

impl ErrorType for Board {
    type Error = ErrorKind;
}

impl I2c for Board {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        if !self.regs.contains_key(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        let mut pointer = 0u8;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else { continue };
                    pointer = reg;
                    if data.is_empty() {
                        continue;
                    }
                    if self.failing_writes.contains(&(address, reg)) {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                    }
                    self.set(address, reg, data);
                    // Enabling the embedded functions zeroes the step counter.
                    if address == I2C_ADDR_LSM6DS3 && reg == REG_CTRL10_C {
                        self.set_steps(0);
                    }
                }
                Operation::Read(buf) => {
                    self.reads += 1;
                    self.read_log.push((address, pointer));
                    let start = offset(address, pointer);
                    let regs = &self.regs[&address];
                    buf.copy_from_slice(&regs[start..start + buf.len()]);
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording sinks
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct Gatt(pub Rc<RefCell<Vec<(Characteristic, String)>>>);

impl GattNotifier for Gatt {
    fn set_and_notify(&mut self, characteristic: Characteristic, value: &[u8]) -> anyhow::Result<()> {
        self.0
            .borrow_mut()
            .push((characteristic, String::from_utf8(value.to_vec())?));
        Ok(())
    }
}

#[derive(Clone)]
pub struct Link(pub Rc<RefCell<bool>>);

impl Connectivity for Link {
    fn is_connected(&mut self) -> bool {
        *self.0.borrow()
    }
}

#[derive(Clone, Default)]
pub struct Http(pub Rc<RefCell<Vec<String>>>);

impl HttpGet for Http {
    fn get(&mut self, url: &str) -> anyhow::Result<u16> {
        self.0.borrow_mut().push(url.to_owned());
        Ok(200)
    }
}
