//! AHB access through the iLPC2AHB logical device of the BMC's SuperIO.
//!
//! Drives the SuperIO index/data pair on host I/O ports 0x2e/0x2f through
//! `/dev/port`, one byte cycle at a time. Slow, but reachable from the host
//! whenever SuperIO decoding is enabled.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;

use crate::ahb::Ahb;
use crate::bridge::{Bridge, BridgeCreationError, BridgeError, BridgeFactory};

const SIO_INDEX: u64 = 0x2e;
const SIO_DATA: u64 = 0x2f;

/// SuperIO unlock key, written twice to the index port.
const SIO_UNLOCK: u8 = 0xa5;
/// SuperIO lock key.
const SIO_LOCK: u8 = 0xaa;

/// Logical device number select register.
const SIO_LDN: u8 = 0x07;
/// The iLPC2AHB logical device.
const LDN_ILPC2AHB: u8 = 0x0d;

/// iLPC2AHB register file: address (MSB first), data (MSB first), cycle
/// length, trigger.
const ILPC_ADDR: u8 = 0xf0;
const ILPC_DATA: u8 = 0xf4;
const ILPC_LEN: u8 = 0xf8;
const ILPC_TRIGGER: u8 = 0xfe;

/// Length code for a 32-bit cycle.
const ILPC_LEN_FOUR: u8 = 0x02;
/// Value written to the trigger register to fire a write cycle.
const ILPC_TRIGGER_WRITE: u8 = 0xcf;

#[derive(Debug)]
pub(crate) struct IlpcFactory;

impl BridgeFactory for IlpcFactory {
    fn name(&self) -> &'static str {
        "ilpc"
    }

    fn description(&self) -> &'static str {
        "iLPC2AHB bridge through the SuperIO on the host LPC bus"
    }

    fn probe(&self) -> Result<Bridge, BridgeError> {
        Ok(Bridge::new(Ilpc::open()?))
    }
}

/// AHB access through SuperIO iLPC2AHB cycles.
#[derive(Debug)]
pub struct Ilpc {
    port: File,
}

impl Ilpc {
    /// Open `/dev/port`, unlock the SuperIO and select the iLPC2AHB
    /// logical device.
    pub fn open() -> Result<Self, BridgeError> {
        let port = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/port")
            .map_err(BridgeCreationError::from_open)?;

        let ilpc = Self { port };

        ilpc.outb(SIO_INDEX, SIO_UNLOCK)?;
        ilpc.outb(SIO_INDEX, SIO_UNLOCK)?;

        ilpc.sio_write(SIO_LDN, LDN_ILPC2AHB)?;
        if ilpc.sio_read(SIO_LDN)? != LDN_ILPC2AHB {
            // Nothing is decoding the SuperIO ports.
            return Err(BridgeCreationError::NotPresent.into());
        }

        tracing::debug!("selected iLPC2AHB logical device");
        Ok(ilpc)
    }

    fn outb(&self, port: u64, value: u8) -> Result<(), BridgeError> {
        self.port
            .write_all_at(&[value], port)
            .map_err(BridgeError::Transport)
    }

    fn inb(&self, port: u64) -> Result<u8, BridgeError> {
        let mut byte = [0u8];
        self.port
            .read_exact_at(&mut byte, port)
            .map_err(BridgeError::Transport)?;
        Ok(byte[0])
    }

    fn sio_write(&self, reg: u8, value: u8) -> Result<(), BridgeError> {
        self.outb(SIO_INDEX, reg)?;
        self.outb(SIO_DATA, value)
    }

    fn sio_read(&self, reg: u8) -> Result<u8, BridgeError> {
        self.outb(SIO_INDEX, reg)?;
        self.inb(SIO_DATA)
    }

    fn set_cycle(&self, addr: u32) -> Result<(), BridgeError> {
        for (i, byte) in addr.to_be_bytes().iter().enumerate() {
            self.sio_write(ILPC_ADDR + i as u8, *byte)?;
        }
        self.sio_write(ILPC_LEN, ILPC_LEN_FOUR)
    }
}

impl Ahb for Ilpc {
    fn name(&self) -> &'static str {
        "ilpc"
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BridgeError> {
        self.set_cycle(addr)?;
        // Reading the trigger register fires the read cycle.
        self.sio_read(ILPC_TRIGGER)?;

        let mut data = [0u8; 4];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = self.sio_read(ILPC_DATA + i as u8)?;
        }
        Ok(u32::from_be_bytes(data))
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BridgeError> {
        self.set_cycle(addr)?;
        for (i, byte) in value.to_be_bytes().iter().enumerate() {
            self.sio_write(ILPC_DATA + i as u8, *byte)?;
        }
        self.sio_write(ILPC_TRIGGER, ILPC_TRIGGER_WRITE)
    }
}

impl Drop for Ilpc {
    fn drop(&mut self) {
        // Re-lock the SuperIO; nothing to report if the write fails.
        let _ = self.outb(SIO_INDEX, SIO_LOCK);
    }
}
