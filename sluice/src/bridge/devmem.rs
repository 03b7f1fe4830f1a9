//! Direct AHB access through a local `/dev/mem` mapping.
//!
//! Only usable when the tool runs on the BMC itself, which also makes it
//! the cheapest and fastest transport; it therefore carries the highest
//! negotiation priority.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

use crate::ahb::Ahb;
use crate::bridge::physmap::PhysMap;
use crate::bridge::{Bridge, BridgeCreationError, BridgeError, BridgeFactory};

/// Span of one on-demand mapping window.
const MAP_WINDOW: u32 = 64 * 1024;

#[derive(Debug)]
pub(crate) struct DevMemFactory;

impl BridgeFactory for DevMemFactory {
    fn name(&self) -> &'static str {
        "devmem"
    }

    fn description(&self) -> &'static str {
        "Direct /dev/mem mapping on the BMC itself"
    }

    fn probe(&self) -> Result<Bridge, BridgeError> {
        Ok(Bridge::new(DevMem::open()?))
    }
}

/// AHB access through `/dev/mem`, remapping a 64 KiB window on demand.
#[derive(Debug)]
pub struct DevMem {
    mem: File,
    window: Option<(u32, PhysMap)>,
}

impl DevMem {
    /// Open `/dev/mem` for MMIO access.
    pub fn open() -> Result<Self, BridgeError> {
        let mem = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .map_err(BridgeCreationError::from_open)?;

        Ok(Self { mem, window: None })
    }

    /// Return the mapping covering `len` bytes at `addr`, remapping if the
    /// current window does not cover the span.
    fn map_for(&mut self, addr: u32, len: usize) -> Result<(&PhysMap, usize), BridgeError> {
        let covered = self.window.as_ref().is_some_and(|(base, map)| {
            addr >= *base && (addr - *base) as usize + len <= map.len()
        });

        if !covered {
            let base = addr & !(MAP_WINDOW - 1);
            let span = ((addr - base) as usize + len).max(MAP_WINDOW as usize);
            let map = PhysMap::map(&self.mem, base as u64, span).map_err(BridgeError::Transport)?;
            tracing::trace!("remapped /dev/mem window to {:#010x}+{:#x}", base, span);
            self.window = Some((base, map));
        }

        let (base, map) = self.window.as_ref().unwrap();
        Ok((map, (addr - base) as usize))
    }
}

impl Ahb for DevMem {
    fn name(&self) -> &'static str {
        "devmem"
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BridgeError> {
        let (map, offset) = self.map_for(addr, 4)?;
        Ok(map.read32(offset))
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BridgeError> {
        let (map, offset) = self.map_for(addr, 4)?;
        map.write32(offset, value);
        Ok(())
    }
}
