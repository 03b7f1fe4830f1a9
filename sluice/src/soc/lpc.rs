//! The LPC host interface controller.

use crate::ahb::Ahb;
use crate::soc::{DeviceHandle, Soc, SocError};

/// Host interface control register 5.
pub(crate) const HICR5: u32 = 0x80;

/// iLPC2AHB decode enable.
pub(crate) const HICR5_EN_L2H: u32 = 1 << 8;
/// Restrict iLPC2AHB cycles to reads.
pub(crate) const HICR5_RO_L2H: u32 = 1 << 6;

/// The LPC host interface controller of one probed SoC.
#[derive(Debug)]
pub struct Lpc<'s, 'ahb> {
    soc: &'s mut Soc<'ahb>,
    base: u32,
}

impl<'s, 'ahb> Lpc<'s, 'ahb> {
    pub(crate) fn new(soc: &'s mut Soc<'ahb>, handle: DeviceHandle) -> Self {
        let base = soc.device_base(handle);
        Self { soc, base }
    }

    pub(crate) fn read_reg(&mut self, offset: u32) -> Result<u32, SocError> {
        Ok(self.soc.ahb.read32(self.base + offset)?)
    }

    /// Raw host interface control register 5.
    pub fn hicr5(&mut self) -> Result<u32, SocError> {
        self.read_reg(HICR5)
    }

    /// Whether the host can reach the AHB through the iLPC2AHB device.
    pub fn ilpc2ahb_enabled(&mut self) -> Result<bool, SocError> {
        Ok(self.hicr5()? & HICR5_EN_L2H != 0)
    }

    /// Whether iLPC2AHB cycles are restricted to reads.
    pub fn ilpc2ahb_read_only(&mut self) -> Result<bool, SocError> {
        Ok(self.hicr5()? & HICR5_RO_L2H != 0)
    }
}
