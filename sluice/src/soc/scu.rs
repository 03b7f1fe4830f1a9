//! The clock and system control unit.

use crate::ahb::Ahb;
use crate::soc::{DeviceHandle, Soc, SocError, SocGeneration};

/// Hardware strap register, classic SCU layout.
const SCU_STRAP: u32 = 0x70;
/// Hardware strap register on the AST2600's relocated layout.
const SCU_STRAP_2600: u32 = 0x500;

/// The clock and system control unit of one probed SoC.
#[derive(Debug)]
pub struct Scu<'s, 'ahb> {
    soc: &'s mut Soc<'ahb>,
    base: u32,
}

impl<'s, 'ahb> Scu<'s, 'ahb> {
    pub(crate) fn new(soc: &'s mut Soc<'ahb>, handle: DeviceHandle) -> Self {
        let base = soc.device_base(handle);
        Self { soc, base }
    }

    pub(crate) fn read_reg(&mut self, offset: u32) -> Result<u32, SocError> {
        Ok(self.soc.ahb.read32(self.base + offset)?)
    }

    /// The hardware strap value sampled at reset.
    pub fn strap(&mut self) -> Result<u32, SocError> {
        let offset = match self.soc.generation() {
            SocGeneration::Ast2400 | SocGeneration::Ast2500 => SCU_STRAP,
            SocGeneration::Ast2600 => SCU_STRAP_2600,
        };
        self.read_reg(offset)
    }
}
