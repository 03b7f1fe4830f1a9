//! The SDRAM memory controller.

use crate::ahb::Ahb;
use crate::region::SocRegion;
use crate::soc::{DeviceHandle, Soc, SocError, SocGeneration};

/// Configuration register carrying the DRAM and VRAM size codes.
const MCR_CONF: u32 = 0x04;

const MCR_CONF_DRAM_SIZE: u32 = 0x3;
const MCR_CONF_VRAM_SIZE: u32 = 0x3 << 2;

/// The SDRAM memory controller of one probed SoC.
#[derive(Debug)]
pub struct Sdmc<'s, 'ahb> {
    soc: &'s mut Soc<'ahb>,
    base: u32,
}

impl<'s, 'ahb> Sdmc<'s, 'ahb> {
    pub(crate) fn new(soc: &'s mut Soc<'ahb>, handle: DeviceHandle) -> Self {
        let base = soc.device_base(handle);
        Self { soc, base }
    }

    fn read_reg(&mut self, offset: u32) -> Result<u32, SocError> {
        Ok(self.soc.ahb.read32(self.base + offset)?)
    }

    /// The usable DRAM region, decoded from the controller configuration.
    pub fn dram_region(&mut self) -> Result<SocRegion, SocError> {
        let conf = self.read_reg(MCR_CONF)?;

        let (start, unit): (u32, u32) = match self.soc.generation() {
            SocGeneration::Ast2400 => (0x4000_0000, 64 << 20),
            SocGeneration::Ast2500 => (0x8000_0000, 128 << 20),
            SocGeneration::Ast2600 => (0x8000_0000, 256 << 20),
        };
        let length = unit << (conf & MCR_CONF_DRAM_SIZE);

        Ok(SocRegion::sized(start, length))
    }

    /// The VRAM reservation carved out of the DRAM tail.
    pub fn vram_region(&mut self) -> Result<SocRegion, SocError> {
        let conf = self.read_reg(MCR_CONF)?;
        let length: u32 = (8 << 20) << ((conf & MCR_CONF_VRAM_SIZE) >> 2);

        let dram = self.dram_region()?;
        let start = (dram.end() - length as u64) as u32;

        Ok(SocRegion::sized(start, length))
    }

    /// Protection register consulted by the bridge-surface prober.
    pub(crate) fn protection(&mut self) -> Result<u32, SocError> {
        self.read_reg(0x08)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bridge::fake::FakeBridge;
    use crate::bridge::Bridge;

    fn bridge_with_conf(rev: u32, conf: u32) -> Bridge {
        Bridge::new(
            FakeBridge::unbounded("fake")
                .with_register(0x1e6e_207c, rev)
                .with_register(0x1e6e_0004, conf),
        )
    }

    #[test]
    fn ast2500_dram_decoding() {
        // Size codes: DRAM 3 (1 GiB), VRAM 2 (32 MiB).
        let mut bridge = bridge_with_conf(0x0403_0303, 0b1011);
        let mut soc = Soc::probe(&mut bridge).unwrap();
        let mut sdmc = soc.sdmc().unwrap();

        let dram = sdmc.dram_region().unwrap();
        let vram = sdmc.vram_region().unwrap();

        assert_eq!(dram, SocRegion::new(0x8000_0000, 0x4000_0000).unwrap());
        assert_eq!(vram, SocRegion::new(0xbe00_0000, 0x0200_0000).unwrap());
    }

    #[test]
    fn ast2400_dram_sits_lower() {
        // DRAM code 2 (256 MiB), VRAM code 0 (8 MiB).
        let mut bridge = bridge_with_conf(0x0201_0303, 0b0010);
        let mut soc = Soc::probe(&mut bridge).unwrap();
        let mut sdmc = soc.sdmc().unwrap();

        let dram = sdmc.dram_region().unwrap();
        let vram = sdmc.vram_region().unwrap();

        assert_eq!(dram.start(), 0x4000_0000);
        assert_eq!(dram.length(), 0x1000_0000);
        assert_eq!(vram.start(), 0x4f80_0000);
        assert_eq!(vram.length(), 0x0080_0000);
    }

    /// The default dump geometry a RAM read with no explicit range uses.
    #[test]
    fn default_dump_region_excludes_vram() {
        let mut bridge = bridge_with_conf(0x0403_0303, 0b1011);
        let soc = Soc::probe(&mut bridge).unwrap();

        let start = soc.dram().start();
        let length = soc.dram().length() - soc.vram().length();

        assert_eq!(start, 0x8000_0000);
        assert_eq!(length, 0x3e00_0000);
        assert_eq!(start as u64 + length as u64, soc.vram().start() as u64);
    }
}
