//! The firmware SPI flash controller.

use crate::ahb::Ahb;
use crate::region::SocRegion;
use crate::soc::{DeviceHandle, Soc, SocError};

/// CE type setting register.
const SFC_CE_TYPE: u32 = 0x00;

/// The firmware flash controller of one probed SoC.
///
/// The flash command set itself lives outside this crate; this handle
/// anchors the controller's AHB window and its raw configuration for the
/// commands built on top.
#[derive(Debug)]
pub struct Sfc<'s, 'ahb> {
    soc: &'s mut Soc<'ahb>,
    base: u32,
    window: SocRegion,
}

impl<'s, 'ahb> Sfc<'s, 'ahb> {
    pub(crate) fn new(soc: &'s mut Soc<'ahb>, handle: DeviceHandle) -> Self {
        let base = soc.device_base(handle);
        let window = soc.flash();
        Self { soc, base, window }
    }

    /// The controller's AHB-mapped flash window.
    pub fn window(&self) -> SocRegion {
        self.window
    }

    /// Raw CE type configuration.
    pub fn ce_type(&mut self) -> Result<u32, SocError> {
        Ok(self.soc.ahb.read32(self.base + SFC_CE_TYPE)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fake::FakeBridge;
    use crate::bridge::Bridge;

    #[test]
    fn window_matches_the_generation() {
        let mut bridge = Bridge::new(
            FakeBridge::unbounded("fake")
                .with_register(0x1e6e_207c, 0x0403_0303)
                .with_register(0x1e6e_0004, 0b1011),
        );
        let mut soc = Soc::probe(&mut bridge).unwrap();
        let flash = soc.flash();

        let sfc = soc.sfc().unwrap();
        assert_eq!(sfc.window(), flash);
        assert_eq!(flash.start(), 0x2000_0000);
    }
}
