//! The watchdog timer.

use crate::ahb::Ahb;
use crate::soc::{DeviceHandle, Soc, SocError};

const WDT_RELOAD: u32 = 0x04;
const WDT_RESTART: u32 = 0x08;
const WDT_CTRL: u32 = 0x0c;

/// Magic value the restart register requires.
const WDT_RESTART_MAGIC: u32 = 0x4755;

const WDT_CTRL_ENABLE: u32 = 1 << 0;
const WDT_CTRL_RESET_SYSTEM: u32 = 1 << 1;

/// The watchdog timer of one probed SoC.
#[derive(Debug)]
pub struct Wdt<'s, 'ahb> {
    soc: &'s mut Soc<'ahb>,
    base: u32,
}

impl<'s, 'ahb> Wdt<'s, 'ahb> {
    pub(crate) fn new(soc: &'s mut Soc<'ahb>, handle: DeviceHandle) -> Self {
        let base = soc.device_base(handle);
        Self { soc, base }
    }

    fn write_reg(&mut self, offset: u32, value: u32) -> Result<(), SocError> {
        Ok(self.soc.ahb.write32(self.base + offset, value)?)
    }

    /// Arm the watchdog for an immediate full-SoC reset.
    pub fn reset_soc(&mut self) -> Result<(), SocError> {
        tracing::info!("resetting the SoC via the watchdog");

        self.write_reg(WDT_RELOAD, 0x10)?;
        self.write_reg(WDT_RESTART, WDT_RESTART_MAGIC)?;
        self.write_reg(WDT_CTRL, WDT_CTRL_ENABLE | WDT_CTRL_RESET_SYSTEM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahb::Ahb;
    use crate::bridge::fake::FakeBridge;
    use crate::bridge::Bridge;

    #[test]
    fn reset_arms_the_watchdog() {
        let mut bridge = Bridge::new(
            FakeBridge::unbounded("fake")
                .with_register(0x1e6e_207c, 0x0403_0303)
                .with_register(0x1e6e_0004, 0b1011),
        );

        {
            let mut soc = Soc::probe(&mut bridge).unwrap();
            soc.wdt().unwrap().reset_soc().unwrap();
        }

        assert_eq!(bridge.read32(0x1e78_5008).unwrap(), WDT_RESTART_MAGIC);
        assert_eq!(
            bridge.read32(0x1e78_500c).unwrap(),
            WDT_CTRL_ENABLE | WDT_CTRL_RESET_SYSTEM
        );
    }
}
