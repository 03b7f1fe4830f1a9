//! The UART route multiplexer.
//!
//! Routing lives in the LPC controller's HICR9/HICRA registers on every
//! supported generation. The console takeover built on top of this is out
//! of scope here; the multiplexer only reports its routing state.

use crate::ahb::Ahb;
use crate::soc::{DeviceHandle, Soc, SocError};

const HICR9: u32 = 0x98;
const HICRA: u32 = 0x9c;

/// The UART route multiplexer of one probed SoC.
#[derive(Debug)]
pub struct UartMux<'s, 'ahb> {
    soc: &'s mut Soc<'ahb>,
    base: u32,
}

impl<'s, 'ahb> UartMux<'s, 'ahb> {
    pub(crate) fn new(soc: &'s mut Soc<'ahb>, handle: DeviceHandle) -> Self {
        let base = soc.device_base(handle);
        Self { soc, base }
    }

    /// Raw routing control value.
    pub fn routing(&mut self) -> Result<u32, SocError> {
        Ok(self.soc.ahb.read32(self.base + HICRA)?)
    }

    /// Raw loopback and interrupt routing value.
    pub fn loopback(&mut self) -> Result<u32, SocError> {
        Ok(self.soc.ahb.read32(self.base + HICR9)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fake::FakeBridge;
    use crate::bridge::Bridge;

    #[test]
    fn routing_reads_the_lpc_register_file() {
        let mut bridge = Bridge::new(
            FakeBridge::unbounded("fake")
                .with_register(0x1e6e_207c, 0x0403_0303)
                .with_register(0x1e6e_0004, 0b1011)
                .with_register(0x1e78_9000 + HICRA, 0x0003_6000),
        );
        let mut soc = Soc::probe(&mut bridge).unwrap();

        let mut mux = soc.uart_mux().unwrap();
        assert_eq!(mux.routing().unwrap(), 0x0003_6000);
        assert_eq!(mux.loopback().unwrap(), 0);
    }
}
