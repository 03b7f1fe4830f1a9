//! Assessment of the bridge surfaces the chip itself exposes.
//!
//! This is independent of how this tool reached the chip: the prober asks,
//! through whatever bridge is open, which transports the SoC currently
//! offers to the outside and how exposed each one is. It is read-only.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::soc::{DeviceKind, Soc, SocError, SocGeneration};

/// SCU PCIe configuration register, classic layout.
const SCU_PCIE_CONFIG: u32 = 0x180;
/// VGA MMIO decode enable in the PCIe configuration.
const PCIE_CONFIG_VGA_MMIO: u32 = 1 << 1;
/// Per-region P2A write filter bits.
const PCIE_CONFIG_P2A_FILTER: u32 = 0xf << 8;

/// SCU misc control register, classic layout.
const SCU_MISC: u32 = 0x2c;
/// Debug UART disable bit in misc control.
const MISC_DEBUG_UART_DISABLE: u32 = 1 << 10;

/// Debug control register on the AST2600.
const SCU_DEBUG_CTRL_2600: u32 = 0xc8;
/// UART5 and UART1 debug disable bits.
const DEBUG_CTRL_UART_MASK: u32 = 0x3;

/// X-DMA disable strap on the AST2600.
const STRAP_2600_XDMA_DISABLE: u32 = 1 << 14;
/// X-DMA constrained-access bit in the SDMC protection register.
const SDMC_PROT_XDMA_CONSTRAINED: u32 = 1 << 25;

/// How exposed one bridge surface is, from the chip's perspective.
///
/// Ordered by exposure: `Permissive` grants unrestricted bus access,
/// `Restricted` grants filtered access, `Disabled` grants none. "Most
/// exposed" is therefore the minimum of a set of modes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BridgeMode {
    /// Unrestricted read/write bus access.
    Permissive,
    /// Access is filtered or read-only.
    Restricted,
    /// The surface is switched off.
    Disabled,
}

impl fmt::Display for BridgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeMode::Permissive => write!(f, "permissive"),
            BridgeMode::Restricted => write!(f, "restricted"),
            BridgeMode::Disabled => write!(f, "disabled"),
        }
    }
}

/// One bridge surface and its current exposure.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeControllerReport {
    /// The surface, by interface name.
    pub name: &'static str,
    /// Its current exposure.
    pub mode: BridgeMode,
}

/// The bridge surfaces every supported generation can expose.
const CONTROLLERS: &[&str] = &["ilpc", "p2a", "xdma", "debug"];

impl<'ahb> Soc<'ahb> {
    /// Report every bridge surface with its individual exposure.
    pub fn list_bridge_controllers(&mut self) -> Result<Vec<BridgeControllerReport>, SocError> {
        CONTROLLERS
            .iter()
            .map(|name| {
                Ok(BridgeControllerReport {
                    name,
                    mode: self.bridge_controller_mode(name)?,
                })
            })
            .collect()
    }

    /// The most exposed mode across every bridge surface, or the mode of
    /// one named interface.
    pub fn probe_bridge_controllers(
        &mut self,
        interface: Option<&str>,
    ) -> Result<BridgeMode, SocError> {
        match interface {
            Some(name) => self.bridge_controller_mode(name),
            None => {
                let mut discovered = BridgeMode::Disabled;
                for name in CONTROLLERS {
                    let mode = self.bridge_controller_mode(name)?;
                    tracing::debug!("{}: {}", name, mode);
                    discovered = discovered.min(mode);
                }
                Ok(discovered)
            }
        }
    }

    fn bridge_controller_mode(&mut self, name: &str) -> Result<BridgeMode, SocError> {
        match name {
            "ilpc" => self.ilpc_mode(),
            "p2a" => self.p2a_mode(),
            "xdma" => self.xdma_mode(),
            "debug" => self.debug_uart_mode(),
            other => Err(SocError::UnknownBridgeController(other.to_string())),
        }
    }

    fn ilpc_mode(&mut self) -> Result<BridgeMode, SocError> {
        let mut lpc = self.lpc()?;

        if !lpc.ilpc2ahb_enabled()? {
            Ok(BridgeMode::Disabled)
        } else if lpc.ilpc2ahb_read_only()? {
            Ok(BridgeMode::Restricted)
        } else {
            Ok(BridgeMode::Permissive)
        }
    }

    fn p2a_mode(&mut self) -> Result<BridgeMode, SocError> {
        // No PCIe VGA function, no aperture.
        if self.device(DeviceKind::PcieBridge).is_err() {
            return Ok(BridgeMode::Disabled);
        }

        let pcie = self.scu()?.read_reg(SCU_PCIE_CONFIG)?;

        if pcie & PCIE_CONFIG_VGA_MMIO == 0 {
            Ok(BridgeMode::Disabled)
        } else if pcie & PCIE_CONFIG_P2A_FILTER != 0 {
            Ok(BridgeMode::Restricted)
        } else {
            Ok(BridgeMode::Permissive)
        }
    }

    fn xdma_mode(&mut self) -> Result<BridgeMode, SocError> {
        if self.generation() == SocGeneration::Ast2600 {
            let strap = self.scu()?.strap()?;
            if strap & STRAP_2600_XDMA_DISABLE != 0 {
                return Ok(BridgeMode::Disabled);
            }
        }

        let protection = self.sdmc()?.protection()?;
        if protection & SDMC_PROT_XDMA_CONSTRAINED != 0 {
            Ok(BridgeMode::Restricted)
        } else {
            Ok(BridgeMode::Permissive)
        }
    }

    fn debug_uart_mode(&mut self) -> Result<BridgeMode, SocError> {
        match self.generation() {
            SocGeneration::Ast2400 | SocGeneration::Ast2500 => {
                let misc = self.scu()?.read_reg(SCU_MISC)?;
                if misc & MISC_DEBUG_UART_DISABLE != 0 {
                    Ok(BridgeMode::Disabled)
                } else {
                    Ok(BridgeMode::Permissive)
                }
            }
            SocGeneration::Ast2600 => {
                let ctrl = self.scu()?.read_reg(SCU_DEBUG_CTRL_2600)?;
                match (ctrl & DEBUG_CTRL_UART_MASK).count_ones() {
                    0 => Ok(BridgeMode::Permissive),
                    1 => Ok(BridgeMode::Restricted),
                    _ => Ok(BridgeMode::Disabled),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bridge::fake::FakeBridge;
    use crate::bridge::Bridge;
    use crate::soc::lpc;

    const SCU: u32 = 0x1e6e_2000;
    const LPC: u32 = 0x1e78_9000;
    const SDMC: u32 = 0x1e6e_0000;

    fn locked_down_2500() -> FakeBridge {
        FakeBridge::unbounded("fake")
            .with_register(0x1e6e_207c, 0x0403_0303)
            .with_register(SDMC + 0x04, 0b1011)
            // iLPC2AHB decode off, P2A MMIO decode off, debug UART strapped off.
            .with_register(LPC + 0x80, 0)
            .with_register(SCU + SCU_PCIE_CONFIG, 0)
            .with_register(SCU + SCU_MISC, MISC_DEBUG_UART_DISABLE)
            .with_register(SDMC + 0x08, SDMC_PROT_XDMA_CONSTRAINED)
    }

    #[test]
    fn fully_locked_chip_reports_restricted_at_worst() {
        let mut bridge = Bridge::new(locked_down_2500());
        let mut soc = Soc::probe(&mut bridge).unwrap();

        // The constrained X-DMA engine is the only surface left.
        assert_eq!(
            soc.probe_bridge_controllers(None).unwrap(),
            BridgeMode::Restricted
        );
    }

    #[test]
    fn one_permissive_surface_dominates() {
        let mut bridge = Bridge::new(
            locked_down_2500()
                // Turn iLPC2AHB decode back on, unrestricted.
                .with_register(LPC + 0x80, lpc::HICR5_EN_L2H),
        );
        let mut soc = Soc::probe(&mut bridge).unwrap();

        assert_eq!(
            soc.probe_bridge_controllers(None).unwrap(),
            BridgeMode::Permissive
        );
    }

    #[test]
    fn read_only_ilpc_is_restricted() {
        let mut bridge = Bridge::new(
            locked_down_2500()
                .with_register(LPC + 0x80, lpc::HICR5_EN_L2H | lpc::HICR5_RO_L2H),
        );
        let mut soc = Soc::probe(&mut bridge).unwrap();

        assert_eq!(
            soc.probe_bridge_controllers(Some("ilpc")).unwrap(),
            BridgeMode::Restricted
        );
    }

    #[test]
    fn listing_reports_every_surface() {
        let mut bridge = Bridge::new(locked_down_2500());
        let mut soc = Soc::probe(&mut bridge).unwrap();

        let rows = soc.list_bridge_controllers().unwrap();
        let by_name: Vec<(&str, BridgeMode)> =
            rows.iter().map(|row| (row.name, row.mode)).collect();

        assert_eq!(
            by_name,
            vec![
                ("ilpc", BridgeMode::Disabled),
                ("p2a", BridgeMode::Disabled),
                ("xdma", BridgeMode::Restricted),
                ("debug", BridgeMode::Disabled),
            ]
        );
    }

    #[test]
    fn p2a_is_disabled_by_construction_on_ast2600() {
        let mut bridge = Bridge::new(
            FakeBridge::unbounded("fake")
                .with_register(0x1e6e_2004, 0x0503_0303)
                .with_register(SDMC + 0x04, 0b0001),
        );
        let mut soc = Soc::probe(&mut bridge).unwrap();

        assert_eq!(
            soc.probe_bridge_controllers(Some("p2a")).unwrap(),
            BridgeMode::Disabled
        );
    }

    #[test]
    fn unknown_interface_is_an_error() {
        let mut bridge = Bridge::new(locked_down_2500());
        let mut soc = Soc::probe(&mut bridge).unwrap();

        let err = soc.probe_bridge_controllers(Some("espi")).unwrap_err();
        assert!(matches!(err, SocError::UnknownBridgeController(name) if name == "espi"));
    }

    #[test]
    fn mode_ordering_tracks_exposure() {
        assert!(BridgeMode::Permissive < BridgeMode::Restricted);
        assert!(BridgeMode::Restricted < BridgeMode::Disabled);
    }
}
