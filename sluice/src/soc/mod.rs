//! SoC identification and the on-chip device registry.

pub mod bridges;
mod lpc;
mod scu;
mod sdmc;
mod sfc;
mod uart_mux;
mod wdt;

pub use bridges::{BridgeControllerReport, BridgeMode};
pub use lpc::Lpc;
pub use scu::Scu;
pub use sdmc::Sdmc;
pub use sfc::Sfc;
pub use uart_mux::UartMux;
pub use wdt::Wdt;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ahb::Ahb;
use crate::bridge::{Bridge, BridgeError};
use crate::region::SocRegion;

/// Offset of the silicon revision register in the SCU.
const SCU_SILICON_REVISION: u32 = 0x1e6e_207c;
/// The AST2600 relocated the revision register to the head of the SCU.
const SCU_SILICON_REVISION_2600: u32 = 0x1e6e_2004;

/// The supported SoC generations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocGeneration {
    /// AST2400 family.
    Ast2400,
    /// AST2500 family.
    Ast2500,
    /// AST2600 family.
    Ast2600,
}

impl fmt::Display for SocGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocGeneration::Ast2400 => write!(f, "AST2400"),
            SocGeneration::Ast2500 => write!(f, "AST2500"),
            SocGeneration::Ast2600 => write!(f, "AST2600"),
        }
    }
}

/// Known silicon revision values and the steppings they identify.
const REVISIONS: &[(u32, SocGeneration, &str)] = &[
    (0x0200_0303, SocGeneration::Ast2400, "AST2400 A0"),
    (0x0201_0303, SocGeneration::Ast2400, "AST2400 A1"),
    (0x0400_0303, SocGeneration::Ast2500, "AST2500 A0"),
    (0x0401_0303, SocGeneration::Ast2500, "AST2500 A1"),
    (0x0403_0303, SocGeneration::Ast2500, "AST2500 A2"),
    (0x0500_0303, SocGeneration::Ast2600, "AST2600 A0"),
    (0x0501_0303, SocGeneration::Ast2600, "AST2600 A1"),
    (0x0502_0303, SocGeneration::Ast2600, "AST2600 A2"),
    (0x0503_0303, SocGeneration::Ast2600, "AST2600 A3"),
];

/// The kinds of on-chip controller the device registry can hand out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Clock and system control unit.
    ClockController,
    /// SDRAM memory controller.
    MemoryController,
    /// Firmware SPI flash controller.
    FlashController,
    /// LPC host interface controller.
    LpcController,
    /// UART route multiplexer.
    UartMux,
    /// Watchdog timer.
    Watchdog,
    /// PCIe host bridge configuration (carries the P2A aperture).
    PcieBridge,
    /// eSPI slave controller.
    EspiController,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::ClockController => "clock controller",
            DeviceKind::MemoryController => "memory controller",
            DeviceKind::FlashController => "flash controller",
            DeviceKind::LpcController => "LPC controller",
            DeviceKind::UartMux => "UART multiplexer",
            DeviceKind::Watchdog => "watchdog",
            DeviceKind::PcieBridge => "PCIe bridge",
            DeviceKind::EspiController => "eSPI controller",
        };
        f.write_str(name)
    }
}

/// One entry of a generation's device table.
#[derive(Debug)]
pub struct SocDevice {
    /// The controller kind this entry implements.
    pub kind: DeviceKind,
    /// Table name, e.g. `fmc`.
    pub name: &'static str,
    pub(crate) base: u32,
}

const fn dev(kind: DeviceKind, name: &'static str, base: u32) -> SocDevice {
    SocDevice { kind, name, base }
}

const AST2400_DEVICES: &[SocDevice] = &[
    dev(DeviceKind::ClockController, "scu", 0x1e6e_2000),
    dev(DeviceKind::MemoryController, "sdmc", 0x1e6e_0000),
    dev(DeviceKind::FlashController, "fmc", 0x1e62_0000),
    dev(DeviceKind::Watchdog, "wdt", 0x1e78_5000),
    dev(DeviceKind::LpcController, "lpc", 0x1e78_9000),
    dev(DeviceKind::UartMux, "uart-mux", 0x1e78_9000),
    dev(DeviceKind::PcieBridge, "pcie-bridge", 0x1e6e_2000),
];

const AST2500_DEVICES: &[SocDevice] = &[
    dev(DeviceKind::ClockController, "scu", 0x1e6e_2000),
    dev(DeviceKind::MemoryController, "sdmc", 0x1e6e_0000),
    dev(DeviceKind::FlashController, "fmc", 0x1e62_0000),
    dev(DeviceKind::Watchdog, "wdt", 0x1e78_5000),
    dev(DeviceKind::LpcController, "lpc", 0x1e78_9000),
    dev(DeviceKind::UartMux, "uart-mux", 0x1e78_9000),
    dev(DeviceKind::PcieBridge, "pcie-bridge", 0x1e6e_2000),
    dev(DeviceKind::EspiController, "espi", 0x1e6e_e000),
];

// The AST2600 dropped the PCIe VGA P2A aperture.
const AST2600_DEVICES: &[SocDevice] = &[
    dev(DeviceKind::ClockController, "scu", 0x1e6e_2000),
    dev(DeviceKind::MemoryController, "sdmc", 0x1e6e_0000),
    dev(DeviceKind::FlashController, "fmc", 0x1e62_0000),
    dev(DeviceKind::Watchdog, "wdt", 0x1e78_5000),
    dev(DeviceKind::LpcController, "lpc", 0x1e78_9000),
    dev(DeviceKind::UartMux, "uart-mux", 0x1e78_9000),
    dev(DeviceKind::EspiController, "espi", 0x1e6e_e000),
];

fn identify(rev: u32) -> Option<(SocGeneration, &'static str)> {
    REVISIONS
        .iter()
        .find(|(known, _, _)| *known == rev)
        .map(|(_, generation, stepping)| (*generation, *stepping))
}

fn device_table(generation: SocGeneration) -> &'static [SocDevice] {
    match generation {
        SocGeneration::Ast2400 => AST2400_DEVICES,
        SocGeneration::Ast2500 => AST2500_DEVICES,
        SocGeneration::Ast2600 => AST2600_DEVICES,
    }
}

fn flash_window(generation: SocGeneration) -> SocRegion {
    match generation {
        SocGeneration::Ast2400 => SocRegion::sized(0x2000_0000, 0x1000_0000),
        SocGeneration::Ast2500 => SocRegion::sized(0x2000_0000, 0x1000_0000),
        SocGeneration::Ast2600 => SocRegion::sized(0x2000_0000, 0x1000_0000),
    }
}

/// A handle into the SoC's device registry.
///
/// Handles are indices validated at lookup time and are only usable while
/// the [`Soc`] that issued them is alive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceHandle(usize);

/// SoC identification or device lookup failed.
#[derive(Debug, thiserror::Error)]
pub enum SocError {
    /// The identification registers matched no known generation.
    #[error("identification registers match no known SoC generation (read {rev:#010x})")]
    UnrecognizedChip {
        /// The silicon revision value that was read.
        rev: u32,
    },

    /// The identified generation does not implement the controller kind.
    #[error("the {0} is not present on this SoC generation")]
    DeviceNotPresent(DeviceKind),

    /// A named bridge controller does not exist on the chip.
    #[error("'{0}' is not a bridge controller on this SoC")]
    UnknownBridgeController(String),

    /// A bus access failed while talking to the SoC.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// One identified SoC behind an open bridge.
///
/// Borrows the [`Bridge`] exclusively for its lifetime; every device
/// accessor in turn borrows the `Soc`, so no handle can outlive the chip
/// and no two handles can drive the bus at once.
#[derive(Debug)]
pub struct Soc<'ahb> {
    pub(crate) ahb: &'ahb mut Bridge,
    generation: SocGeneration,
    revision: u32,
    stepping: &'static str,
    devices: &'static [SocDevice],
    dram: SocRegion,
    vram: SocRegion,
    flash: SocRegion,
}

impl<'ahb> Soc<'ahb> {
    /// Identify the SoC behind `ahb` and build its device registry.
    ///
    /// Reads the silicon revision, matches it against the known-generation
    /// table and constructs the memory regions from the memory controller's
    /// configuration.
    pub fn probe(ahb: &'ahb mut Bridge) -> Result<Self, SocError> {
        let rev = ahb.read32(SCU_SILICON_REVISION)?;

        let (revision, generation, stepping) = match identify(rev) {
            Some((generation, stepping)) => (rev, generation, stepping),
            None => {
                // An unfamiliar value may just mean the AST2600 layout,
                // where the revision register moved.
                let relocated = ahb.read32(SCU_SILICON_REVISION_2600)?;
                match identify(relocated) {
                    Some((generation @ SocGeneration::Ast2600, stepping)) => {
                        (relocated, generation, stepping)
                    }
                    _ => return Err(SocError::UnrecognizedChip { rev }),
                }
            }
        };

        tracing::info!("probed {} (silicon revision {:#010x})", stepping, revision);

        let mut soc = Self {
            ahb,
            generation,
            revision,
            stepping,
            devices: device_table(generation),
            dram: SocRegion::sized(0, 0),
            vram: SocRegion::sized(0, 0),
            flash: flash_window(generation),
        };

        let (dram, vram) = {
            let mut sdmc = soc.sdmc()?;
            (sdmc.dram_region()?, sdmc.vram_region()?)
        };
        soc.dram = dram;
        soc.vram = vram;

        tracing::debug!(
            "{} MiB DRAM at {:#010x}, {} MiB VRAM reserved",
            dram.length() >> 20,
            dram.start(),
            vram.length() >> 20,
        );

        Ok(soc)
    }

    /// The identified generation.
    pub fn generation(&self) -> SocGeneration {
        self.generation
    }

    /// The raw silicon revision value.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Human readable stepping, e.g. `AST2500 A2`.
    pub fn stepping(&self) -> &'static str {
        self.stepping
    }

    /// The usable DRAM region.
    pub fn dram(&self) -> SocRegion {
        self.dram
    }

    /// The VRAM reservation at the tail of DRAM.
    pub fn vram(&self) -> SocRegion {
        self.vram
    }

    /// The flash controller's AHB window.
    pub fn flash(&self) -> SocRegion {
        self.flash
    }

    /// Direct access to the underlying bridge.
    pub fn ahb(&mut self) -> &mut Bridge {
        self.ahb
    }

    /// Look up the controller of the given kind.
    pub fn device(&self, kind: DeviceKind) -> Result<DeviceHandle, SocError> {
        self.devices
            .iter()
            .position(|device| device.kind == kind)
            .map(DeviceHandle)
            .ok_or(SocError::DeviceNotPresent(kind))
    }

    /// Look up a controller by its table name, e.g. `fmc`.
    pub fn device_by_name(&self, name: &str) -> Option<DeviceHandle> {
        self.devices
            .iter()
            .position(|device| device.name == name)
            .map(DeviceHandle)
    }

    /// Every device the generation implements.
    pub fn devices(&self) -> impl Iterator<Item = (DeviceHandle, &'static SocDevice)> {
        self.devices
            .iter()
            .enumerate()
            .map(|(index, device)| (DeviceHandle(index), device))
    }

    pub(crate) fn device_base(&self, handle: DeviceHandle) -> u32 {
        self.devices[handle.0].base
    }

    /// The clock and system control unit.
    pub fn scu(&mut self) -> Result<Scu<'_, 'ahb>, SocError> {
        let handle = self.device(DeviceKind::ClockController)?;
        Ok(Scu::new(self, handle))
    }

    /// The SDRAM memory controller.
    pub fn sdmc(&mut self) -> Result<Sdmc<'_, 'ahb>, SocError> {
        let handle = self.device(DeviceKind::MemoryController)?;
        Ok(Sdmc::new(self, handle))
    }

    /// The firmware flash controller.
    pub fn sfc(&mut self) -> Result<Sfc<'_, 'ahb>, SocError> {
        let handle = self.device(DeviceKind::FlashController)?;
        Ok(Sfc::new(self, handle))
    }

    /// The LPC host interface controller.
    pub fn lpc(&mut self) -> Result<Lpc<'_, 'ahb>, SocError> {
        let handle = self.device(DeviceKind::LpcController)?;
        Ok(Lpc::new(self, handle))
    }

    /// The UART route multiplexer.
    pub fn uart_mux(&mut self) -> Result<UartMux<'_, 'ahb>, SocError> {
        let handle = self.device(DeviceKind::UartMux)?;
        Ok(UartMux::new(self, handle))
    }

    /// The watchdog timer.
    pub fn wdt(&mut self) -> Result<Wdt<'_, 'ahb>, SocError> {
        let handle = self.device(DeviceKind::Watchdog)?;
        Ok(Wdt::new(self, handle))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bridge::fake::FakeBridge;
    use crate::bridge::Bridge;

    /// An AST2500 A2 with 1 GiB DRAM and a 32 MiB VRAM reservation.
    pub(crate) fn ast2500_bridge() -> Bridge {
        Bridge::new(
            FakeBridge::unbounded("fake")
                .with_register(SCU_SILICON_REVISION, 0x0403_0303)
                // DRAM size code 3 (1 GiB), VRAM size code 2 (32 MiB).
                .with_register(0x1e6e_0004, 0b1011),
        )
    }

    #[test]
    fn probe_identifies_generation_and_regions() {
        let mut bridge = ast2500_bridge();
        let soc = Soc::probe(&mut bridge).unwrap();

        assert_eq!(soc.generation(), SocGeneration::Ast2500);
        assert_eq!(soc.stepping(), "AST2500 A2");
        assert_eq!(soc.dram().start(), 0x8000_0000);
        assert_eq!(soc.dram().length(), 0x4000_0000);
        assert_eq!(soc.vram().start(), 0xbe00_0000);
        assert_eq!(soc.vram().length(), 0x0200_0000);
    }

    #[test]
    fn unknown_revision_is_rejected() {
        let mut bridge = Bridge::new(
            FakeBridge::unbounded("fake").with_register(SCU_SILICON_REVISION, 0x1234_5678),
        );

        let err = Soc::probe(&mut bridge).unwrap_err();
        assert!(matches!(
            err,
            SocError::UnrecognizedChip { rev: 0x1234_5678 }
        ));
    }

    #[test]
    fn device_lookup_respects_the_generation() {
        let mut bridge = ast2500_bridge();
        let soc = Soc::probe(&mut bridge).unwrap();

        assert!(soc.device(DeviceKind::PcieBridge).is_ok());
        assert!(soc.device_by_name("fmc").is_some());
        assert!(soc.device_by_name("xdma").is_none());
    }

    #[test]
    fn ast2600_is_identified_through_the_relocated_register() {
        // Nothing recognizable at the classic offset; the relocated
        // register carries the revision.
        let mut bridge = Bridge::new(
            FakeBridge::unbounded("fake")
                .with_register(SCU_SILICON_REVISION_2600, 0x0503_0303)
                .with_register(0x1e6e_0004, 0b0001),
        );
        let soc = Soc::probe(&mut bridge).unwrap();

        assert_eq!(soc.generation(), SocGeneration::Ast2600);
        assert_eq!(soc.stepping(), "AST2600 A3");
        assert_eq!(soc.revision(), 0x0503_0303);
    }

    #[test]
    fn relocated_register_only_identifies_the_new_layout() {
        // An AST2400 value at the relocated offset is not credible.
        let mut bridge = Bridge::new(
            FakeBridge::unbounded("fake").with_register(SCU_SILICON_REVISION_2600, 0x0201_0303),
        );

        let err = Soc::probe(&mut bridge).unwrap_err();
        assert!(matches!(err, SocError::UnrecognizedChip { rev: 0 }));
    }

    #[test]
    fn ast2600_has_no_p2a_bridge() {
        let mut bridge = Bridge::new(
            FakeBridge::unbounded("fake")
                .with_register(SCU_SILICON_REVISION_2600, 0x0503_0303)
                .with_register(0x1e6e_0004, 0b0001),
        );
        let soc = Soc::probe(&mut bridge).unwrap();

        assert_eq!(soc.generation(), SocGeneration::Ast2600);
        let err = soc.device(DeviceKind::PcieBridge).unwrap_err();
        assert!(matches!(
            err,
            SocError::DeviceNotPresent(DeviceKind::PcieBridge)
        ));
    }
}
