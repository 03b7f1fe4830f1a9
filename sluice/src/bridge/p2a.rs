//! AHB access through the P2A bridge on the BMC's PCIe VGA function.
//!
//! The VGA function's MMIO BAR carries a 64 KiB aperture into the AHB at
//! BAR offset `0x10000`, steered by a remap register in the control block
//! below it. Reachable from the host the BMC manages, which is exactly what
//! makes it interesting for assessment.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::ahb::Ahb;
use crate::bridge::physmap::PhysMap;
use crate::bridge::{Bridge, BridgeCreationError, BridgeError, BridgeFactory};

/// PCI vendor id of the BMC's VGA function.
const PCI_VID_ASPEED: u32 = 0x1a03;
/// PCI device id of the VGA function.
const PCI_DID_ASPEED_VGA: u32 = 0x2000;

/// Offset of the remap register in the MMIO BAR's control block.
const P2A_REMAP: usize = 0xf004;
/// Offset of the aperture enable register.
const P2A_ENABLE: usize = 0xf000;
/// Offset of the 64 KiB AHB aperture within the MMIO BAR.
const P2A_APERTURE: usize = 0x10000;
/// Total span of the MMIO BAR we drive: control block plus aperture.
const P2A_BAR_LEN: usize = 0x20000;

#[derive(Debug)]
pub(crate) struct P2aFactory;

impl BridgeFactory for P2aFactory {
    fn name(&self) -> &'static str {
        "p2a"
    }

    fn description(&self) -> &'static str {
        "PCIe-to-AHB aperture on the BMC VGA function"
    }

    fn probe(&self) -> Result<Bridge, BridgeError> {
        Ok(Bridge::new(P2a::open()?))
    }
}

/// AHB access through the VGA function's P2A aperture.
#[derive(Debug)]
pub struct P2a {
    bar: PhysMap,
    remapped: Option<u32>,
}

impl P2a {
    /// Locate the VGA function on the host PCI bus and map its MMIO BAR.
    pub fn open() -> Result<Self, BridgeError> {
        let device = find_vga_function().map_err(BridgeError::CouldNotBeCreated)?;

        let resource = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device.join("resource1"))
            .map_err(BridgeCreationError::from_open)?;

        let bar = Self::map_bar(&resource)?;

        tracing::debug!("mapped P2A MMIO BAR from {}", device.display());
        let mut p2a = Self {
            bar,
            remapped: None,
        };
        p2a.bar.write32(P2A_ENABLE, 1);
        Ok(p2a)
    }

    fn map_bar(resource: &File) -> Result<PhysMap, BridgeError> {
        PhysMap::map(resource, 0, P2A_BAR_LEN).map_err(BridgeError::Transport)
    }

    /// Steer the aperture over `addr` and return the BAR offset to use.
    fn aperture(&mut self, addr: u32) -> usize {
        let base = addr & !0xffff;

        if self.remapped != Some(base) {
            self.bar.write32(P2A_REMAP, base);
            // Read back to post the remap before touching the aperture.
            let _ = self.bar.read32(P2A_REMAP);
            self.remapped = Some(base);
        }

        P2A_APERTURE + (addr & 0xffff) as usize
    }
}

impl Ahb for P2a {
    fn name(&self) -> &'static str {
        "p2a"
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BridgeError> {
        let offset = self.aperture(addr);
        Ok(self.bar.read32(offset))
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BridgeError> {
        let offset = self.aperture(addr);
        self.bar.write32(offset, value);
        Ok(())
    }
}

/// Find the BMC VGA function under `/sys/bus/pci/devices`.
fn find_vga_function() -> Result<PathBuf, BridgeCreationError> {
    let devices = Path::new("/sys/bus/pci/devices");

    let entries = match std::fs::read_dir(devices) {
        Ok(entries) => entries,
        // No PCI bus at all (e.g. running on the BMC): not present.
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(BridgeCreationError::NotPresent)
        }
        Err(e) => return Err(BridgeCreationError::Io(e)),
    };

    for entry in entries {
        let entry = entry.map_err(BridgeCreationError::Io)?;
        let path = entry.path();

        if read_pci_id(&path.join("vendor")) == Some(PCI_VID_ASPEED)
            && read_pci_id(&path.join("device")) == Some(PCI_DID_ASPEED_VGA)
        {
            return Ok(path);
        }
    }

    Err(BridgeCreationError::NotPresent)
}

fn read_pci_id(path: &Path) -> Option<u32> {
    let raw = std::fs::read_to_string(path).ok()?;
    u32::from_str_radix(raw.trim().trim_start_matches("0x"), 16).ok()
}
