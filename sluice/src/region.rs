//! Ranges of the SoC's 32-bit AHB address space.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A contiguous range of the 32-bit AHB address space.
///
/// Regions describe DRAM, the VRAM reservation carved out of its tail, the
/// flash controller window and the addressable window of a bridge transport.
/// A region is immutable once constructed and is guaranteed not to wrap the
/// address space: `start + length <= 1 << 32`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocRegion {
    start: u32,
    length: u32,
}

impl SocRegion {
    /// Create a region, validating that it does not wrap the address space.
    pub fn new(start: u32, length: u32) -> Result<Self, OutOfRange> {
        if start as u64 + length as u64 > 1 << 32 {
            return Err(OutOfRange {
                addr: start,
                length,
                window: Self::full(),
            });
        }

        Ok(Self { start, length })
    }

    /// A compiled-in region whose bounds are known not to wrap.
    pub(crate) const fn sized(start: u32, length: u32) -> Self {
        assert!(start as u64 + length as u64 <= 1 << 32);
        Self { start, length }
    }

    /// The full 32-bit address space (bar the final byte, which a
    /// `u32` length cannot express).
    pub const fn full() -> Self {
        Self {
            start: 0,
            length: u32::MAX,
        }
    }

    /// First address covered by the region.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Number of bytes covered by the region.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// One past the last address covered by the region.
    pub fn end(&self) -> u64 {
        self.start as u64 + self.length as u64
    }

    /// Returns true if `addr` lies within the region.
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && (addr as u64) < self.end()
    }

    /// Returns true if `other` lies entirely within the region.
    pub fn contains_region(&self, other: &SocRegion) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Validate that `length` bytes starting at `addr` lie entirely within
    /// the region.
    pub fn require(&self, addr: u32, length: u32) -> Result<(), OutOfRange> {
        let fits = addr >= self.start && addr as u64 + length as u64 <= self.end();

        if fits {
            Ok(())
        } else {
            Err(OutOfRange {
                addr,
                length,
                window: *self,
            })
        }
    }
}

impl fmt::Display for SocRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#010x}..{:#010x}]", self.start, self.end())
    }
}

/// An address range fell outside the addressable window.
#[derive(Debug, Clone, thiserror::Error)]
#[error("address range {addr:#010x}+{length:#x} is outside the addressable window {window}")]
pub struct OutOfRange {
    /// Start of the offending range.
    pub addr: u32,
    /// Length of the offending range in bytes.
    pub length: u32,
    /// The window the range was checked against.
    pub window: SocRegion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_region_is_rejected() {
        assert!(SocRegion::new(0xffff_0000, 0x2_0000).is_err());
        assert!(SocRegion::new(0xffff_0000, 0x1_0000).is_ok());
    }

    #[test]
    fn containment() {
        let dram = SocRegion::new(0x8000_0000, 0x4000_0000).unwrap();

        assert!(dram.contains(0x8000_0000));
        assert!(dram.contains(0xbfff_ffff));
        assert!(!dram.contains(0x7fff_ffff));
        assert!(!dram.contains(0xc000_0000));

        let vram = SocRegion::new(0xbe00_0000, 0x0200_0000).unwrap();
        assert!(dram.contains_region(&vram));
        assert!(!vram.contains_region(&dram));
    }

    #[test]
    fn require_checks_the_whole_range() {
        let win = SocRegion::new(0x1e6e_0000, 0x1_0000).unwrap();

        assert!(win.require(0x1e6e_0000, 4).is_ok());
        assert!(win.require(0x1e6e_fffc, 4).is_ok());
        assert!(win.require(0x1e6e_fffd, 4).is_err());
        assert!(win.require(0x1e6d_fffc, 4).is_err());
    }
}
