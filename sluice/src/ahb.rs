//! The uniform AHB access contract shared by every bridge transport.

use std::io::{ErrorKind, Read, Write};

use crate::bridge::BridgeError;
use crate::region::{OutOfRange, SocRegion};

/// Window size for one bulk transfer call during a siphon.
///
/// Bounds the per-call memory footprint and the latency of a single
/// transport round trip.
pub const SIPHON_WINDOW: usize = 64 * 1024;

/// Access to the SoC's AHB interconnect through one bridge transport.
///
/// Implementations provide the 32-bit scalar accesses and may override the
/// single-window bulk accessors with a faster path. The windowed siphon
/// helpers stream whole address ranges to or from a byte stream and are
/// shared by every transport.
///
/// All operations are synchronous and block the caller until completion or
/// failure. Nothing at this layer retries, times out, or rolls back a
/// partial transfer.
pub trait Ahb: std::fmt::Debug {
    /// Name of the bridge driver backing this accessor.
    fn name(&self) -> &'static str;

    /// The addressable window of this transport.
    fn window(&self) -> SocRegion {
        SocRegion::full()
    }

    /// Read one 32-bit word at `addr`.
    fn read32(&mut self, addr: u32) -> Result<u32, BridgeError>;

    /// Write one 32-bit word at `addr`.
    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BridgeError>;

    /// Read `data.len()` bytes starting at `addr`.
    ///
    /// Callers pass at most one siphon window per call. The default
    /// implementation loops 32-bit accesses, splitting an unaligned head
    /// and tail around the aligned body.
    fn read(&mut self, mut addr: u32, data: &mut [u8]) -> Result<(), BridgeError> {
        let mut offset = 0usize;

        let head = ((4 - (addr as usize % 4)) % 4).min(data.len());
        if head != 0 {
            let shift = addr as usize % 4;
            let word = self.read32(addr & !3)?.to_le_bytes();
            data[..head].copy_from_slice(&word[shift..shift + head]);
            addr += head as u32;
            offset += head;
        }

        while data.len() - offset >= 4 {
            let word = self.read32(addr)?;
            data[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
            addr = addr.wrapping_add(4);
            offset += 4;
        }

        if offset < data.len() {
            let tail = data.len() - offset;
            let word = self.read32(addr)?.to_le_bytes();
            data[offset..].copy_from_slice(&word[..tail]);
        }

        Ok(())
    }

    /// Write `data` sequentially to bus addresses starting at `addr`.
    ///
    /// The default implementation performs read-modify-write cycles for the
    /// unaligned head and tail.
    fn write(&mut self, mut addr: u32, mut data: &[u8]) -> Result<(), BridgeError> {
        let head = ((4 - (addr as usize % 4)) % 4).min(data.len());
        if head != 0 {
            let shift = addr as usize % 4;
            let aligned = addr & !3;
            let mut word = self.read32(aligned)?.to_le_bytes();
            word[shift..shift + head].copy_from_slice(&data[..head]);
            self.write32(aligned, u32::from_le_bytes(word))?;
            addr += head as u32;
            data = &data[head..];
        }

        let mut chunks = data.chunks_exact(4);
        for chunk in &mut chunks {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.write32(addr, word)?;
            addr = addr.wrapping_add(4);
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            let mut word = self.read32(addr)?.to_le_bytes();
            word[..tail.len()].copy_from_slice(tail);
            self.write32(addr, u32::from_le_bytes(word))?;
        }

        Ok(())
    }

    /// Stream `length` bytes starting at `addr` into `sink`, one
    /// [`SIPHON_WINDOW`] at a time.
    ///
    /// The whole range is validated against the addressable window before
    /// the first byte moves. On a mid-transfer failure the error carries the
    /// number of bytes already delivered to `sink`; bytes already delivered
    /// are not undone.
    fn siphon_out(
        &mut self,
        addr: u32,
        length: u32,
        sink: &mut dyn Write,
    ) -> Result<u64, SiphonError> {
        self.window()
            .require(addr, length)
            .map_err(|fault| SiphonError::at(0, fault))?;

        let mut buf = vec![0u8; SIPHON_WINDOW];
        let mut transferred = 0u64;

        while transferred < length as u64 {
            let chunk = ((length as u64 - transferred) as usize).min(SIPHON_WINDOW);
            let cursor = addr + transferred as u32;

            self.read(cursor, &mut buf[..chunk])
                .map_err(|fault| SiphonError::at(transferred, fault))?;
            sink.write_all(&buf[..chunk])
                .map_err(|fault| SiphonError::at(transferred, SiphonFault::Sink(fault)))?;

            transferred += chunk as u64;
            tracing::trace!("siphoned out {}/{} bytes", transferred, length);
        }

        Ok(transferred)
    }

    /// Stream `length` bytes from `source` to bus addresses starting at
    /// `addr`, one [`SIPHON_WINDOW`] at a time.
    ///
    /// A source that ends before `length` bytes were consumed stops the
    /// transfer with [`SiphonFault::ShortInput`]; the error still reports
    /// how many bytes reached the bus. Partial writes are never rolled
    /// back.
    fn siphon_in(
        &mut self,
        addr: u32,
        length: u32,
        source: &mut dyn Read,
    ) -> Result<u64, SiphonError> {
        self.window()
            .require(addr, length)
            .map_err(|fault| SiphonError::at(0, fault))?;

        let mut buf = vec![0u8; SIPHON_WINDOW];
        let mut transferred = 0u64;

        while transferred < length as u64 {
            let want = ((length as u64 - transferred) as usize).min(SIPHON_WINDOW);

            let mut filled = 0usize;
            while filled < want {
                match source.read(&mut buf[filled..want]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(SiphonError::at(transferred, SiphonFault::Source(e))),
                }
            }

            if filled != 0 {
                self.write(addr + transferred as u32, &buf[..filled])
                    .map_err(|fault| SiphonError::at(transferred, fault))?;
                transferred += filled as u64;
            }

            if filled < want {
                return Err(SiphonError::at(
                    transferred,
                    SiphonFault::ShortInput {
                        requested: length as u64,
                    },
                ));
            }

            tracing::trace!("siphoned in {}/{} bytes", transferred, length);
        }

        Ok(transferred)
    }
}

/// A siphon transfer stopped before completion.
///
/// `transferred` counts the bytes that made it across before the fault so
/// the caller can judge whether the partial result is usable. The core
/// never undoes a partial transfer.
#[derive(Debug, thiserror::Error)]
#[error("bulk transfer stopped after {transferred} bytes")]
pub struct SiphonError {
    /// Bytes successfully transferred before the fault.
    pub transferred: u64,
    /// What stopped the transfer.
    #[source]
    pub fault: SiphonFault,
}

impl SiphonError {
    fn at(transferred: u64, fault: impl Into<SiphonFault>) -> Self {
        Self {
            transferred,
            fault: fault.into(),
        }
    }
}

/// The reason a siphon transfer stopped.
#[derive(Debug, thiserror::Error)]
pub enum SiphonFault {
    /// The range was rejected before the first byte moved.
    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),

    /// The bridge transport failed mid-transfer.
    #[error("bridge transport failed")]
    Bridge(#[from] BridgeError),

    /// The sink stream refused further bytes.
    #[error("could not write to the sink stream")]
    Sink(#[source] std::io::Error),

    /// The source stream failed.
    #[error("could not read from the source stream")]
    Source(#[source] std::io::Error),

    /// The source stream ended early. Distinct from a transport failure.
    #[error("source stream ended before {requested} bytes were supplied")]
    ShortInput {
        /// The length the transfer was asked to move.
        requested: u64,
    },
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bridge::fake::FakeBridge;
    use crate::bridge::Bridge;

    fn dram_bridge() -> Bridge {
        let window = SocRegion::new(0x8000_0000, 0x1_0000_0).unwrap();
        Bridge::new(FakeBridge::new("fake", window))
    }

    #[test]
    fn scalar_access_checked_against_window() {
        let mut bridge = dram_bridge();

        bridge.write32(0x8000_0000, 0xdead_beef).unwrap();
        assert_eq!(bridge.read32(0x8000_0000).unwrap(), 0xdead_beef);

        let below = bridge.read32(0x7fff_fffc).unwrap_err();
        assert!(matches!(below, BridgeError::OutOfRange(_)));

        let above = bridge.write32(0x8010_0000, 0).unwrap_err();
        assert!(matches!(above, BridgeError::OutOfRange(_)));
    }

    #[test]
    fn unaligned_bulk_access_round_trips() {
        let mut bridge = dram_bridge();

        let pattern: Vec<u8> = (0..23u8).collect();
        bridge.write(0x8000_0001, &pattern).unwrap();

        let mut readback = vec![0u8; pattern.len()];
        bridge.read(0x8000_0001, &mut readback).unwrap();
        assert_eq!(readback, pattern);
    }

    #[test]
    fn siphon_round_trip() {
        let mut bridge = dram_bridge();

        // More than one window, not window aligned.
        let len = SIPHON_WINDOW as u32 + 0x1234;
        let image: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();

        let written = bridge
            .siphon_in(0x8000_0000, len, &mut Cursor::new(&image))
            .unwrap();
        assert_eq!(written, len as u64);

        let mut captured = Vec::new();
        let read = bridge.siphon_out(0x8000_0000, len, &mut captured).unwrap();
        assert_eq!(read, len as u64);
        assert_eq!(captured, image);
    }

    #[test]
    fn siphon_rejects_range_before_transferring() {
        let mut bridge = dram_bridge();
        let mut sink = Vec::new();

        let err = bridge
            .siphon_out(0x80f0_0000, 0x20_0000, &mut sink)
            .unwrap_err();

        assert_eq!(err.transferred, 0);
        assert!(matches!(err.fault, SiphonFault::OutOfRange(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn siphon_in_reports_short_input() {
        let mut bridge = dram_bridge();

        let image = vec![0xa5u8; 100];
        let err = bridge
            .siphon_in(0x8000_0000, 400, &mut Cursor::new(&image))
            .unwrap_err();

        assert_eq!(err.transferred, 100);
        assert!(matches!(err.fault, SiphonFault::ShortInput { requested: 400 }));

        // The bytes that arrived were still written to the bus.
        let mut readback = vec![0u8; 100];
        bridge.read(0x8000_0000, &mut readback).unwrap();
        assert_eq!(readback, image);
    }

    #[test]
    fn siphon_out_reports_partial_progress_on_transport_failure() {
        let window = SocRegion::new(0x8000_0000, 0x4_0000).unwrap();
        let mut fake = FakeBridge::new("fake", window);
        fake.fail_reads_at(0x8001_0000);
        let mut bridge = Bridge::new(fake);

        let mut sink = Vec::new();
        let err = bridge
            .siphon_out(0x8000_0000, 0x3_0000, &mut sink)
            .unwrap_err();

        // The first full window was delivered before the fault.
        assert_eq!(err.transferred, SIPHON_WINDOW as u64);
        assert!(matches!(err.fault, SiphonFault::Bridge(_)));
        assert_eq!(sink.len(), SIPHON_WINDOW);
    }
}
