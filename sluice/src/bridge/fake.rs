#![allow(missing_docs)] // Don't require docs for test code

//! An in-memory bridge for tests and dry runs.

use std::collections::HashMap;
use std::io;

use crate::ahb::Ahb;
use crate::bridge::{Bridge, BridgeCreationError, BridgeError, BridgeFactory};
use crate::region::SocRegion;

type ReadHandler = Box<dyn FnMut(u32) -> Result<u32, BridgeError> + Send>;
type WriteHandler = Box<dyn FnMut(u32, u32) -> Result<(), BridgeError> + Send>;

/// A bridge backed by a sparse in-memory register map.
///
/// Word addresses not written yet read back as zero. Reads and writes can be
/// intercepted with handlers, and a hard transport failure can be scheduled
/// at a specific address.
pub struct FakeBridge {
    name: &'static str,
    window: SocRegion,
    words: HashMap<u32, u32>,
    read_handler: Option<ReadHandler>,
    write_handler: Option<WriteHandler>,
    fail_reads_at: Option<u32>,
    fail_writes_at: Option<u32>,
}

impl FakeBridge {
    pub fn new(name: &'static str, window: SocRegion) -> Self {
        Self {
            name,
            window,
            words: HashMap::new(),
            read_handler: None,
            write_handler: None,
            fail_reads_at: None,
            fail_writes_at: None,
        }
    }

    /// A fake spanning the full address space.
    pub fn unbounded(name: &'static str) -> Self {
        Self::new(name, SocRegion::full())
    }

    /// Preload a register value.
    pub fn with_register(mut self, addr: u32, value: u32) -> Self {
        self.words.insert(addr, value);
        self
    }

    /// Intercept every read.
    pub fn set_read_handler(&mut self, handler: ReadHandler) {
        self.read_handler = Some(handler);
    }

    /// Intercept every write.
    pub fn set_write_handler(&mut self, handler: WriteHandler) {
        self.write_handler = Some(handler);
    }

    /// Fail any read touching the word at `addr` with a transport error.
    pub fn fail_reads_at(&mut self, addr: u32) {
        self.fail_reads_at = Some(addr);
    }

    /// Fail any write touching the word at `addr` with a transport error.
    pub fn fail_writes_at(&mut self, addr: u32) {
        self.fail_writes_at = Some(addr);
    }

    fn transport_fault() -> BridgeError {
        BridgeError::Transport(io::Error::new(io::ErrorKind::Other, "injected fault"))
    }
}

impl std::fmt::Debug for FakeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeBridge")
            .field("name", &self.name)
            .field("window", &self.window)
            .field("words", &self.words.len())
            .finish()
    }
}

impl Ahb for FakeBridge {
    fn name(&self) -> &'static str {
        self.name
    }

    fn window(&self) -> SocRegion {
        self.window
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BridgeError> {
        if self.fail_reads_at == Some(addr) {
            return Err(Self::transport_fault());
        }

        if let Some(handler) = self.read_handler.as_mut() {
            return handler(addr);
        }

        Ok(self.words.get(&addr).copied().unwrap_or(0))
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BridgeError> {
        if self.fail_writes_at == Some(addr) {
            return Err(Self::transport_fault());
        }

        if let Some(handler) = self.write_handler.as_mut() {
            return handler(addr, value);
        }

        self.words.insert(addr, value);
        Ok(())
    }
}

/// What a [`FakeFactory`] does when negotiation probes it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FakeOutcome {
    /// Open an unbounded [`FakeBridge`] carrying the factory's name.
    Open,
    /// Report the transport as absent.
    NotPresent,
    /// Report the transport as present but unopenable for lack of
    /// privilege.
    AccessDenied,
}

/// A scriptable factory for negotiation tests.
#[derive(Debug)]
pub struct FakeFactory {
    name: &'static str,
    outcome: FakeOutcome,
}

impl FakeFactory {
    pub fn new(name: &'static str, outcome: FakeOutcome) -> Self {
        Self { name, outcome }
    }
}

impl BridgeFactory for FakeFactory {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "In-memory fake bridge"
    }

    fn probe(&self) -> Result<Bridge, BridgeError> {
        match self.outcome {
            FakeOutcome::Open => Ok(Bridge::new(FakeBridge::unbounded(self.name))),
            FakeOutcome::NotPresent => Err(BridgeCreationError::NotPresent.into()),
            FakeOutcome::AccessDenied => {
                Err(BridgeCreationError::InsufficientPrivilege(None).into())
            }
        }
    }
}
