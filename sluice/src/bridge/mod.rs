//! Bridge transports: the physical paths from this host to the BMC's AHB.

pub(crate) mod debug;
#[cfg(target_os = "linux")]
pub(crate) mod devmem;
#[cfg(any(test, feature = "test"))]
pub mod fake;
#[cfg(target_os = "linux")]
pub(crate) mod ilpc;
pub mod list;
#[cfg(target_os = "linux")]
pub(crate) mod p2a;
#[cfg(target_os = "linux")]
mod physmap;

pub use list::{BridgeAttempt, BridgeDriverInfo, BridgeRegistry, NoBridgeAvailable};

use std::io;

use crate::ahb::Ahb;
use crate::connection::{ConnectionArgs, ConnectionError};
use crate::region::{OutOfRange, SocRegion};

/// The bridge could not be opened.
#[derive(Debug, thiserror::Error)]
pub enum BridgeCreationError {
    /// The transport is not reachable from the local environment.
    #[error("bridge transport is not present")]
    NotPresent,

    /// The transport exists but this process lacks the privilege to open it.
    ///
    /// Kept distinct from [`BridgeCreationError::NotPresent`] so the caller
    /// can suggest escalating privilege instead of scanning further.
    #[error("bridge device could not be opened, check the permissions")]
    InsufficientPrivilege(#[source] Option<io::Error>),

    /// The connection arguments are invalid for this bridge.
    #[error("invalid connection arguments")]
    MalformedConnection(#[from] ConnectionError),

    /// Opening the transport failed with an I/O error.
    #[error("could not open the bridge transport")]
    Io(#[source] io::Error),
}

impl BridgeCreationError {
    /// Classify an open-time I/O error, mapping permission failures to the
    /// distinguished privilege case.
    pub(crate) fn from_open(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::InsufficientPrivilege(Some(error)),
            io::ErrorKind::NotFound => Self::NotPresent,
            _ => Self::Io(error),
        }
    }
}

/// An error during use of a bridge transport.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The bridge could not be created.
    #[error("bridge could not be created")]
    CouldNotBeCreated(#[from] BridgeCreationError),

    /// An access fell outside the transport's addressable window.
    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),

    /// The underlying transport reported an I/O failure.
    ///
    /// Never retried at this layer.
    #[error("transport I/O failed")]
    Transport(#[source] io::Error),

    /// The remote end violated the bridge protocol.
    #[error("bridge protocol violation: {0}")]
    Protocol(&'static str),
}

/// One open bridge transport, owning exclusive access to the AHB.
///
/// A `Bridge` is produced by negotiation (see
/// [`BridgeRegistry::connect`]) and is the capability every
/// downstream operation is built on. It validates each access against the
/// transport's addressable window before handing it to the driver. Dropping
/// the bridge releases the transport.
#[derive(Debug)]
pub struct Bridge {
    inner: Box<dyn Ahb>,
}

impl Bridge {
    /// Wrap a specific bridge driver.
    pub fn new(bridge: impl Ahb + 'static) -> Self {
        Self {
            inner: Box::new(bridge),
        }
    }
}

impl Ahb for Bridge {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn window(&self) -> SocRegion {
        self.inner.window()
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BridgeError> {
        self.inner.window().require(addr, 4)?;
        self.inner.read32(addr)
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BridgeError> {
        self.inner.window().require(addr, 4)?;
        self.inner.write32(addr, value)
    }

    fn read(&mut self, addr: u32, data: &mut [u8]) -> Result<(), BridgeError> {
        self.inner.window().require(addr, data.len() as u32)?;
        self.inner.read(addr, data)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BridgeError> {
        self.inner.window().require(addr, data.len() as u32)?;
        self.inner.write(addr, data)
    }
}

/// A compiled-in bridge driver that knows how to open its transport.
pub trait BridgeFactory: std::fmt::Debug + Sync {
    /// Name the driver is selected by, e.g. `devmem`.
    fn name(&self) -> &'static str;

    /// One-line description for driver listings.
    fn description(&self) -> &'static str;

    /// Probe the local environment and open the transport if it is
    /// reachable without explicit connection parameters.
    fn probe(&self) -> Result<Bridge, BridgeError>;

    /// Open the transport with explicit connection parameters.
    ///
    /// Local drivers accept the interface-only form and treat the console
    /// form as malformed; the console driver requires the five-field form.
    fn open(&self, args: &ConnectionArgs) -> Result<Bridge, BridgeError> {
        match args {
            ConnectionArgs::Local { .. } => self.probe(),
            ConnectionArgs::Console { .. } => Err(BridgeCreationError::MalformedConnection(
                ConnectionError::ConsoleArgsNotAccepted(self.name()),
            )
            .into()),
        }
    }
}
