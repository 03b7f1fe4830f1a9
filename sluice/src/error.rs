use crate::ahb::SiphonError;
use crate::bridge::{BridgeError, NoBridgeAvailable};
use crate::connection::ConnectionError;
use crate::soc::SocError;

/// The overall error type of this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error with the usage of the bridge occurred.
    #[error("an error with the usage of the bridge occurred")]
    Bridge(#[from] BridgeError),

    /// Implicit negotiation found no usable bridge transport.
    #[error(transparent)]
    NoBridgeAvailable(#[from] NoBridgeAvailable),

    /// A driver name was not recognized.
    #[error(transparent)]
    UnknownBridge(#[from] UnknownBridge),

    /// The connection parameters were rejected before any I/O.
    #[error("invalid connection arguments")]
    Connection(#[from] ConnectionError),

    /// SoC identification or device lookup failed.
    #[error(transparent)]
    Soc(#[from] SocError),

    /// A bulk transfer stopped before completion.
    #[error(transparent)]
    Siphon(#[from] SiphonError),

    /// An address range was rejected against a known region.
    #[error(transparent)]
    OutOfRange(#[from] crate::region::OutOfRange),
}

/// A driver name matched nothing in the bridge registry.
#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a recognized bridge name")]
pub struct UnknownBridge(pub String);
