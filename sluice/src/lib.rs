//! # Debug toolset for BMC AHB interfaces
//!
//! `sluice` talks to the internal AHB interconnect of ASPEED-style BMC
//! SoCs, through whichever bridge transport is actually reachable: a local
//! `/dev/mem` mapping on the BMC itself, the legacy P2A and iLPC2AHB
//! bridges exposed on the host-facing buses, or the hardware debug UART
//! behind a network console server.
//!
//! Negotiation turns connection parameters into exactly one open
//! [`Bridge`]; probing turns the bridge into an identified [`Soc`] with
//! typed handles for its on-chip controllers.
//!
//! ## Reading a register
//!
//! ```no_run
//! use sluice::{Ahb, BridgeRegistry, Soc};
//!
//! # fn main() -> Result<(), sluice::Error> {
//! // Walk the bridge drivers in priority order and take the first that
//! // opens.
//! let registry = BridgeRegistry::builtin();
//! let mut bridge = registry.connect(None)?;
//!
//! // Identify the chip behind it.
//! let mut soc = Soc::probe(&mut bridge)?;
//! println!("talking to an {}", soc.generation());
//!
//! let strap = soc.scu()?.strap()?;
//! println!("hardware strap: {strap:#010x}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Dumping RAM
//!
//! ```no_run
//! use sluice::{Ahb, BridgeRegistry, Soc};
//!
//! # fn main() -> Result<(), sluice::Error> {
//! let registry = BridgeRegistry::builtin();
//! let mut bridge = registry.connect(None)?;
//! let mut soc = Soc::probe(&mut bridge)?;
//!
//! // Everything except the VRAM reservation at the DRAM tail.
//! let start = soc.dram().start();
//! let length = soc.dram().length() - soc.vram().length();
//!
//! let mut out = std::io::stdout().lock();
//! soc.ahb().siphon_out(start, length, &mut out)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod ahb;
pub mod bridge;
pub mod connection;
mod error;
pub mod region;
pub mod soc;

pub use crate::ahb::{Ahb, SiphonError, SiphonFault, SIPHON_WINDOW};
pub use crate::bridge::{
    Bridge, BridgeDriverInfo, BridgeError, BridgeFactory, BridgeRegistry, NoBridgeAvailable,
};
pub use crate::connection::{ConnectionArgs, ConnectionError};
pub use crate::error::{Error, UnknownBridge};
pub use crate::region::{OutOfRange, SocRegion};
pub use crate::soc::{BridgeMode, DeviceHandle, DeviceKind, Soc, SocError, SocGeneration};
