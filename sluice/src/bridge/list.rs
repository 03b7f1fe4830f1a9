//! The bridge driver registry and host negotiation.

use std::fmt;

use serde::Serialize;

use crate::bridge::{Bridge, BridgeCreationError, BridgeError, BridgeFactory};
use crate::connection::ConnectionArgs;
use crate::error::UnknownBridge;

/// One row of the driver listing.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeDriverInfo {
    /// Driver name, as accepted by `--skip-bridge` and the `via` clause.
    pub name: &'static str,
    /// Human readable description of the transport.
    pub description: &'static str,
    /// Negotiation priority. Higher is tried first; fixed at registration.
    pub priority: i32,
    /// Whether implicit negotiation will consider the driver.
    pub enabled: bool,
}

#[derive(Debug)]
struct BridgeEntry {
    factory: &'static dyn BridgeFactory,
    priority: i32,
    enabled: bool,
}

/// The compiled-in set of bridge drivers, with per-driver priority and
/// enabled state.
///
/// Built once at startup and threaded by reference into every negotiation.
/// [`BridgeRegistry::disable`] is the only mutation and is expected to
/// happen before negotiation begins; re-enabling is deliberately not
/// exposed.
#[derive(Debug)]
pub struct BridgeRegistry {
    entries: Vec<BridgeEntry>,
}

impl BridgeRegistry {
    /// The registry of built-in bridge drivers.
    pub fn builtin() -> Self {
        let mut entries = Vec::new();
        let mut register = |factory: &'static dyn BridgeFactory, priority: i32| {
            entries.push(BridgeEntry {
                factory,
                priority,
                enabled: true,
            });
        };

        #[cfg(target_os = "linux")]
        {
            register(&super::devmem::DevMemFactory, 50);
            register(&super::p2a::P2aFactory, 40);
            register(&super::ilpc::IlpcFactory, 30);
        }
        register(&super::debug::DebugUartFactory, 10);

        Self { entries }
    }

    /// Build a registry from an explicit `(factory, priority)` set.
    #[cfg(any(test, feature = "test"))]
    pub fn from_factories(
        factories: impl IntoIterator<Item = (&'static dyn BridgeFactory, i32)>,
    ) -> Self {
        Self {
            entries: factories
                .into_iter()
                .map(|(factory, priority)| BridgeEntry {
                    factory,
                    priority,
                    enabled: true,
                })
                .collect(),
        }
    }

    /// List every registered driver, in registration order.
    pub fn list(&self) -> Vec<BridgeDriverInfo> {
        self.entries
            .iter()
            .map(|entry| BridgeDriverInfo {
                name: entry.factory.name(),
                description: entry.factory.description(),
                priority: entry.priority,
                enabled: entry.enabled,
            })
            .collect()
    }

    /// Exclude a driver from implicit negotiation for the rest of the run.
    pub fn disable(&mut self, name: &str) -> Result<(), UnknownBridge> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.factory.name() == name)
            .ok_or_else(|| UnknownBridge(name.to_string()))?;

        tracing::debug!("disabling {} bridge driver", name);
        entry.enabled = false;
        Ok(())
    }

    /// Produce one open [`Bridge`] from the supplied connection parameters,
    /// or by implicit negotiation when none were supplied.
    pub fn connect(&self, args: Option<&ConnectionArgs>) -> Result<Bridge, crate::Error> {
        match args {
            Some(args) => self.open(args),
            None => Ok(self.negotiate()?),
        }
    }

    /// Open exactly the transport the connection parameters name,
    /// bypassing priority order and the enabled flags.
    pub fn open(&self, args: &ConnectionArgs) -> Result<Bridge, crate::Error> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.factory.name() == args.interface())
            .ok_or_else(|| UnknownBridge(args.interface().to_string()))?;

        tracing::debug!("opening {} bridge explicitly", args.interface());
        Ok(entry.factory.open(args)?)
    }

    /// Walk the enabled drivers in descending priority and return the first
    /// transport that opens.
    ///
    /// Per-driver failures are collected for the trailing diagnostic; a
    /// privilege failure stays distinguishable so the caller can suggest
    /// escalation instead of blind rescanning.
    pub fn negotiate(&self) -> Result<Bridge, NoBridgeAvailable> {
        let mut order: Vec<&BridgeEntry> =
            self.entries.iter().filter(|entry| entry.enabled).collect();
        // Stable: equal priorities keep registration order.
        order.sort_by_key(|entry| std::cmp::Reverse(entry.priority));

        let mut attempts = Vec::new();

        for entry in order {
            let name = entry.factory.name();
            tracing::debug!("probing {} bridge", name);

            match entry.factory.probe() {
                Ok(bridge) => {
                    tracing::info!("negotiated AHB access via {}", name);
                    return Ok(bridge);
                }
                Err(error) => {
                    tracing::debug!("{} bridge unavailable: {}", name, error);
                    attempts.push(BridgeAttempt {
                        bridge: name,
                        error,
                    });
                }
            }
        }

        Err(NoBridgeAvailable { attempts })
    }
}

impl Default for BridgeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Implicit negotiation exhausted the enabled drivers without producing a
/// bridge.
#[derive(Debug)]
pub struct NoBridgeAvailable {
    /// Every driver that was tried, with the reason it was discarded.
    pub attempts: Vec<BridgeAttempt>,
}

/// One discarded negotiation attempt.
#[derive(Debug)]
pub struct BridgeAttempt {
    /// The driver that was tried.
    pub bridge: &'static str,
    /// Why it did not produce a handle.
    pub error: BridgeError,
}

impl NoBridgeAvailable {
    /// Whether any attempt failed specifically for lack of privilege.
    pub fn insufficient_privilege(&self) -> bool {
        self.attempts.iter().any(|attempt| {
            matches!(
                attempt.error,
                BridgeError::CouldNotBeCreated(BridgeCreationError::InsufficientPrivilege(_))
            )
        })
    }
}

impl fmt::Display for NoBridgeAvailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no bridge transport is available")?;

        if !self.attempts.is_empty() {
            write!(f, " (")?;
            for (i, attempt) in self.attempts.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", attempt.bridge, attempt.error)?;
            }
            write!(f, ")")?;
        }

        Ok(())
    }
}

impl std::error::Error for NoBridgeAvailable {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahb::Ahb;
    use crate::bridge::fake::{FakeFactory, FakeOutcome};

    fn factory(name: &'static str, outcome: FakeOutcome) -> &'static dyn BridgeFactory {
        Box::leak(Box::new(FakeFactory::new(name, outcome)))
    }

    #[test]
    fn negotiation_prefers_highest_priority() {
        let registry = BridgeRegistry::from_factories([
            (factory("slow", FakeOutcome::Open), 1),
            (factory("medium", FakeOutcome::Open), 5),
            (factory("fast", FakeOutcome::Open), 10),
        ]);

        let bridge = registry.negotiate().unwrap();
        assert_eq!(bridge.name(), "fast");
    }

    #[test]
    fn negotiation_skips_disabled_driver() {
        let mut registry = BridgeRegistry::from_factories([
            (factory("first", FakeOutcome::Open), 10),
            (factory("second", FakeOutcome::Open), 5),
        ]);

        registry.disable("first").unwrap();

        let bridge = registry.negotiate().unwrap();
        assert_eq!(bridge.name(), "second");
    }

    #[test]
    fn negotiation_falls_through_failures() {
        let registry = BridgeRegistry::from_factories([
            (factory("absent", FakeOutcome::NotPresent), 10),
            (factory("works", FakeOutcome::Open), 5),
        ]);

        let bridge = registry.negotiate().unwrap();
        assert_eq!(bridge.name(), "works");
    }

    #[test]
    fn exhaustion_aggregates_attempts() {
        let registry = BridgeRegistry::from_factories([
            (factory("absent", FakeOutcome::NotPresent), 10),
            (factory("locked", FakeOutcome::AccessDenied), 5),
        ]);

        let err = registry.negotiate().unwrap_err();
        assert_eq!(err.attempts.len(), 2);
        assert!(err.insufficient_privilege());
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn exhaustion_without_privilege_case() {
        let registry =
            BridgeRegistry::from_factories([(factory("absent", FakeOutcome::NotPresent), 10)]);

        let err = registry.negotiate().unwrap_err();
        assert!(!err.insufficient_privilege());
    }

    #[test]
    fn disable_unknown_driver_is_an_error() {
        let mut registry =
            BridgeRegistry::from_factories([(factory("known", FakeOutcome::Open), 10)]);

        let err = registry.disable("sideband").unwrap_err();
        assert_eq!(err.0, "sideband");
    }

    #[test]
    fn explicit_open_bypasses_disabled_flag() {
        let mut registry =
            BridgeRegistry::from_factories([(factory("only", FakeOutcome::Open), 10)]);
        registry.disable("only").unwrap();

        let args = crate::ConnectionArgs::Local {
            interface: "only".into(),
        };

        let bridge = registry.open(&args).unwrap();
        assert_eq!(bridge.name(), "only");
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let registry = BridgeRegistry::from_factories([
            (factory("first", FakeOutcome::Open), 10),
            (factory("second", FakeOutcome::Open), 10),
        ]);

        let bridge = registry.negotiate().unwrap();
        assert_eq!(bridge.name(), "first");
    }
}
