//! Registry behavior through the public API.

use sluice::bridge::fake::{FakeFactory, FakeOutcome};
use sluice::{Ahb, BridgeFactory, BridgeRegistry, ConnectionArgs, Error};

fn factory(name: &'static str, outcome: FakeOutcome) -> &'static dyn BridgeFactory {
    Box::leak(Box::new(FakeFactory::new(name, outcome)))
}

#[test]
fn disabled_driver_is_listed_but_not_negotiated() {
    let mut registry = BridgeRegistry::from_factories([
        (factory("devmem", FakeOutcome::NotPresent), 50),
        (factory("jtag", FakeOutcome::Open), 20),
    ]);

    registry.disable("jtag").unwrap();

    // Still listed, marked disabled.
    let rows = registry.list();
    let jtag = rows.iter().find(|row| row.name == "jtag").unwrap();
    assert!(!jtag.enabled);
    assert_eq!(jtag.priority, 20);

    // The only driver that would have succeeded is skipped, so the walk
    // exhausts.
    let err = registry.connect(None).unwrap_err();
    assert!(matches!(err, Error::NoBridgeAvailable(_)));
}

#[test]
fn explicit_connection_bypasses_the_walk() {
    let mut registry = BridgeRegistry::from_factories([
        (factory("devmem", FakeOutcome::NotPresent), 50),
        (factory("jtag", FakeOutcome::Open), 20),
    ]);
    registry.disable("jtag").unwrap();

    let args = ConnectionArgs::Local {
        interface: "jtag".into(),
    };
    let bridge = registry.connect(Some(&args)).unwrap();
    assert_eq!(bridge.name(), "jtag");
}

#[test]
fn explicit_connection_to_unknown_driver_fails() {
    let registry = BridgeRegistry::from_factories([(factory("devmem", FakeOutcome::Open), 50)]);

    let args = ConnectionArgs::Local {
        interface: "serial".into(),
    };
    let err = registry.connect(Some(&args)).unwrap_err();
    assert!(matches!(err, Error::UnknownBridge(name) if name.0 == "serial"));
}

#[test]
fn privilege_failures_surface_in_the_diagnostic() {
    let registry = BridgeRegistry::from_factories([
        (factory("devmem", FakeOutcome::AccessDenied), 50),
        (factory("p2a", FakeOutcome::NotPresent), 40),
    ]);

    let err = registry.negotiate().unwrap_err();
    assert!(err.insufficient_privilege());

    let rendered = err.to_string();
    assert!(rendered.contains("devmem"));
    assert!(rendered.contains("p2a"));
}
