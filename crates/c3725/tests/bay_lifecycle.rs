//! Integration tests for the bay state machine
//!
//! Uses a driver that records every call it receives to check:
//! - Driver call ordering across bind/activate/deactivate/unbind
//! - NIO reference accounting
//! - Failure handling of init, attach and shutdown

use std::sync::{Arc, Mutex};

use c3725::{
    BayContext, BayDevice, BayDriver, BayError, BayManager, BayState, DriverError, DriverTable,
};
use cisco_nio::{NetIoRegistry, NioKind, NioRef, NioRegistry};
use pretty_assertions::assert_eq;

type CallLog = Arc<Mutex<Vec<String>>>;

/// Failure injection knobs for the recording driver.
#[derive(Clone, Default)]
struct Faults {
    init: bool,
    attach_port: Option<u32>,
    shutdown: bool,
}

struct RecordingDriver {
    dev_type: &'static str,
    log: CallLog,
    faults: Faults,
}

struct RecordingDevice {
    name: String,
    log: CallLog,
    faults: Faults,
}

impl BayDriver for RecordingDriver {
    fn dev_type(&self) -> &str {
        self.dev_type
    }

    fn init(&self, ctx: &BayContext<'_>) -> Result<Box<dyn BayDevice>, DriverError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("init {} slot={}", ctx.dev_name, ctx.slot));
        if self.faults.init {
            return Err(DriverError::Failed("init refused".to_string()));
        }
        Ok(Box::new(RecordingDevice {
            name: ctx.dev_name.to_string(),
            log: Arc::clone(&self.log),
            faults: self.faults.clone(),
        }))
    }
}

impl BayDevice for RecordingDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, port: u32, nio: &NioRef) -> Result<(), DriverError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("attach {} {}", port, nio.name()));
        if self.faults.attach_port == Some(port) {
            return Err(DriverError::Failed("attach refused".to_string()));
        }
        Ok(())
    }

    fn detach(&mut self, port: u32) -> Result<(), DriverError> {
        self.log.lock().unwrap().push(format!("detach {}", port));
        Ok(())
    }

    fn shutdown(self: Box<Self>) -> Result<(), DriverError> {
        self.log.lock().unwrap().push("shutdown".to_string());
        if self.faults.shutdown {
            return Err(DriverError::Failed("shutdown refused".to_string()));
        }
        Ok(())
    }
}

struct TestSetup {
    mgr: BayManager,
    registry: Arc<NetIoRegistry>,
    log: CallLog,
}

impl TestSetup {
    fn new(faults: Faults) -> Self {
        let log: CallLog = Arc::default();
        let drivers = DriverTable::new().with(RecordingDriver {
            dev_type: "X",
            log: Arc::clone(&log),
            faults,
        });

        let registry = Arc::new(NetIoRegistry::new());
        for name in ["tapA", "tapB"] {
            registry
                .create(name, NioKind::Tap { device: name.to_string() })
                .unwrap();
        }

        let mgr = BayManager::new(
            "R1",
            0,
            3,
            Arc::new(drivers),
            Arc::clone(&registry) as Arc<dyn NioRegistry>,
        );
        Self { mgr, registry, log }
    }

    fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

#[test]
fn test_full_lifecycle_call_order() {
    let mut setup = TestSetup::new(Faults::default());

    setup.mgr.bind(1, "X").unwrap();
    setup.mgr.attach_backend(1, 0, "tapA").unwrap();
    assert_eq!(setup.mgr.state(1), Ok(BayState::Bound));
    assert_eq!(setup.registry.ref_count("tapA"), Some(1));
    assert!(setup.take_log().is_empty());

    setup.mgr.activate(1).unwrap();
    assert_eq!(setup.mgr.state(1), Ok(BayState::Active));
    assert_eq!(setup.take_log(), vec!["init X(1) slot=1", "attach 0 tapA"]);

    setup.mgr.deactivate(1).unwrap();
    assert_eq!(setup.mgr.state(1), Ok(BayState::Bound));
    assert_eq!(setup.take_log(), vec!["detach 0", "shutdown"]);

    setup.mgr.unbind(1).unwrap();
    assert_eq!(setup.mgr.state(1), Ok(BayState::Empty));
    assert_eq!(setup.registry.ref_count("tapA"), Some(0));
    assert!(setup.take_log().is_empty());
}

#[test]
fn test_attach_and_detach_while_active() {
    let mut setup = TestSetup::new(Faults::default());
    setup.mgr.bind(2, "X").unwrap();
    setup.mgr.activate(2).unwrap();
    setup.take_log();

    setup.mgr.attach_backend(2, 5, "tapB").unwrap();
    assert_eq!(setup.take_log(), vec!["attach 5 tapB"]);

    assert_eq!(
        setup.mgr.attach_backend(2, 5, "tapA"),
        Err(BayError::DuplicatePort { slot: 2, port: 5 })
    );
    assert_eq!(setup.registry.ref_count("tapA"), Some(0));

    setup.mgr.detach_backend(2, 5).unwrap();
    assert_eq!(setup.take_log(), vec!["detach 5"]);
    assert_eq!(setup.registry.ref_count("tapB"), Some(0));

    assert_eq!(
        setup.mgr.detach_backend(2, 5),
        Err(BayError::PortNotBound { slot: 2, port: 5 })
    );
}

#[test]
fn test_init_failure_leaves_bay_bound() {
    let mut setup = TestSetup::new(Faults {
        init: true,
        ..Faults::default()
    });
    setup.mgr.bind(1, "X").unwrap();
    setup.mgr.attach_backend(1, 0, "tapA").unwrap();

    let err = setup.mgr.activate(1).unwrap_err();
    assert!(matches!(err, BayError::DriverInitFailed { slot: 1, .. }));
    assert_eq!(setup.mgr.state(1), Ok(BayState::Bound));
    assert_eq!(setup.take_log(), vec!["init X(1) slot=1"]);
    assert_eq!(setup.registry.ref_count("tapA"), Some(1));
}

#[test]
fn test_attach_failure_does_not_block_activation() {
    let mut setup = TestSetup::new(Faults {
        attach_port: Some(0),
        ..Faults::default()
    });
    setup.mgr.bind(1, "X").unwrap();
    setup.mgr.attach_backend(1, 0, "tapA").unwrap();
    setup.mgr.attach_backend(1, 1, "tapB").unwrap();

    setup.mgr.activate(1).unwrap();
    assert_eq!(setup.mgr.state(1), Ok(BayState::Active));
    assert_eq!(
        setup.take_log(),
        vec!["init X(1) slot=1", "attach 0 tapA", "attach 1 tapB"]
    );

    // Live attach failures are logged; the binding is kept.
    setup.mgr.detach_backend(1, 0).unwrap();
    setup.mgr.attach_backend(1, 0, "tapA").unwrap();
    assert_eq!(setup.take_log(), vec!["detach 0", "attach 0 tapA"]);
    assert_eq!(setup.registry.ref_count("tapA"), Some(1));
    assert_eq!(
        setup.mgr.nio_bindings(1).unwrap(),
        vec!["0: tapA".to_string(), "1: tapB".to_string()]
    );
}

#[test]
fn test_shutdown_failure_still_deactivates() {
    let mut setup = TestSetup::new(Faults {
        shutdown: true,
        ..Faults::default()
    });
    setup.mgr.bind(1, "X").unwrap();
    setup.mgr.activate(1).unwrap();

    let err = setup.mgr.deactivate(1).unwrap_err();
    assert!(matches!(err, BayError::DriverShutdownFailed { slot: 1, .. }));
    assert_eq!(setup.mgr.state(1), Ok(BayState::Bound));
    setup.mgr.unbind(1).unwrap();
}

#[test]
fn test_state_violations() {
    let mut setup = TestSetup::new(Faults::default());

    assert_eq!(setup.mgr.activate(1), Err(BayError::SlotEmpty { slot: 1 }));
    assert_eq!(setup.mgr.unbind(1), Err(BayError::SlotEmpty { slot: 1 }));
    assert_eq!(setup.mgr.deactivate(1), Err(BayError::SlotNotActive { slot: 1 }));
    assert_eq!(
        setup.mgr.bind(1, "Y"),
        Err(BayError::UnknownDriver {
            device_type: "Y".to_string()
        })
    );
    assert_eq!(
        setup.mgr.attach_backend(1, 0, "nope"),
        Err(BayError::BackendNotFound {
            name: "nope".to_string()
        })
    );

    setup.mgr.bind(1, "X").unwrap();
    assert!(matches!(
        setup.mgr.bind(1, "X"),
        Err(BayError::SlotOccupied { slot: 1, .. })
    ));
    setup.mgr.activate(1).unwrap();
    assert_eq!(setup.mgr.activate(1), Err(BayError::SlotActive { slot: 1 }));
    assert_eq!(setup.mgr.unbind(1), Err(BayError::SlotActive { slot: 1 }));
    assert_eq!(setup.mgr.state(7), Err(BayError::InvalidSlot { slot: 7 }));
}

#[test]
fn test_teardown_releases_everything() {
    let mut setup = TestSetup::new(Faults::default());
    setup.mgr.bind(1, "X").unwrap();
    setup.mgr.bind(2, "X").unwrap();
    setup.mgr.attach_backend(1, 0, "tapA").unwrap();
    setup.mgr.attach_backend(2, 3, "tapA").unwrap();
    setup.mgr.attach_backend(2, 4, "tapB").unwrap();
    assert_eq!(setup.registry.ref_count("tapA"), Some(2));

    setup.mgr.activate_all().unwrap();
    setup.take_log();

    setup.mgr.teardown();
    assert_eq!(setup.registry.ref_count("tapA"), Some(0));
    assert_eq!(setup.registry.ref_count("tapB"), Some(0));
    assert_eq!(setup.mgr.state(1), Ok(BayState::Bound));
    assert_eq!(setup.mgr.state(2), Ok(BayState::Bound));

    let log = setup.take_log();
    assert_eq!(log.iter().filter(|l| *l == "shutdown").count(), 2);
    assert_eq!(log.iter().filter(|l| l.starts_with("detach")).count(), 3);

    // Unreferenced NIOs can now be deleted.
    setup.registry.delete("tapA").unwrap();
}

#[test]
fn test_repeated_cycles_keep_refcounts_balanced() {
    let mut setup = TestSetup::new(Faults::default());
    setup.mgr.bind(1, "X").unwrap();
    setup.mgr.attach_backend(1, 0, "tapB").unwrap();
    let start = setup.registry.ref_count("tapA");

    for _ in 0..10 {
        setup.mgr.activate(1).unwrap();
        setup.mgr.attach_backend(1, 3, "tapA").unwrap();
        setup.mgr.detach_backend(1, 3).unwrap();
        setup.mgr.deactivate(1).unwrap();

        setup.mgr.attach_backend(1, 4, "tapA").unwrap();
        setup.mgr.detach_backend(1, 4).unwrap();
        assert_eq!(setup.registry.ref_count("tapA"), start);
    }

    assert_eq!(setup.registry.ref_count("tapB"), Some(1));
    let log = setup.take_log();
    assert_eq!(log.iter().filter(|l| l.starts_with("init")).count(), 10);
    assert_eq!(log.iter().filter(|l| *l == "attach 3 tapA").count(), 10);
    assert_eq!(log.iter().filter(|l| *l == "shutdown").count(), 10);
}

#[test]
fn test_drop_releases_everything() {
    let mut setup = TestSetup::new(Faults::default());
    setup.mgr.bind(1, "X").unwrap();
    setup.mgr.attach_backend(1, 0, "tapA").unwrap();
    setup.mgr.attach_backend(2, 1, "tapA").unwrap();
    setup.mgr.activate(1).unwrap();
    setup.take_log();

    let TestSetup { mgr, registry, log } = setup;
    drop(mgr);
    assert_eq!(registry.ref_count("tapA"), Some(0));
    assert_eq!(*log.lock().unwrap(), vec!["detach 0", "shutdown"]);
    registry.delete("tapA").unwrap();
}
