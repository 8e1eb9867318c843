//! Named NIO objects and the registry handing out references to them.

use crate::desc::NioKind;
use crate::error::{NioError, Result};
use crate::refcount::{HasRefCount, RefTable, RefUpdate};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared handle to a live NIO.
pub type NioRef = Arc<NetIo>;

/// A live network I/O backend.
///
/// The transport itself is opaque to the chassis; only the name, the kind and
/// the receive enable flag toggled by port drivers are visible.
#[derive(Debug)]
pub struct NetIo {
    name: String,
    kind: NioKind,
    enabled: AtomicBool,
}

impl NetIo {
    pub fn new(name: impl Into<String>, kind: NioKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NioKind {
        &self.kind
    }

    /// Starts delivering received frames to the attached port.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

/// Acquire/release interface consumed by port binding code.
///
/// Every successful `acquire` must be balanced by exactly one `release` of
/// the same name.
pub trait NioRegistry: Send + Sync {
    /// Takes one reference on the named NIO, or `None` if it does not exist.
    fn acquire(&self, name: &str) -> Option<NioRef>;

    /// Gives back one reference taken with [`NioRegistry::acquire`].
    fn release(&self, name: &str);
}

#[derive(Debug)]
struct Entry {
    nio: NioRef,
    refs: u32,
}

impl HasRefCount for Entry {
    fn increment_ref(&mut self) -> u32 {
        self.refs += 1;
        self.refs
    }

    fn decrement_ref(&mut self) -> Option<u32> {
        self.refs = self.refs.checked_sub(1)?;
        Some(self.refs)
    }

    fn ref_count(&self) -> u32 {
        self.refs
    }
}

/// In-process NIO registry.
#[derive(Debug, Default)]
pub struct NetIoRegistry {
    entries: Mutex<RefTable<String, Entry>>,
}

impl NetIoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new NIO with a reference count of zero.
    pub fn create(&self, name: &str, kind: NioKind) -> Result<NioRef> {
        let mut entries = self.entries.lock();
        let key = name.to_string();
        if entries.contains_key(&key) {
            return Err(NioError::AlreadyExists { name: key });
        }

        let nio = Arc::new(NetIo::new(name, kind));
        info!(nio = name, kind = %nio.kind(), "Created NIO");
        entries.insert(
            key,
            Entry {
                nio: Arc::clone(&nio),
                refs: 0,
            },
        );
        Ok(nio)
    }

    /// Removes a NIO that no port references anymore.
    pub fn delete(&self, name: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let key = name.to_string();
        match entries.ref_count(&key) {
            None => Err(NioError::NotFound { name: key }),
            Some(0) => {
                entries.remove(&key);
                info!(nio = name, "Deleted NIO");
                Ok(())
            }
            Some(refs) => Err(NioError::InUse { name: key, refs }),
        }
    }

    /// Looks a NIO up without taking a reference.
    pub fn get(&self, name: &str) -> Option<NioRef> {
        self.entries
            .lock()
            .get(&name.to_string())
            .map(|e| Arc::clone(&e.nio))
    }

    pub fn ref_count(&self, name: &str) -> Option<u32> {
        self.entries.lock().ref_count(&name.to_string())
    }

    /// Sorted list of registered NIO names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl NioRegistry for NetIoRegistry {
    fn acquire(&self, name: &str) -> Option<NioRef> {
        let mut entries = self.entries.lock();
        let key = name.to_string();
        match entries.increment_ref(&key) {
            RefUpdate::Updated(refs) => {
                debug!(nio = name, refs, "Acquired NIO reference");
                entries.get(&key).map(|e| Arc::clone(&e.nio))
            }
            _ => None,
        }
    }

    fn release(&self, name: &str) {
        let mut entries = self.entries.lock();
        match entries.decrement_ref(&name.to_string()) {
            RefUpdate::Updated(refs) => debug!(nio = name, refs, "Released NIO reference"),
            RefUpdate::Missing => warn!(nio = name, "Release of unknown NIO"),
            RefUpdate::Underflow => warn!(nio = name, "NIO reference count underflow"),
        }
    }
}
