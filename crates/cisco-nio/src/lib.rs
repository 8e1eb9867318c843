//! Network I/O (NIO) backends for emulated router ports.
//!
//! A NIO is an opaque named object connecting an emulated port to the outside
//! world (TAP device, UDP tunnel, Unix socket, ...). Ports never own a NIO:
//! they take a reference through a [`NioRegistry`] and give it back when the
//! binding goes away.
//!
//! - [`NioKind`]: the transport a NIO was created with, parsed from
//!   command-line style descriptors such as `udp:10000:127.0.0.1:10001`
//! - [`NetIo`]: a live backend object, shared as a [`NioRef`]
//! - [`NioRegistry`]: the acquire/release interface consumed by bay managers
//! - [`NetIoRegistry`]: the in-process registry implementation
//!
//! # Example
//!
//! ```
//! use cisco_nio::{NetIoRegistry, NioKind, NioRegistry};
//!
//! let registry = NetIoRegistry::new();
//! registry.create("tap0", NioKind::Tap { device: "tap0".into() }).unwrap();
//!
//! let nio = registry.acquire("tap0").unwrap();
//! assert_eq!(nio.name(), "tap0");
//! assert_eq!(registry.ref_count("tap0"), Some(1));
//!
//! registry.release("tap0");
//! assert_eq!(registry.ref_count("tap0"), Some(0));
//! ```

mod desc;
mod error;
mod refcount;
mod registry;

pub use desc::NioKind;
pub use error::{NioError, Result};
pub use refcount::{HasRefCount, RefTable, RefUpdate};
pub use registry::{NetIo, NetIoRegistry, NioRef, NioRegistry};
