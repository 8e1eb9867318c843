//! Backing storage for emulated memory regions (ROM, NVRAM).
//!
//! A region is opened into a byte buffer, modified in place and handed back
//! with [`RegionStore::close_region`], which persists it. A region that was
//! only read can simply be dropped; nothing is written back.

use crate::error::{NvramError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An opened storage region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRegion {
    tag: String,
    data: Vec<u8>,
}

impl MappedRegion {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Provider of named storage regions for one router instance.
pub trait RegionStore: Send + Sync {
    /// Opens an existing region.
    ///
    /// Fails with [`NvramError::RegionNotFound`] if it was never created.
    fn open_region(&self, tag: &str) -> Result<MappedRegion>;

    /// Opens a region, creating it if needed, sized to exactly `size` bytes.
    ///
    /// Existing contents are preserved up to `size`; new bytes are zero.
    fn create_region(&self, tag: &str, size: usize) -> Result<MappedRegion>;

    /// Persists and releases a region.
    ///
    /// Only needed after writing; dropping a read-only region is enough.
    fn close_region(&self, region: MappedRegion) -> Result<()>;
}

/// Regions stored as files named `<prefix>_<tag>` in a working directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    prefix: String,
}

impl FileStore {
    /// `prefix` identifies the instance, e.g. `c3725_i0`.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path_for(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{}_{}", self.prefix, tag))
    }

    fn read(path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NvramError::io(path, e)),
        }
    }
}

impl RegionStore for FileStore {
    fn open_region(&self, tag: &str) -> Result<MappedRegion> {
        let path = self.path_for(tag);
        let data = Self::read(&path)?.ok_or_else(|| NvramError::RegionNotFound {
            tag: tag.to_string(),
        })?;
        debug!(path = %path.display(), len = data.len(), "Opened region file");
        Ok(MappedRegion {
            tag: tag.to_string(),
            data,
        })
    }

    fn create_region(&self, tag: &str, size: usize) -> Result<MappedRegion> {
        let path = self.path_for(tag);
        let mut data = Self::read(&path)?.unwrap_or_default();
        if data.is_empty() {
            info!(path = %path.display(), size, "Creating region file");
        }
        data.resize(size, 0);
        Ok(MappedRegion {
            tag: tag.to_string(),
            data,
        })
    }

    fn close_region(&self, region: MappedRegion) -> Result<()> {
        let path = self.path_for(&region.tag);
        fs::create_dir_all(&self.dir).map_err(|e| NvramError::io(&self.dir, e))?;
        fs::write(&path, &region.data).map_err(|e| NvramError::io(&path, e))?;
        debug!(path = %path.display(), len = region.data.len(), "Wrote region file");
        Ok(())
    }
}

/// In-memory regions, mostly useful for tests and throwaway instances.
#[derive(Debug, Default)]
pub struct MemoryStore {
    regions: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of a stored region's bytes.
    pub fn snapshot(&self, tag: &str) -> Option<Vec<u8>> {
        self.regions.lock().get(tag).cloned()
    }

    /// Replaces a region's bytes wholesale.
    pub fn insert(&self, tag: &str, data: Vec<u8>) {
        self.regions.lock().insert(tag.to_string(), data);
    }
}

impl RegionStore for MemoryStore {
    fn open_region(&self, tag: &str) -> Result<MappedRegion> {
        let data = self
            .regions
            .lock()
            .get(tag)
            .cloned()
            .ok_or_else(|| NvramError::RegionNotFound {
                tag: tag.to_string(),
            })?;
        Ok(MappedRegion {
            tag: tag.to_string(),
            data,
        })
    }

    fn create_region(&self, tag: &str, size: usize) -> Result<MappedRegion> {
        let mut data = self.regions.lock().get(tag).cloned().unwrap_or_default();
        data.resize(size, 0);
        Ok(MappedRegion {
            tag: tag.to_string(),
            data,
        })
    }

    fn close_region(&self, region: MappedRegion) -> Result<()> {
        self.regions.lock().insert(region.tag, region.data);
        Ok(())
    }
}
