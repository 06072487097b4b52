//! The top-level filesystem value and its public operations.

use tracing::debug;

use crate::allocator::FrameAllocator;
use crate::cache::FrameCache;
use crate::config::*;
use crate::device::DeviceDriver;
use crate::error::{FsError, Result};
use crate::file::{self, FileTable};
use crate::transport::{BusTransport, TcpTransport};

/// A filesystem over one HRAM device, reached through `T`.
///
/// Owns the whole stack: device driver, frame cache, slot allocator
/// and file table. All operations take `&mut self`; the
/// single-client contract is enforced by ownership.
pub struct HramFs<T: BusTransport> {
    device: DeviceDriver<T>,
    cache: Option<FrameCache>,
    cache_frames: usize,
    allocator: FrameAllocator,
    files: FileTable,
}

impl HramFs<TcpTransport> {
    /// Filesystem over the TCP device server named by the environment
    /// (or the baked-in default endpoint).
    pub fn over_tcp() -> Self {
        Self::new(TcpTransport::from_env())
    }
}

impl<T: BusTransport> HramFs<T> {
    pub fn new(transport: T) -> Self {
        HramFs {
            device: DeviceDriver::new(transport),
            cache: None,
            cache_frames: DEFAULT_CACHE_FRAMES,
            allocator: FrameAllocator::new(),
            files: FileTable::new(),
        }
    }

    /// Picks the cache capacity used by the next `power_on`. Rejected
    /// while powered: the cache cannot grow or shrink in place.
    pub fn set_cache_size(&mut self, frames: usize) -> Result<()> {
        if self.cache.is_some() {
            return Err(FsError::CacheSizeLocked);
        }
        self.cache_frames = frames;
        Ok(())
    }

    /// Brings the device up and zeroes every cartridge. Any metadata
    /// from a previous session is released: the device content is
    /// gone, so keeping it would leave files pointing at zeroed
    /// frames.
    pub fn power_on(&mut self) -> Result<()> {
        self.device.power_on()?;
        self.allocator = FrameAllocator::new();
        self.files.clear();
        self.cache = Some(FrameCache::new(self.cache_frames));
        debug!(cache_frames = self.cache_frames, "filesystem powered on");
        Ok(())
    }

    /// Releases all file metadata, shuts the device down and tears
    /// down the cache. No operation is valid until the next
    /// `power_on`.
    pub fn power_off(&mut self) -> Result<()> {
        self.powered()?;
        self.files.clear();
        self.device.power_off()?;
        self.cache = None;
        debug!("filesystem powered off");
        Ok(())
    }

    pub fn open(&mut self, name: &str) -> Result<i16> {
        self.powered()?;
        self.files.open(name.as_bytes())
    }

    pub fn close(&mut self, handle: i16) -> Result<()> {
        self.powered()?;
        self.files.close(handle)
    }

    /// Reads up to `out.len()` bytes at the file position. Returns
    /// the bytes read; 0 at end of file.
    pub fn read(&mut self, handle: i16, out: &mut [u8]) -> Result<usize> {
        let cache = self.cache.as_mut().ok_or(FsError::CacheNotInitialized)?;
        let entry = self.files.entry_mut(handle)?;
        file::fread(&mut self.device, cache, entry, out)
    }

    /// Writes all of `data` at the file position, extending the file
    /// as needed. Returns `data.len()`.
    pub fn write(&mut self, handle: i16, data: &[u8]) -> Result<usize> {
        let cache = self.cache.as_mut().ok_or(FsError::CacheNotInitialized)?;
        let entry = self.files.entry_mut(handle)?;
        file::fwrite(&mut self.device, cache, &mut self.allocator, entry, data)
    }

    /// Moves the file position. Seeking past the end of the file is
    /// rejected.
    pub fn seek(&mut self, handle: i16, offset: u32) -> Result<()> {
        self.powered()?;
        let entry = self.files.entry_mut(handle)?;
        if offset > entry.length {
            debug!(handle, offset, length = entry.length, "seek past end of file rejected");
            return Err(FsError::SeekOutOfRange {
                offset,
                length: entry.length,
            });
        }
        entry.position = offset;
        Ok(())
    }

    /// The live cache, for diagnostics and tests. `None` while
    /// powered off.
    pub fn cache(&self) -> Option<&FrameCache> {
        self.cache.as_ref()
    }

    fn powered(&self) -> Result<()> {
        if self.cache.is_none() {
            return Err(FsError::CacheNotInitialized);
        }
        Ok(())
    }
}
