//! File metadata and the frame-walking read/write engines.
//!
//! Every file is an ordered list of slots; slot `i` backs bytes
//! `[i * FRAME_SIZE, (i + 1) * FRAME_SIZE)`. The table is flat: no
//! directories, lookup by name or handle is a linear scan. An entry
//! outlives `close` (name and content are sticky for the process
//! lifetime); only `handle` and `position` reset.

use tracing::{debug, trace};

use crate::allocator::{FrameAllocator, Slot};
use crate::cache::FrameCache;
use crate::config::*;
use crate::device::DeviceDriver;
use crate::error::{FsError, Result};
use crate::transport::BusTransport;

#[derive(Debug, Clone)]
pub struct FileEntry {
    /// File name, compared by value. Stored with its length; no
    /// terminator conventions.
    pub name: Vec<u8>,
    /// Positive while open, 0 while closed. Unique among open entries.
    pub handle: i16,
    pub length: u32,
    pub position: u32,
    /// Slots backing the file, in logical order.
    pub slots: Vec<Slot>,
}

/// The flat collection of every file this process has opened.
#[derive(Debug, Default)]
pub struct FileTable {
    entries: Vec<FileEntry>,
}

impl FileTable {
    pub fn new() -> Self {
        FileTable {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Smallest positive handle no entry currently holds.
    fn lowest_free_handle(&self) -> i16 {
        let mut handle = 1;
        while self.entries.iter().any(|entry| entry.handle == handle) {
            handle += 1;
        }
        handle
    }

    /// Opens `name`, creating the entry on first sight or reviving a
    /// closed one with its content intact. Opening an already open
    /// file fails.
    pub fn open(&mut self, name: &[u8]) -> Result<i16> {
        if let Some(index) = self.entries.iter().position(|entry| entry.name == name) {
            if self.entries[index].handle > 0 {
                debug!(name = %String::from_utf8_lossy(name), "open rejected, file is already open");
                return Err(FsError::AlreadyOpen);
            }
            let handle = self.lowest_free_handle();
            let entry = &mut self.entries[index];
            entry.handle = handle;
            entry.position = 0;
            return Ok(handle);
        }

        let handle = self.lowest_free_handle();
        self.entries.push(FileEntry {
            name: name.to_vec(),
            handle,
            length: 0,
            position: 0,
            slots: Vec::new(),
        });
        Ok(handle)
    }

    /// Closes `handle`. Length and slots survive for a later `open`.
    pub fn close(&mut self, handle: i16) -> Result<()> {
        let entry = self.entry_mut(handle)?;
        entry.handle = 0;
        entry.position = 0;
        Ok(())
    }

    pub fn entry_mut(&mut self, handle: i16) -> Result<&mut FileEntry> {
        if handle <= 0 {
            trace!(handle, "handle was never assigned");
            return Err(FsError::InvalidHandle(handle));
        }
        self.entries
            .iter_mut()
            .find(|entry| entry.handle == handle)
            .ok_or_else(|| {
                trace!(handle, "handle does not name an open file");
                FsError::HandleNotOpen(handle)
            })
    }
}

/// Obtains the payload of `slot`: from the cache on a hit, otherwise
/// from the device (loading its cartridge first) with the cache
/// populated on the way out.
fn fault_frame<T: BusTransport>(
    device: &mut DeviceDriver<T>,
    cache: &mut FrameCache,
    slot: Slot,
    buf: &mut Frame,
) -> Result<()> {
    if let Some(payload) = cache.get(slot) {
        buf.copy_from_slice(payload);
        return Ok(());
    }
    device.load(slot.cartridge)?;
    device.read_frame(slot.frame, buf)?;
    cache.put(slot, buf);
    Ok(())
}

/// Reads from the entry's current position into `out`, up to the end
/// of the file. Returns the number of bytes read and advances the
/// position by it.
pub(crate) fn fread<T: BusTransport>(
    device: &mut DeviceDriver<T>,
    cache: &mut FrameCache,
    entry: &mut FileEntry,
    out: &mut [u8],
) -> Result<usize> {
    let position = entry.position as usize;
    let count = out.len().min(entry.length as usize - position);
    if count == 0 {
        return Ok(0);
    }
    let end = position + count;

    let first = position / FRAME_SIZE;
    let last = (end / FRAME_SIZE).min(entry.slots.len() - 1);

    let mut frame_buf = [0u8; FRAME_SIZE];
    for index in first..=last {
        let slot = entry.slots[index];
        fault_frame(device, cache, slot, &mut frame_buf).map_err(|err| {
            debug!(?slot, "read failed fetching a frame from the device");
            err
        })?;
        let frame_start = index * FRAME_SIZE;
        let lo = position.max(frame_start);
        let hi = end.min(frame_start + FRAME_SIZE);
        if lo < hi {
            out[lo - position..hi - position]
                .copy_from_slice(&frame_buf[lo - frame_start..hi - frame_start]);
        }
    }

    entry.position = end as u32;
    Ok(count)
}

/// Writes `data` at the entry's current position, extending the file
/// with freshly allocated slots as needed. Frames are written through
/// to the device before the call returns; length and position advance
/// only once every touched frame has been accepted.
pub(crate) fn fwrite<T: BusTransport>(
    device: &mut DeviceDriver<T>,
    cache: &mut FrameCache,
    allocator: &mut FrameAllocator,
    entry: &mut FileEntry,
    data: &[u8],
) -> Result<usize> {
    if data.is_empty() {
        return Ok(0);
    }
    let position = entry.position as usize;
    let end = position + data.len();

    let frames_needed = (end + FRAME_SIZE - 1) / FRAME_SIZE;
    while entry.slots.len() < frames_needed {
        let slot = allocator.alloc().map_err(|err| {
            debug!(handle = entry.handle, "write failed, no frames left to extend the file");
            err
        })?;
        entry.slots.push(slot);
    }

    let first = position / FRAME_SIZE;
    let last = (end - 1) / FRAME_SIZE;
    let mut frame_buf = [0u8; FRAME_SIZE];
    for index in first..=last {
        let slot = entry.slots[index];
        let frame_start = index * FRAME_SIZE;
        let lo = position.max(frame_start) - frame_start;
        let hi = end.min(frame_start + FRAME_SIZE) - frame_start;
        if hi - lo < FRAME_SIZE {
            // Partial frame: keep the bytes this write does not touch.
            fault_frame(device, cache, slot, &mut frame_buf).map_err(|err| {
                debug!(?slot, "write failed reading back a partially covered frame");
                err
            })?;
        }
        frame_buf[lo..hi].copy_from_slice(&data[frame_start + lo - position..frame_start + hi - position]);
        device.load(slot.cartridge)?;
        device.write_frame(slot.frame, &frame_buf).map_err(|err| {
            debug!(?slot, "write failed to commit a frame to the device");
            err
        })?;
        cache.put(slot, &frame_buf);
    }

    entry.length = entry.length.max(end as u32);
    entry.position = end as u32;
    Ok(data.len())
}
