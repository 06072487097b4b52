//! Hramfs is a small block-oriented filesystem driver for the HRAM
//! (hierarchical RAM) storage device: a fixed grid of cartridges, each
//! holding fixed-size frames, reached over TCP through a single 64-bit
//! bus register.
//!
//! The crate's layers (from bottom to top):
//! 1. Bus codec: packs and unpacks the 64-bit request register.
//! 2. Transport: one request/response exchange over the wire.      | TcpTransport, or user implemented for tests
//! 3. Device driver: opcode sequencing, loaded-cartridge tracking.
//! 4. Frame cache: priority-ranked cache of hot frames.
//! 5. Allocator and file table: slot handout and per-file metadata.
//! 6. HramFs: the POSIX-like surface (open/close/read/write/seek).

mod allocator;
mod bus;
mod cache;
mod config;
mod device;
mod error;
mod file;
mod fs;
mod transport;

pub use allocator::{FrameAllocator, Slot};
pub use bus::{decode, encode, BusWord, Opcode};
pub use cache::FrameCache;
pub use config::*;
pub use device::DeviceDriver;
pub use error::FsError as Error;
pub use error::Result;
pub use file::{FileEntry, FileTable};
pub use fs::HramFs;
pub use transport::{BusTransport, Payload, TcpTransport};
