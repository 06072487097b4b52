use thiserror::Error;

use crate::bus::Opcode;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("file handle {0} was never assigned")]
    InvalidHandle(i16),
    #[error("file handle {0} is not open")]
    HandleNotOpen(i16),
    #[error("file is already open")]
    AlreadyOpen,
    #[error("seek to offset {offset} is past the end of the file (length {length})")]
    SeekOutOfRange { offset: u32, length: u32 },
    #[error("no unallocated frames left on the device")]
    AllocatorExhausted,
    #[error("device rejected a {0:?} request")]
    DeviceFault(Opcode),
    #[error("device transport failure: {0}")]
    Transport(#[from] std::io::Error),
    #[error("filesystem is not powered on")]
    CacheNotInitialized,
    #[error("cache size cannot change while powered on")]
    CacheSizeLocked,
}

pub type Result<T> = std::result::Result<T, FsError>;
