pub const FRAME_SIZE: usize = 1024; // Bytes per frame, the device's atomic transfer unit
pub const MAX_CARTRIDGES: u16 = 64; // Cartridges in the device grid
pub const MAX_FRAMES_PER_CARTRIDGE: u16 = 1024; // Frames per cartridge

pub const DEFAULT_CACHE_FRAMES: usize = 64; // Cache capacity used unless set_cache_size is called

pub const DEFAULT_DEVICE_HOST: &str = "127.0.0.1";
pub const DEFAULT_DEVICE_PORT: u16 = 19876;
pub const DEVICE_HOST_ENV: &str = "HRAM_DEVICE_HOST"; // Overrides the default host
pub const DEVICE_PORT_ENV: &str = "HRAM_DEVICE_PORT"; // Overrides the default port

/// One frame's worth of payload bytes.
pub type Frame = [u8; FRAME_SIZE];
