//! Stateful wrapper over the bus transport.
//!
//! The driver owns the loaded-cartridge tracker: read, write and zero
//! opcodes always target the cartridge most recently loaded, so the
//! filesystem layer must route every frame access through `load`
//! first. Any response with the return bit set is surfaced as a
//! `DeviceFault` and never retried.

use tracing::{debug, trace};

use crate::bus::{decode, encode, BusWord, Opcode};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::transport::{BusTransport, Payload};

pub struct DeviceDriver<T: BusTransport> {
    transport: T,
    loaded: Option<u16>,
}

impl<T: BusTransport> DeviceDriver<T> {
    pub fn new(transport: T) -> Self {
        DeviceDriver {
            transport,
            loaded: None,
        }
    }

    /// The cartridge read/write/zero opcodes currently target.
    pub fn loaded_cartridge(&self) -> Option<u16> {
        self.loaded
    }

    fn request(
        &mut self,
        op: Opcode,
        cartridge: u16,
        frame: u16,
        payload: Payload<'_>,
    ) -> Result<BusWord> {
        let response = self.transport.exchange(encode(op, cartridge, frame), payload)?;
        let word = decode(response);
        if word.ret {
            return Err(FsError::DeviceFault(op));
        }
        Ok(word)
    }

    /// Initializes the device, then loads and zeroes every cartridge
    /// in turn. Leaves the last cartridge loaded.
    pub fn power_on(&mut self) -> Result<()> {
        debug!("initializing device");
        self.request(Opcode::Init, 0, 0, Payload::None)?;
        for cartridge in 0..MAX_CARTRIDGES {
            self.load(cartridge)?;
            self.zero_current()?;
        }
        Ok(())
    }

    pub fn power_off(&mut self) -> Result<()> {
        debug!("shutting down device");
        self.request(Opcode::Shutdown, 0, 0, Payload::None)?;
        self.loaded = None;
        Ok(())
    }

    /// Makes `cartridge` the target of subsequent frame opcodes. Skips
    /// the bus round trip when it is already loaded.
    pub fn load(&mut self, cartridge: u16) -> Result<()> {
        if self.loaded == Some(cartridge) {
            return Ok(());
        }
        trace!(cartridge, "loading cartridge");
        self.request(Opcode::LoadCartridge, cartridge, 0, Payload::None)?;
        self.loaded = Some(cartridge);
        Ok(())
    }

    /// Zeroes every frame of the loaded cartridge.
    pub fn zero_current(&mut self) -> Result<()> {
        self.request(Opcode::ZeroCartridge, 0, 0, Payload::None)?;
        Ok(())
    }

    /// Reads one frame of the loaded cartridge into `out`.
    pub fn read_frame(&mut self, frame: u16, out: &mut Frame) -> Result<()> {
        self.request(Opcode::ReadFrame, 0, frame, Payload::ReadInto(out))?;
        Ok(())
    }

    /// Writes one full frame to the loaded cartridge.
    pub fn write_frame(&mut self, frame: u16, data: &Frame) -> Result<()> {
        self.request(Opcode::WriteFrame, 0, frame, Payload::WriteFrom(data))?;
        Ok(())
    }
}
