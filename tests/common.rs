//! Common utilities for tests
#![allow(unused)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use hramfs::*;

const RET_BIT: u64 = 1 << 47;

/// In-memory stand-in for the HRAM device. Frames are stored sparsely;
/// an unwritten frame reads back as zeroes, which matches a device that
/// was zeroed at power-on. Per-slot counters expose which accesses
/// actually reached the device, so tests can observe cache behavior.
pub struct SimDevice {
    frames: HashMap<Slot, Frame>,
    loaded: Option<u16>,
    powered: bool,
    pub device_reads: HashMap<Slot, usize>,
    pub device_writes: HashMap<Slot, usize>,
}

impl SimDevice {
    pub fn new() -> Self {
        SimDevice {
            frames: HashMap::new(),
            loaded: None,
            powered: false,
            device_reads: HashMap::new(),
            device_writes: HashMap::new(),
        }
    }

    pub fn reads(&self, slot: Slot) -> usize {
        self.device_reads.get(&slot).copied().unwrap_or(0)
    }

    pub fn writes(&self, slot: Slot) -> usize {
        self.device_writes.get(&slot).copied().unwrap_or(0)
    }

    /// Executes one bus request and returns the response word: the
    /// request echoed back, with the return bit set on failure.
    pub fn exchange(&mut self, request: u64, payload: Payload<'_>) -> u64 {
        let word = decode(request);
        let Some(op) = word.opcode() else {
            return request | RET_BIT;
        };
        if !self.powered && op != Opcode::Init {
            return request | RET_BIT;
        }
        match op {
            Opcode::Init => self.powered = true,
            Opcode::LoadCartridge => {
                if word.cartridge >= MAX_CARTRIDGES {
                    return request | RET_BIT;
                }
                self.loaded = Some(word.cartridge);
            }
            Opcode::ZeroCartridge => {
                let Some(cartridge) = self.loaded else {
                    return request | RET_BIT;
                };
                self.frames.retain(|slot, _| slot.cartridge != cartridge);
            }
            Opcode::ReadFrame => {
                let Some(cartridge) = self.loaded else {
                    return request | RET_BIT;
                };
                let Payload::ReadInto(out) = payload else {
                    return request | RET_BIT;
                };
                if word.frame >= MAX_FRAMES_PER_CARTRIDGE {
                    return request | RET_BIT;
                }
                let slot = Slot { cartridge, frame: word.frame };
                match self.frames.get(&slot) {
                    Some(frame) => out.copy_from_slice(frame),
                    None => out.fill(0),
                }
                *self.device_reads.entry(slot).or_insert(0) += 1;
            }
            Opcode::WriteFrame => {
                let Some(cartridge) = self.loaded else {
                    return request | RET_BIT;
                };
                let Payload::WriteFrom(data) = payload else {
                    return request | RET_BIT;
                };
                if word.frame >= MAX_FRAMES_PER_CARTRIDGE {
                    return request | RET_BIT;
                }
                let slot = Slot { cartridge, frame: word.frame };
                self.frames.insert(slot, *data);
                *self.device_writes.entry(slot).or_insert(0) += 1;
            }
            Opcode::Shutdown => self.powered = false,
        }
        request
    }
}

/// Transport that hands requests straight to a shared `SimDevice`,
/// bypassing the network.
pub struct LoopbackTransport {
    pub device: Arc<Mutex<SimDevice>>,
}

impl BusTransport for LoopbackTransport {
    fn exchange(&mut self, request: u64, payload: Payload<'_>) -> Result<u64> {
        Ok(self.device.lock().unwrap().exchange(request, payload))
    }
}

/// A filesystem over a fresh simulated device, plus a handle to the
/// device for inspecting its counters.
pub fn loopback_fs() -> (HramFs<LoopbackTransport>, Arc<Mutex<SimDevice>>) {
    let device = Arc::new(Mutex::new(SimDevice::new()));
    let fs = HramFs::new(LoopbackTransport {
        device: Arc::clone(&device),
    });
    (fs, device)
}

pub fn reads(device: &Arc<Mutex<SimDevice>>, cartridge: u16, frame: u16) -> usize {
    device.lock().unwrap().reads(Slot { cartridge, frame })
}

pub fn writes(device: &Arc<Mutex<SimDevice>>, cartridge: u16, frame: u16) -> usize {
    device.lock().unwrap().writes(Slot { cartridge, frame })
}

/// Serves the TCP wire protocol for `device` on an ephemeral local
/// port and returns the port. Accepts connections until the test
/// process exits, so a client may reconnect after a shutdown.
pub fn serve_device(device: Arc<Mutex<SimDevice>>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { return };
            serve_connection(&mut stream, &device);
        }
    });
    port
}

fn serve_connection(stream: &mut TcpStream, device: &Arc<Mutex<SimDevice>>) {
    let mut word_buf = [0u8; 8];
    loop {
        // A closed client connection ends the session.
        if stream.read_exact(&mut word_buf).is_err() {
            return;
        }
        let request = u64::from_be_bytes(word_buf);
        let op = decode(request).opcode();

        let mut frame = [0u8; FRAME_SIZE];
        let response = match op {
            Some(Opcode::WriteFrame) => {
                stream.read_exact(&mut frame).unwrap();
                device.lock().unwrap().exchange(request, Payload::WriteFrom(&frame))
            }
            Some(Opcode::ReadFrame) => device
                .lock()
                .unwrap()
                .exchange(request, Payload::ReadInto(&mut frame)),
            _ => device.lock().unwrap().exchange(request, Payload::None),
        };
        stream.write_all(&response.to_be_bytes()).unwrap();
        if op == Some(Opcode::ReadFrame) {
            stream.write_all(&frame).unwrap();
        }
        if op == Some(Opcode::Shutdown) {
            return;
        }
    }
}
