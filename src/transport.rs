//! The transport seam between the driver and the storage device.
//!
//! A transport carries one exchange at a time: an 8-byte request
//! register, an optional full-frame payload whose direction depends on
//! the opcode, and an 8-byte response register. `TcpTransport` is the
//! production implementation talking to the remote device server;
//! tests substitute in-memory transports through the same trait.

use std::env;
use std::io::{Read, Write};
use std::net::TcpStream;

use tracing::trace;

use crate::bus::{decode, Opcode};
use crate::config::*;
use crate::error::Result;

/// Frame payload accompanying one exchange. The variant must match the
/// transfer direction of the opcode in the request word.
pub enum Payload<'a> {
    None,
    ReadInto(&'a mut Frame),
    WriteFrom(&'a Frame),
}

pub trait BusTransport {
    /// Performs one request/response exchange with the device and
    /// returns the response register.
    fn exchange(&mut self, request: u64, payload: Payload<'_>) -> Result<u64>;
}

/// TCP client for the remote device server.
///
/// The connection is opened lazily on the first exchange and reused
/// afterwards. A `Shutdown` exchange closes the socket and re-arms the
/// lazy connect, so a later exchange starts a fresh session.
pub struct TcpTransport {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        TcpTransport {
            host: host.into(),
            port,
            stream: None,
        }
    }

    /// Builds a transport for the endpoint named by the environment,
    /// falling back to the baked-in defaults.
    pub fn from_env() -> Self {
        let host = env::var(DEVICE_HOST_ENV).unwrap_or_else(|_| DEFAULT_DEVICE_HOST.into());
        let port = env::var(DEVICE_PORT_ENV)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_DEVICE_PORT);
        Self::new(host, port)
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        match self.stream {
            Some(ref mut stream) => Ok(stream),
            None => {
                trace!(host = %self.host, port = self.port, "connecting to device server");
                let stream = TcpStream::connect((self.host.as_str(), self.port))?;
                Ok(self.stream.insert(stream))
            }
        }
    }
}

impl BusTransport for TcpTransport {
    fn exchange(&mut self, request: u64, payload: Payload<'_>) -> Result<u64> {
        let stream = self.stream()?;
        // Only the register is byte-swapped; frame payloads are opaque.
        stream.write_all(&request.to_be_bytes())?;

        let mut word = [0u8; 8];
        match payload {
            Payload::WriteFrom(frame) => {
                stream.write_all(frame)?;
                stream.read_exact(&mut word)?;
            }
            Payload::ReadInto(frame) => {
                stream.read_exact(&mut word)?;
                stream.read_exact(frame)?;
            }
            Payload::None => stream.read_exact(&mut word)?,
        }
        let response = u64::from_be_bytes(word);
        trace!(request, response, "bus exchange");

        if decode(request).opcode() == Some(Opcode::Shutdown) {
            trace!("shutdown acknowledged, dropping device connection");
            self.stream = None;
        }
        Ok(response)
    }
}
