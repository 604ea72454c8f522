//! Framed transport over the dongle's serial channel.
//!
//! Centralizes the doubled-wire-length arithmetic so no caller has to redo
//! it: a reply carrying `n` logical bytes occupies `2 * n + 2` wire bytes
//! (header, two symbols per byte, terminator).

use embedded_io::{Error as _, ErrorKind, Read, Write};

use crate::codec::{self, TERMINATOR};
use crate::error::{Error, FrameError, Result};

/// Longest logical reply the dongle produces; used where the exact reply
/// length is unknown (the dongle-name query).
pub const MAX_REPLY_LEN: usize = 512;

/// Applies the nibble cipher over a byte-oriented duplex channel.
///
/// The channel is owned for the transport's lifetime, and every exchange
/// takes `&mut self`: the link is strictly half-duplex, so a write and its
/// mandatory reply read must never interleave with another caller's.
///
/// `L` bounds the wire buffers; the default fits a [`MAX_REPLY_LEN`] reply.
/// Read timeouts are enforced by the channel itself (e.g. the serial port's
/// configured timeout, typically one second at 115200 baud) and surface
/// here as [`Error::Timeout`].
pub struct Transport<S: Read + Write, const L: usize = 1056> {
    interface: S,
}

impl<S: Read + Write, const L: usize> Transport<S, L> {
    pub fn new(interface: S) -> Self {
        Self { interface }
    }

    /// The owned channel. Closing it is terminal for the session.
    pub fn interface(&self) -> &S {
        &self.interface
    }

    /// Encode one command frame and write it to the channel in a single
    /// contiguous burst.
    pub fn write(&mut self, command: u8, data: &[u8]) -> Result<(), S::Error> {
        let mut frame: heapless::Vec<u8, L> = heapless::Vec::new();
        codec::encode_frame(command, data, &mut frame)?;
        log::trace!(
            "tx {} logical bytes as {} wire bytes",
            data.len(),
            frame.len()
        );
        self.interface.write_all(&frame).map_err(Error::Serial)
    }

    /// Read one reply frame and decode it.
    ///
    /// `expected` is the logical payload length the caller is waiting for;
    /// shorter replies (including empty acks) are returned as-is. The
    /// terminator cannot occur inside a frame, and symbols are read one at
    /// a time, so a following reply is never consumed by accident.
    pub fn read(&mut self, expected: usize) -> Result<heapless::Vec<u8, L>, S::Error> {
        let budget = (2 * expected + 2).min(L);
        let mut wire: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.interface.read(&mut byte) {
                Ok(0) => return Err(Error::Closed),
                Ok(_) => {
                    wire.push(byte[0]).map_err(|_| FrameError::BufferFull)?;
                    if byte[0] == TERMINATOR {
                        break;
                    }
                    if wire.len() >= budget {
                        return Err(Error::Framing(FrameError::UnterminatedFrame));
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Other) => {
                    return Err(Error::Timeout);
                }
                Err(e) => return Err(Error::Serial(e)),
            }
        }
        log::trace!("rx {} wire bytes", wire.len());
        Ok(codec::decode_frame(&wire)?)
    }
}
