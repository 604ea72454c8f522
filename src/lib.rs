//! Driver for Corsair AXi digital power supplies behind the Corsair Link
//! USB-serial dongle.
//!
//! The dongle enumerates as a plain serial port (115200 baud, 8N1; a read
//! timeout around one second works well) and bridges to the PSU's
//! PMBus-like register interface. Every byte on the wire is run through a
//! nibble-substitution cipher, so this crate is layered accordingly:
//!
//!  - [`codec`] encodes and decodes individual frames,
//!  - [`transport`] sends and receives them over any
//!    [`embedded_io::Read`] + [`embedded_io::Write`] channel,
//!  - [`client`] implements the register read/write protocol and the
//!    page-addressed register map on top of it,
//!  - [`psu`] is the session layer: identification, rail telemetry and the
//!    per-channel 12V sweep.
//!
//! Tested against the AX760i, AX860i, AX1200i and AX1500i. The protocol is
//! strictly half duplex; never interleave requests from multiple threads on
//! one port.
//!
//! See `demos/monitor.rs` for a complete session against a real port.

pub mod client;
pub mod codec;
pub mod error;
pub mod linear11;
pub mod psu;
pub mod registers;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock_serial;
