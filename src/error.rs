//! Error types for the AXi dongle driver.

use thiserror::Error;

use crate::client::PageSpace;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Errors surfaced by dongle and register transactions.
///
/// None of these are retried internally except the page-select verify loop;
/// retrying after a timeout on the half-duplex link risks desynchronizing
/// the stream, so I/O failures surface immediately.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("serial communication error")]
    Serial(I),
    #[error("timed out waiting for a reply")]
    Timeout,
    #[error("channel closed")]
    Closed,
    #[error("malformed wire frame: {0}")]
    Framing(#[from] FrameError),
    #[error("unexpected non-empty setup reply for register {register:#04x}")]
    Protocol { register: u8 },
    #[error("reply shorter than the requested payload")]
    InvalidReply,
    #[error("could not select {space} page {page:#04x}")]
    PageSelect { page: u8, space: PageSpace },
}

/// Wire-level decode failures. Always fatal for the current transaction.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("reply header {0:#04x} does not carry the reply sentinel")]
    BadHeader(u8),
    #[error("wire byte {0:#04x} is not a cipher symbol")]
    InvalidSymbol(u8),
    #[error("{0} data symbols do not form whole bytes")]
    OddLength(usize),
    #[error("frame ended without a terminator")]
    UnterminatedFrame,
    #[error("frame exceeds buffer capacity")]
    BufferFull,
}
