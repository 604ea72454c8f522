//! Page-addressed register transactions over the dongle transport.
//!
//! Register access is a two-step exchange (setup, then trigger) and every
//! read is implicitly scoped by whichever page the PSU firmware currently
//! has selected. That page lives in the firmware, not here; this client
//! keeps a last-confirmed copy purely so it knows when a re-select can be
//! skipped, and it forgets that copy the moment any transaction fails.

use embedded_io::{Read, Write};
use strum_macros::Display;

use crate::error::{Error, FrameError, Result};
use crate::registers::CommandCode;
use crate::transport::Transport;

/// Sub-command that opens a register read or write sequence.
const REG_SETUP: u8 = 0x13;
/// Sub-command that triggers delivery of a prepared register read.
const REG_TRIGGER: u8 = 0x08;

/// The PSU keeps two independent page selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PageSpace {
    /// Register 0x00, selecting the +12V/+5V/+3.3V rail.
    #[strum(serialize = "main")]
    Main,
    /// Register 0xE7, selecting one individually monitored 12V output
    /// channel.
    #[strum(serialize = "12V")]
    TwelveVolt,
}

impl PageSpace {
    /// Page register this space is addressed through.
    pub fn register(self) -> u8 {
        match self {
            PageSpace::Main => CommandCode::Page.into(),
            PageSpace::TwelveVolt => CommandCode::Page12V.into(),
        }
    }

    /// Total write-and-verify attempts a page switch may need. The 12V
    /// sub-page mux is slower and less reliable than the main one; these
    /// budgets reflect observed firmware behavior and must not be evened
    /// out.
    pub fn retry_budget(self) -> usize {
        match self {
            PageSpace::Main => 3,
            PageSpace::TwelveVolt => 5,
        }
    }
}

/// Register read/write/page-select primitives.
pub struct RegisterClient<S: Read + Write, const L: usize = 1056> {
    transport: Transport<S, L>,
    /// Last page confirmed in each space, cleared whenever a transaction
    /// fails, since the firmware-side selector can no longer be trusted.
    main_page: Option<u8>,
    twelve_volt_page: Option<u8>,
}

impl<S: Read + Write, const L: usize> RegisterClient<S, L> {
    pub fn new(transport: Transport<S, L>) -> Self {
        Self {
            transport,
            main_page: None,
            twelve_volt_page: None,
        }
    }

    /// The underlying framed transport, for the dongle-level queries that
    /// precede register and page semantics.
    pub fn transport_mut(&mut self) -> &mut Transport<S, L> {
        &mut self.transport
    }

    /// Read `len` bytes from a PSU register on the currently selected page.
    pub fn read_register(
        &mut self,
        register: impl Into<u8>,
        len: usize,
    ) -> Result<heapless::Vec<u8, L>, S::Error> {
        let register = register.into();
        let result = self.read_transaction(register, len);
        if result.is_err() {
            self.forget_pages();
        }
        result
    }

    fn read_transaction(
        &mut self,
        register: u8,
        len: usize,
    ) -> Result<heapless::Vec<u8, L>, S::Error> {
        // Setup: fixed protocol constants, then length and target register.
        self.transport
            .write(0, &[REG_SETUP, 3, 6, 1, 7, len as u8, register])?;
        let ack = self.transport.read(2)?;
        if !ack.is_empty() {
            log::debug!(
                "register {register:#04x}: setup acked with {} bytes, expected none",
                ack.len()
            );
            return Err(Error::Protocol { register });
        }

        self.transport.write(0, &[REG_TRIGGER, 7, len as u8])?;
        let mut reply = self.transport.read(len + 1)?;
        if reply.len() != len + 1 {
            return Err(Error::InvalidReply);
        }
        // Trailing status/echo byte; meaning unknown, always discarded.
        reply.truncate(len);
        Ok(reply)
    }

    /// Write bytes to a PSU register. Returns the ack byte when the
    /// firmware sends one; page writes ack with an empty frame.
    ///
    /// No retry is built in here. Page selection layers its own verify
    /// loop on top via [`Self::select_page`].
    pub fn write_register(
        &mut self,
        register: impl Into<u8>,
        data: &[u8],
    ) -> Result<Option<u8>, S::Error> {
        let register = register.into();
        let result = self.write_transaction(register, data);
        if result.is_err() {
            self.forget_pages();
        }
        result
    }

    fn write_transaction(&mut self, register: u8, data: &[u8]) -> Result<Option<u8>, S::Error> {
        let mut frame: heapless::Vec<u8, L> = heapless::Vec::new();
        frame
            .extend_from_slice(&[REG_SETUP, 1, 4, (data.len() + 1) as u8, register])
            .map_err(|_| FrameError::BufferFull)?;
        frame
            .extend_from_slice(data)
            .map_err(|_| FrameError::BufferFull)?;
        self.transport.write(0, &frame)?;
        let ack = self.transport.read(1)?;
        Ok(ack.first().copied())
    }

    /// Select `page` in the given space, verifying the firmware actually
    /// switched. Each attempt re-writes the page and reads it back, up to
    /// the space's budget.
    pub fn select_page(&mut self, page: u8, space: PageSpace) -> Result<(), S::Error> {
        let register = space.register();
        for attempt in 1..=space.retry_budget() {
            self.write_register(register, &[page])?;
            let current = self.read_register(register, 1)?;
            if current.first() == Some(&page) {
                self.record_page(space, page);
                return Ok(());
            }
            log::debug!(
                "{space} page {page:#04x} not taken (attempt {attempt}/{})",
                space.retry_budget()
            );
        }
        self.forget_pages();
        Err(Error::PageSelect { page, space })
    }

    /// Like [`Self::select_page`], but skips the exchange when the page was
    /// already confirmed and nothing has failed since.
    pub fn ensure_page(&mut self, page: u8, space: PageSpace) -> Result<(), S::Error> {
        let known = match space {
            PageSpace::Main => self.main_page,
            PageSpace::TwelveVolt => self.twelve_volt_page,
        };
        if known == Some(page) {
            return Ok(());
        }
        self.select_page(page, space)
    }

    fn record_page(&mut self, space: PageSpace, page: u8) {
        match space {
            PageSpace::Main => self.main_page = Some(page),
            PageSpace::TwelveVolt => self.twelve_volt_page = Some(page),
        }
    }

    fn forget_pages(&mut self) {
        self.main_page = None;
        self.twelve_volt_page = None;
    }
}
