//! Serial-port stand-in used by the unit tests.
//!
//! Records everything the driver writes and serves scripted reply bytes.
//! Several replies can be queued back to back; the transport's
//! terminator-delimited reads keep them apart.

pub struct MockSerial {
    /// Everything the driver has written, in order.
    write_buffer: heapless::Vec<u8, 2048>,
    /// Scripted bytes still waiting to be read.
    read_buffer: heapless::Vec<u8, 2048>,
    read_position: usize,
    fail_writes: bool,
    fail_reads: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum MockSerialError {
    /// The script ran out of bytes; models the port's read timeout.
    #[error("scripted reply bytes exhausted")]
    Exhausted,
    /// Scripted hard failure.
    #[error("simulated channel failure")]
    Broken,
    /// A buffer capacity was exceeded while scripting.
    #[error("mock buffer capacity exceeded")]
    Overflow,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Exhausted => embedded_io::ErrorKind::TimedOut,
            MockSerialError::Broken => embedded_io::ErrorKind::BrokenPipe,
            MockSerialError::Overflow => embedded_io::ErrorKind::OutOfMemory,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(MockSerialError::Broken);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::Overflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_reads {
            return Err(MockSerialError::Broken);
        }
        let available = self.read_buffer.len() - self.read_position;
        if available == 0 {
            return Err(MockSerialError::Exhausted);
        }
        let count = buf.len().min(available);
        buf[..count]
            .copy_from_slice(&self.read_buffer[self.read_position..self.read_position + count]);
        self.read_position += count;
        Ok(count)
    }
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            fail_writes: false,
            fail_reads: false,
        }
    }

    /// Append reply bytes to the script.
    pub fn queue_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::Overflow)
    }

    /// Everything written so far, in write order.
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    /// True once every scripted reply byte has been consumed.
    pub fn script_exhausted(&self) -> bool {
        self.read_position == self.read_buffer.len()
    }

    pub fn set_write_error(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn set_read_error(&mut self, fail: bool) {
        self.fail_reads = fail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn records_writes_in_order() {
        let mut mock = MockSerial::new();
        mock.write(&[1, 2]).unwrap();
        mock.write(&[3]).unwrap();
        assert_eq!(mock.written_data(), &[1, 2, 3]);
    }

    #[test]
    fn serves_queued_reads_then_times_out() {
        let mut mock = MockSerial::new();
        mock.queue_read_data(&[0xA8, 0x00]).unwrap();

        let mut byte = [0u8; 1];
        assert_eq!(mock.read(&mut byte).unwrap(), 1);
        assert_eq!(byte[0], 0xA8);
        assert_eq!(mock.read(&mut byte).unwrap(), 1);
        assert!(mock.script_exhausted());
        assert!(matches!(
            mock.read(&mut byte),
            Err(MockSerialError::Exhausted)
        ));
    }

    #[test]
    fn errors_describe_themselves() {
        // embedded_io::Error requires the core error trait.
        let err: &dyn core::error::Error = &MockSerialError::Exhausted;
        assert_eq!(err.to_string(), "scripted reply bytes exhausted");
    }

    #[test]
    fn injected_errors_fire() {
        let mut mock = MockSerial::new();
        mock.queue_read_data(&[0x55]).unwrap();
        mock.set_read_error(true);
        let mut byte = [0u8; 1];
        assert!(matches!(mock.read(&mut byte), Err(MockSerialError::Broken)));

        mock.set_write_error(true);
        assert!(matches!(mock.write(&[0]), Err(MockSerialError::Broken)));
    }
}
