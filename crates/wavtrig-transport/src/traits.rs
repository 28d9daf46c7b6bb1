use std::time::Duration;

use crate::error::Result;

/// A byte-oriented, exclusively owned serial connection.
///
/// This is the narrow interface every higher layer talks to. Implementations
/// block on every call; there is no internal buffering beyond what the OS or
/// the device driver provides.
pub trait SerialLink {
    /// Write every byte of `bytes` (blocking).
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Fill `buf` completely.
    ///
    /// Returns `TransportError::Timeout` when `timeout` elapses before the
    /// buffer is full. Bytes received before the deadline are consumed.
    fn read_exact_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()>;

    /// Drop any bytes received but not yet read.
    fn discard_input(&mut self) -> Result<()>;

    /// Release the underlying device. Further I/O fails with `TransportError::Closed`.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Link name for diagnostics.
    fn name(&self) -> &str;
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn read_exact_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        (**self).read_exact_timeout(buf, timeout)
    }

    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<L: SerialLink + ?Sized> SerialLink for &mut L {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn read_exact_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        (**self).read_exact_timeout(buf, timeout)
    }

    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
