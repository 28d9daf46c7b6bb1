use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::SerialLink;

/// Baud rate the WAV Trigger firmware ships with.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Default read/write timeout for a serial link.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameters for opening a serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path or identifier (`/dev/ttyUSB0`, `COM3`).
    pub path: String,
    /// Baud rate. Must match the rate configured in the device's init file.
    pub baud_rate: u32,
    /// Timeout applied to blocking writes and used as the default read deadline.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Configuration for `path` with default baud rate and timeout.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Serial link backed by an OS serial device.
pub struct SerialPortLink {
    port: Option<Box<dyn SerialPort>>,
    path: String,
    timeout: Duration,
}

impl SerialPortLink {
    /// Open the device described by `config`.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(config.path.as_str(), config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: config.path.clone(),
                source,
            })?;

        info!(path = %config.path, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            port: Some(port),
            path: config.path.clone(),
            timeout: config.timeout,
        })
    }

    /// The device path this link was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

impl SerialLink for SerialPortLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port_mut()?;

        let mut offset = 0usize;
        while offset < bytes.len() {
            match port.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match port.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn read_exact_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let configured = self.timeout;
        let port = self.port_mut()?;
        let read = read_until_full(buf, timeout, |chunk, remaining| {
            port.set_timeout(remaining).map_err(std::io::Error::from)?;
            port.read(chunk)
        });

        // The port timeout also bounds writes; put the configured one back.
        let restored = port.set_timeout(configured);
        read?;
        restored.map_err(TransportError::Configure)
    }

    fn discard_input(&mut self) -> Result<()> {
        let port = self.port_mut()?;
        port.clear(ClearBuffer::Input)
            .map_err(TransportError::Configure)?;
        debug!("discarded pending serial input");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(port) = self.port.take() {
            drop(port);
            info!(path = %self.path, "closed serial port");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("path", &self.path)
            .field("open", &self.port.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Drive `read_some` until `buf` is full or the deadline passes.
///
/// `read_some` receives the unfilled tail and the time left before the deadline.
pub(crate) fn read_until_full<F>(buf: &mut [u8], timeout: Duration, mut read_some: F) -> Result<()>
where
    F: FnMut(&mut [u8], Duration) -> std::io::Result<usize>,
{
    let expected = buf.len();
    let deadline = Instant::now() + timeout;
    let mut filled = 0usize;

    while filled < expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::Timeout {
                expected,
                received: filled,
                timeout,
            });
        }

        match read_some(&mut buf[filled..], remaining) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) if err.kind() == ErrorKind::TimedOut => {
                return Err(TransportError::Timeout {
                    expected,
                    received: filled,
                    timeout,
                });
            }
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    Ok(())
}
