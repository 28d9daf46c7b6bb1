use std::time::Duration;

/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: serialport::Error,
    },

    /// Failed to apply a setting (timeout, buffer clear) to an open port.
    #[error("failed to configure serial port: {0}")]
    Configure(#[source] serialport::Error),

    /// An I/O error occurred on the serial stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking read did not receive the requested byte count in time.
    #[error("read timed out after {timeout:?} ({received} of {expected} bytes)")]
    Timeout {
        expected: usize,
        received: usize,
        timeout: Duration,
    },

    /// The link has been closed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Whether this error is a read deadline expiry rather than a broken link.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
