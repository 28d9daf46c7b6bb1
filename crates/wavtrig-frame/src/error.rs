use std::time::Duration;

use wavtrig_transport::TransportError;

/// Ways a received frame can fail validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame does not start with `0xF0 0xAA`.
    #[error("bad start markers {found:02X?} (expected [F0, AA])")]
    BadMarkers { found: [u8; 2] },

    /// The last byte is not `0x55`.
    #[error("missing terminator (found 0x{found:02X}, expected 0x55)")]
    MissingTerminator { found: u8 },

    /// The opcode does not match the request.
    #[error("unexpected opcode 0x{found:02X} (expected 0x{expected:02X})")]
    UnexpectedOpcode { expected: u8, found: u8 },

    /// Declared or actual length disagrees with what the frame requires.
    #[error("length mismatch (declared {declared}, actual {actual})")]
    LengthMismatch { declared: usize, actual: usize },
}

/// Errors that can occur during frame encoding, decoding and exchange.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A parameter is outside its documented range. Raised before any I/O.
    #[error("{name} {value} out of range ({min}..={max})")]
    InvalidArgument {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A command needs a parameter that was not supplied.
    #[error("{command} requires a {name} parameter")]
    MissingParameter {
        command: &'static str,
        name: &'static str,
    },

    /// A parameter was supplied for a command that has no slot for it.
    #[error("{command} does not take a {name} parameter")]
    UnexpectedParameter {
        command: &'static str,
        name: &'static str,
    },

    /// A received frame failed marker, opcode or length validation.
    #[error("malformed frame: {0}")]
    Malformed(#[from] ProtocolError),

    /// A blocking read did not receive the requested byte count in time.
    #[error("read timed out after {timeout:?} ({received} of {expected} bytes)")]
    Timeout {
        expected: usize,
        received: usize,
        timeout: Duration,
    },

    /// The underlying link failed.
    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout {
                expected,
                received,
                timeout,
            } => FrameError::Timeout {
                expected,
                received,
                timeout,
            },
            other => FrameError::Transport(other),
        }
    }
}

impl FrameError {
    pub(crate) fn out_of_range(
        name: &'static str,
        value: impl Into<i64>,
        range: std::ops::RangeInclusive<i64>,
    ) -> Self {
        FrameError::InvalidArgument {
            name,
            value: value.into(),
            min: *range.start(),
            max: *range.end(),
        }
    }

    /// Whether the link itself is unusable after this error.
    ///
    /// Timeouts, validation failures and malformed frames leave the link usable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
