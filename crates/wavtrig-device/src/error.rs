use wavtrig_frame::FrameError;
use wavtrig_transport::TransportError;

/// Errors that can occur in device session operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport-level error (opening or releasing the link).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error: invalid argument, malformed reply, timeout or link failure.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The session has been closed.
    #[error("transport closed")]
    TransportClosed,

    /// The connect-time handshake failed and the session was configured to fail fast.
    #[error("handshake failed during {step}: {source}")]
    HandshakeFailed {
        step: &'static str,
        #[source]
        source: FrameError,
    },

    /// The bootloader did not answer the contact sequence as expected.
    #[error("bootloader probe failed: {0}")]
    Bootloader(String),
}

impl DeviceError {
    /// A read did not complete before its deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            DeviceError::Frame(FrameError::Timeout { .. }) => true,
            DeviceError::Transport(err) => err.is_timeout(),
            DeviceError::HandshakeFailed { source, .. } => {
                matches!(source, FrameError::Timeout { .. })
            }
            _ => false,
        }
    }

    /// A reply failed framing validation.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            DeviceError::Frame(FrameError::Malformed(_))
                | DeviceError::HandshakeFailed {
                    source: FrameError::Malformed(_),
                    ..
                }
        )
    }

    /// A parameter was rejected before any I/O.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, DeviceError::Frame(FrameError::InvalidArgument { .. }))
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
