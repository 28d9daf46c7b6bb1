use std::fmt;
use std::io;

use wavtrig_device::DeviceError;
use wavtrig_frame::FrameError;
use wavtrig_transport::{serialport, TransportError};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. }
            if matches!(
                source.kind(),
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied)
            ) =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::InvalidArgument { .. }
        | FrameError::MissingParameter { .. }
        | FrameError::UnexpectedParameter { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::Malformed(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::Transport(err) => transport_error(context, err),
    }
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::Transport(err) => transport_error(context, err),
        DeviceError::Frame(err) => frame_error(context, err),
        DeviceError::HandshakeFailed { step, source } => {
            frame_error(&format!("{context} ({step})"), source)
        }
        DeviceError::TransportClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        DeviceError::Bootloader(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wavtrig_frame::ProtocolError;

    use super::*;

    #[test]
    fn invalid_argument_is_usage() {
        let err = DeviceError::Frame(FrameError::InvalidArgument {
            name: "track",
            value: 0,
            min: 1,
            max: 999,
        });
        assert_eq!(device_error("play", err).code, USAGE);
    }

    #[test]
    fn timeouts_map_to_124() {
        let err = DeviceError::Frame(FrameError::Timeout {
            expected: 4,
            received: 0,
            timeout: Duration::from_millis(250),
        });
        assert_eq!(device_error("status", err).code, TIMEOUT);
    }

    #[test]
    fn malformed_is_data_invalid() {
        let err = FrameError::Malformed(ProtocolError::MissingTerminator { found: 0 });
        assert_eq!(frame_error("info", err).code, DATA_INVALID);
    }

    #[test]
    fn handshake_failure_keeps_step_in_message() {
        let err = DeviceError::HandshakeFailed {
            step: "version",
            source: FrameError::Timeout {
                expected: 25,
                received: 0,
                timeout: Duration::from_secs(5),
            },
        };
        let cli = device_error("handshake failed", err);
        assert_eq!(cli.code, TIMEOUT);
        assert!(cli.message.starts_with("handshake failed (version)"));
    }

    #[test]
    fn closed_session_is_failure() {
        assert_eq!(device_error("play", DeviceError::TransportClosed).code, FAILURE);
    }
}
