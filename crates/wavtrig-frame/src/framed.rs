use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};
use wavtrig_transport::{SerialLink, DEFAULT_TIMEOUT};

use crate::catalog::{Command, Response, HEADER_SIZE};
use crate::codec::{decode_fixed, decode_variable_status, encode, status_frame_len, to_hex, Params};
use crate::error::{FrameError, Result};

/// Default deadline for the status reply; the device answers quickly or not at all.
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_millis(250);

/// Timeouts for frame exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Deadline for fixed-size responses. Default: 5 s.
    pub read_timeout: Duration,
    /// Deadline for each read of a status response. Default: 250 ms.
    pub status_timeout: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_TIMEOUT,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
        }
    }
}

/// Frame-level I/O over a serial link.
///
/// Writes always carry a complete frame. Reads either return a validated
/// payload or an error; after a malformed frame the link's pending input is
/// discarded so the next exchange starts on a frame boundary.
pub struct FramedLink<L> {
    inner: L,
    config: FrameConfig,
}

impl<L: SerialLink> FramedLink<L> {
    /// Wrap a link with default timeouts.
    pub fn new(inner: L) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Wrap a link with explicit timeouts.
    pub fn with_config(inner: L, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Encode and write a command frame.
    pub fn send(&mut self, command: Command, params: &Params) -> Result<()> {
        let frame = encode(command, params)?;
        debug!(command = %command, frame = %to_hex(&frame), "tx");
        self.write_frame(&frame)
    }

    /// Write pre-encoded bytes.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.inner.write_bytes(frame)?;
        Ok(())
    }

    /// Send a parameterless query and read its fixed-size response payload.
    pub fn query_fixed(&mut self, command: Command, response: Response) -> Result<Bytes> {
        self.send(command, &Params::new())?;
        self.read_fixed(response)
    }

    /// Read exactly `response.len` bytes and validate them.
    pub fn read_fixed(&mut self, response: Response) -> Result<Bytes> {
        let mut buf = vec![0u8; response.len];
        self.inner
            .read_exact_timeout(&mut buf, self.config.read_timeout)?;
        debug!(frame = %to_hex(&buf), "rx");

        match decode_fixed(&buf, response.len, response.opcode) {
            Ok(payload) => Ok(Bytes::copy_from_slice(payload)),
            Err(err) => {
                self.resync(&err);
                Err(err)
            }
        }
    }

    /// Read a status response: the 4-byte header, then the declared remainder.
    pub fn read_status(&mut self) -> Result<Vec<i16>> {
        let timeout = self.config.status_timeout;

        let mut frame = vec![0u8; HEADER_SIZE];
        self.inner.read_exact_timeout(&mut frame, timeout)?;

        let total = match status_frame_len(&frame) {
            Ok(total) => total,
            Err(err) => {
                debug!(header = %to_hex(&frame), "rx");
                self.resync(&err);
                return Err(err);
            }
        };

        frame.resize(total, 0);
        self.inner
            .read_exact_timeout(&mut frame[HEADER_SIZE..], timeout)?;
        debug!(frame = %to_hex(&frame), "rx");

        decode_variable_status(&frame).inspect_err(|err| self.resync(err))
    }

    fn resync(&mut self, cause: &FrameError) {
        warn!(error = %cause, "discarding pending input after malformed frame");
        if let Err(err) = self.inner.discard_input() {
            warn!(error = %err, "failed to discard pending input");
        }
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    /// Consume the framed link and return the inner link.
    pub fn into_inner(self) -> L {
        self.inner
    }

    /// Current timeouts.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use wavtrig_transport::MemoryLink;

    use super::*;
    use crate::catalog::{SYS_INFO_RESPONSE, VERSION_RESPONSE};
    use crate::error::ProtocolError;

    #[test]
    fn send_writes_one_complete_frame() {
        let wire = MemoryLink::new();
        let mut link = FramedLink::new(wire.clone());

        link.send(Command::TrackLoad, &Params::new().track(258))
            .unwrap();

        assert_eq!(
            wire.writes(),
            vec![vec![0xF0, 0xAA, 0x08, 0x03, 0x07, 0x02, 0x01, 0x55]]
        );
    }

    #[test]
    fn invalid_argument_writes_nothing() {
        let wire = MemoryLink::new();
        let mut link = FramedLink::new(wire.clone());

        let err = link
            .send(Command::TrackPlay, &Params::new().track(1000))
            .unwrap_err();

        assert!(matches!(err, FrameError::InvalidArgument { .. }));
        assert!(wire.written().is_empty());
    }

    #[test]
    fn query_fixed_returns_payload() {
        let wire =
            MemoryLink::new().with_inbound(&[0xF0, 0xAA, 0x08, 0x82, 0x0E, 0x2C, 0x01, 0x55]);
        let mut link = FramedLink::new(wire.clone());

        let payload = link
            .query_fixed(Command::GetSysInfo, SYS_INFO_RESPONSE)
            .unwrap();

        assert_eq!(payload.as_ref(), &[0x0E, 0x2C, 0x01]);
        assert_eq!(wire.written(), vec![0xF0, 0xAA, 0x05, 0x02, 0x55]);
    }

    #[test]
    fn malformed_fixed_response_discards_pending_input() {
        let wire = MemoryLink::new()
            .with_inbound(&[0xF0, 0xAA, 0x08, 0x82, 0x0E, 0x2C, 0x01, 0x00])
            .with_inbound(&[0xDE, 0xAD]);
        let mut link = FramedLink::new(wire.clone());

        let err = link.read_fixed(SYS_INFO_RESPONSE).unwrap_err();

        assert!(matches!(
            err,
            FrameError::Malformed(ProtocolError::MissingTerminator { .. })
        ));
        assert_eq!(wire.pending_inbound(), 0);
        assert_eq!(wire.discards(), 1);
    }

    #[test]
    fn short_fixed_response_is_timeout_not_malformed() {
        let wire = MemoryLink::new().with_inbound(&[0xF0, 0xAA, 0x19, 0x81]);
        let mut link = FramedLink::new(wire.clone());

        let err = link.read_fixed(VERSION_RESPONSE).unwrap_err();

        assert!(matches!(
            err,
            FrameError::Timeout {
                expected: 25,
                received: 4,
                ..
            }
        ));
        assert!(!err.is_fatal());
        assert_eq!(wire.discards(), 0);
    }

    #[test]
    fn read_status_with_tracks() {
        let wire =
            MemoryLink::new().with_inbound(&[0xF0, 0xAA, 0x09, 0x83, 0x01, 0x00, 0x0A, 0x00, 0x55]);
        let mut link = FramedLink::new(wire);

        assert_eq!(link.read_status().unwrap(), vec![1, 10]);
    }

    #[test]
    fn read_status_idle() {
        let wire = MemoryLink::new().with_inbound(&[0xF0, 0xAA, 0x04, 0x83, 0x55]);
        let mut link = FramedLink::new(wire.clone());

        assert!(link.read_status().unwrap().is_empty());
        assert_eq!(wire.pending_inbound(), 0);
    }

    #[test]
    fn read_status_bad_header_discards() {
        let wire = MemoryLink::new().with_inbound(&[0x00, 0xAA, 0x05, 0x83, 0x55, 0x55]);
        let mut link = FramedLink::new(wire.clone());

        let err = link.read_status().unwrap_err();

        assert!(matches!(
            err,
            FrameError::Malformed(ProtocolError::BadMarkers { .. })
        ));
        assert_eq!(wire.pending_inbound(), 0);
    }

    #[test]
    fn read_status_bad_terminator_discards_rest() {
        let wire = MemoryLink::new()
            .with_inbound(&[0xF0, 0xAA, 0x09, 0x83, 0x01, 0x00, 0x0A, 0x00, 0x00, 0x12, 0x34]);
        let mut link = FramedLink::new(wire.clone());

        let err = link.read_status().unwrap_err();

        assert!(matches!(
            err,
            FrameError::Malformed(ProtocolError::MissingTerminator { found: 0x00 })
        ));
        assert_eq!(wire.pending_inbound(), 0);
        assert_eq!(wire.discards(), 1);
    }

    #[test]
    fn read_status_without_reply_times_out() {
        let mut link = FramedLink::new(MemoryLink::new());
        let err = link.read_status().unwrap_err();
        assert!(matches!(err, FrameError::Timeout { expected: 4, .. }));
    }

    #[test]
    fn transport_failure_is_fatal() {
        let wire = MemoryLink::new();
        wire.fail_next_write(std::io::ErrorKind::BrokenPipe);
        let mut link = FramedLink::new(wire);

        let err = link.send(Command::StopAll, &Params::new()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn config_defaults() {
        let config = FrameConfig::default();
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.status_timeout, Duration::from_millis(250));
    }
}
