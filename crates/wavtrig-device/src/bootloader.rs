//! Contact probe for the WAV Trigger's serial bootloader.
//!
//! With the board held in boot mode the UART speaks the STM32 system
//! bootloader protocol instead of the player protocol. The probe syncs
//! with `0x7F`, then issues GET (`0x00 0xFF`) and returns the raw reply.
//! Nothing is written to flash.

use std::time::Duration;

use tracing::{debug, info};
use wavtrig_frame::to_hex;
use wavtrig_transport::{SerialLink, TransportError};

use crate::error::{DeviceError, Result};

/// Auto-baud sync byte.
pub const SYNC: u8 = 0x7F;

/// Positive acknowledge.
pub const ACK: u8 = 0x79;

/// GET command followed by its complement.
pub const GET_COMMAND: [u8; 2] = [0x00, 0xFF];

/// Largest GET reply body accepted.
pub const MAX_REPLY_LEN: usize = 64;

/// Probe timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootloaderConfig {
    /// Sync bytes sent before giving up. Default: 50.
    pub attempts: usize,
    /// Deadline for each read. Default: 250 ms.
    pub timeout: Duration,
}

impl Default for BootloaderConfig {
    fn default() -> Self {
        Self {
            attempts: 50,
            timeout: Duration::from_millis(250),
        }
    }
}

/// Raw GET reply from the bootloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootloaderInfo {
    pub raw: Vec<u8>,
}

impl BootloaderInfo {
    /// Bootloader protocol version, the first reply byte.
    pub fn version(&self) -> Option<u8> {
        self.raw.first().copied()
    }

    pub fn hex(&self) -> String {
        to_hex(&self.raw)
    }
}

/// Sync with the bootloader and read its GET reply.
pub fn probe<L: SerialLink>(link: &mut L, config: &BootloaderConfig) -> Result<BootloaderInfo> {
    sync(link, config)?;

    link.write_bytes(&GET_COMMAND)?;

    let mut head = [0u8; 2];
    read(link, &mut head, config.timeout, "GET reply header")?;
    if head[0] != ACK {
        return Err(DeviceError::Bootloader(format!(
            "invalid acknowledge 0x{:02X}",
            head[0]
        )));
    }

    let count = head[1] as usize;
    if count > MAX_REPLY_LEN {
        return Err(DeviceError::Bootloader(format!(
            "reply count {count} exceeds {MAX_REPLY_LEN}"
        )));
    }

    let mut raw = vec![0u8; count];
    read(link, &mut raw, config.timeout, "GET reply body")?;

    let info = BootloaderInfo { raw };
    info!(reply = %info.hex(), "bootloader answered");
    Ok(info)
}

fn sync<L: SerialLink>(link: &mut L, config: &BootloaderConfig) -> Result<()> {
    let mut reply = [0u8; 1];
    for attempt in 1..=config.attempts {
        link.write_bytes(&[SYNC])?;
        match link.read_exact_timeout(&mut reply, config.timeout) {
            Ok(()) if reply[0] == ACK => {
                debug!(attempt, "bootloader synced");
                return Ok(());
            }
            Ok(()) => debug!(attempt, byte = reply[0], "unexpected sync reply"),
            Err(err) if err.is_timeout() => debug!(attempt, "no sync reply"),
            Err(err) => return Err(err.into()),
        }
    }
    Err(DeviceError::Bootloader(format!(
        "no acknowledge after {} attempts",
        config.attempts
    )))
}

fn read<L: SerialLink>(
    link: &mut L,
    buf: &mut [u8],
    timeout: Duration,
    what: &str,
) -> Result<()> {
    match link.read_exact_timeout(buf, timeout) {
        Ok(()) => Ok(()),
        Err(TransportError::Timeout {
            expected, received, ..
        }) => Err(DeviceError::Bootloader(format!(
            "{what} truncated ({received} of {expected} bytes)"
        ))),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use wavtrig_transport::MemoryLink;

    use super::*;

    fn quick(attempts: usize) -> BootloaderConfig {
        BootloaderConfig {
            attempts,
            timeout: Duration::from_millis(1),
        }
    }

    #[test]
    fn probe_reads_get_reply() {
        let probe_link = MemoryLink::new().with_inbound(&[ACK, ACK, 3, 0x31, 0x00, 0x01]);
        let mut link = probe_link.clone();

        let info = probe(&mut link, &BootloaderConfig::default()).unwrap();

        assert_eq!(info.raw, vec![0x31, 0x00, 0x01]);
        assert_eq!(info.version(), Some(0x31));
        assert_eq!(info.hex(), "310001");
        assert_eq!(probe_link.writes(), vec![vec![SYNC], GET_COMMAND.to_vec()]);
    }

    #[test]
    fn sync_retries_until_ack() {
        let probe_link = MemoryLink::new().with_inbound(&[0x1F, 0x00, ACK, ACK, 0]);
        let mut link = probe_link.clone();

        let info = probe(&mut link, &quick(5)).unwrap();

        assert!(info.raw.is_empty());
        assert_eq!(info.version(), None);
        let syncs = probe_link
            .writes()
            .iter()
            .filter(|w| w.as_slice() == [SYNC])
            .count();
        assert_eq!(syncs, 3);
    }

    #[test]
    fn no_ack_gives_up() {
        let probe_link = MemoryLink::new();
        let mut link = probe_link.clone();

        let err = probe(&mut link, &quick(4)).unwrap_err();

        assert!(matches!(err, DeviceError::Bootloader(_)));
        assert_eq!(probe_link.writes().len(), 4);
    }

    #[test]
    fn rejects_bad_acknowledge() {
        let mut link = MemoryLink::new().with_inbound(&[ACK, 0x1F, 3]);
        let err = probe(&mut link, &quick(1)).unwrap_err();
        assert!(err.to_string().contains("invalid acknowledge 0x1F"));
    }

    #[test]
    fn rejects_oversized_count() {
        let mut link = MemoryLink::new().with_inbound(&[ACK, ACK, 65]);
        let err = probe(&mut link, &quick(1)).unwrap_err();
        assert!(err.to_string().contains("exceeds 64"));
    }

    #[test]
    fn truncated_body_is_bootloader_error() {
        let mut link = MemoryLink::new().with_inbound(&[ACK, ACK, 4, 0x31]);
        let err = probe(&mut link, &quick(1)).unwrap_err();
        assert!(matches!(err, DeviceError::Bootloader(ref m) if m.contains("1 of 4")));
    }

    #[test]
    fn broken_link_is_transport_error() {
        let mut link = MemoryLink::new();
        link.fail_next_write(std::io::ErrorKind::BrokenPipe);
        let err = probe(&mut link, &quick(3)).unwrap_err();
        assert!(matches!(err, DeviceError::Transport(TransportError::Io(_))));
    }
}
