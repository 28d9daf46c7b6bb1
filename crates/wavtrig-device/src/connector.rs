use wavtrig_transport::{SerialConfig, SerialPortLink};

use crate::error::Result;
use crate::session::{SessionConfig, WavTrigger};

/// Open a serial device at 57600 baud and run the handshake.
pub fn connect(path: impl Into<String>) -> Result<WavTrigger<SerialPortLink>> {
    connect_with_config(&SerialConfig::new(path), SessionConfig::default())
}

/// Connect with explicit configuration.
///
/// The session's fixed-response deadline follows `serial.timeout`, so the
/// handshake waits exactly as long as the port was configured to.
pub fn connect_with_config(
    serial: &SerialConfig,
    mut session: SessionConfig,
) -> Result<WavTrigger<SerialPortLink>> {
    let link = SerialPortLink::open(serial)?;
    session.frame.read_timeout = serial.timeout;
    WavTrigger::with_link(link, session)
}
