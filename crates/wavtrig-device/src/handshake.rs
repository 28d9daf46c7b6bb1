use serde::Serialize;
use tracing::{debug, warn};
use wavtrig_frame::{
    decode_sys_info, decode_version, Command, FrameError, FramedLink, SYS_INFO_RESPONSE,
    VERSION_RESPONSE,
};
use wavtrig_transport::SerialLink;

use crate::error::{DeviceError, Result};

/// What to do when the connect-time queries fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakePolicy {
    /// Record empty version / zero counts and keep the session usable.
    #[default]
    BestEffort,
    /// Abort connection with [`DeviceError::HandshakeFailed`].
    FailFast,
}

/// Identification captured once at connect time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Firmware version text, trimmed. Empty when the query failed.
    pub version: String,
    /// Number of playback voices.
    pub voices: u8,
    /// Number of tracks on the card.
    pub tracks: i16,
}

/// Query firmware version text.
pub fn read_version<L: SerialLink>(link: &mut FramedLink<L>) -> wavtrig_frame::Result<String> {
    let payload = link.query_fixed(Command::GetVersion, VERSION_RESPONSE)?;
    Ok(decode_version(&payload))
}

/// Query voice and track counts.
pub fn read_sys_info<L: SerialLink>(link: &mut FramedLink<L>) -> wavtrig_frame::Result<(u8, i16)> {
    let payload = link.query_fixed(Command::GetSysInfo, SYS_INFO_RESPONSE)?;
    decode_sys_info(&payload)
}

/// Run the version and system-info queries in order.
///
/// Under [`HandshakePolicy::BestEffort`] a timeout or malformed reply leaves
/// the corresponding fields at their defaults. A failed link is always an
/// error, regardless of policy.
pub fn handshake<L: SerialLink>(
    link: &mut FramedLink<L>,
    policy: HandshakePolicy,
) -> Result<DeviceInfo> {
    let mut info = DeviceInfo::default();

    match read_version(link) {
        Ok(version) => info.version = version,
        Err(err) => tolerate("version", err, policy)?,
    }

    match read_sys_info(link) {
        Ok((voices, tracks)) => {
            info.voices = voices;
            info.tracks = tracks;
        }
        Err(err) => tolerate("sys_info", err, policy)?,
    }

    debug!(
        version = %info.version,
        voices = info.voices,
        tracks = info.tracks,
        "handshake complete"
    );
    Ok(info)
}

fn tolerate(step: &'static str, err: FrameError, policy: HandshakePolicy) -> Result<()> {
    if err.is_fatal() || policy == HandshakePolicy::FailFast {
        return Err(DeviceError::HandshakeFailed { step, source: err });
    }
    warn!(step, error = %err, "handshake query failed, continuing with defaults");
    Ok(())
}
