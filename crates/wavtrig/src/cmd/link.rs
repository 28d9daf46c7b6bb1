use tracing::debug;
use wavtrig_device::{bootloader, HandshakePolicy, SessionConfig, WavTrigger};
use wavtrig_frame::{to_hex, FrameConfig};
use wavtrig_transport::{MemoryLink, SerialConfig, SerialLink, SerialPortLink};

use crate::cmd::{parse_duration, LinkArgs};
use crate::exit::{device_error, transport_error, CliError, CliResult, INTERNAL, USAGE};

pub type Session = WavTrigger<Box<dyn SerialLink>>;

/// Port label used in output when `--dry-run` is set.
pub const DRY_RUN_PORT: &str = "dry-run";

/// What the in-memory link answers with in dry-run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Simulated {
    Player,
    Bootloader,
}

/// An opened link, plus the recorder behind it in dry-run mode.
pub struct RawLink {
    pub link: Box<dyn SerialLink>,
    pub port: String,
    pub recorder: Option<MemoryLink>,
}

/// An open session that never stops playback on the way out.
///
/// Dropping a `Connection` (including on an error path) detaches the session
/// instead of closing it, so a failed command cannot send STOP_ALL.
pub struct Connection {
    session: Option<Session>,
    pub port: String,
    recorder: Option<MemoryLink>,
}

impl Connection {
    pub fn session(&mut self) -> CliResult<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| CliError::new(INTERNAL, "session already released"))
    }

    pub fn dry_run(&self) -> bool {
        self.recorder.is_some()
    }

    /// Queue an idle status reply ahead of a dry-run status query.
    pub fn simulate_idle_status(&self) {
        if let Some(recorder) = &self.recorder {
            recorder.push_inbound(&[0xF0, 0xAA, 0x04, 0x83, 0x55]);
        }
    }

    /// Release the port without STOP_ALL; returns frames recorded in dry-run mode.
    pub fn finish(mut self) -> CliResult<Vec<String>> {
        self.release()?;
        Ok(recorded(self.recorder.as_ref()))
    }

    fn release(&mut self) -> CliResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let mut link = session
            .detach()
            .map_err(|err| device_error("release failed", err))?;
        link.close()
            .map_err(|err| transport_error("close failed", err))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            debug!(error = %err, "release on drop failed");
        }
    }
}

pub fn open_link(args: &LinkArgs, simulated: Simulated) -> CliResult<RawLink> {
    if args.dry_run {
        let recorder = simulator(simulated);
        return Ok(RawLink {
            link: Box::new(recorder.clone()),
            port: DRY_RUN_PORT.to_string(),
            recorder: Some(recorder),
        });
    }

    let path = args.port.clone().ok_or_else(|| {
        CliError::new(USAGE, "no serial port given (use --port or WAVTRIG_PORT)")
    })?;
    let config = SerialConfig {
        path: path.clone(),
        baud_rate: args.baud,
        timeout: parse_duration(&args.timeout)?,
    };
    let link = SerialPortLink::open(&config)
        .map_err(|err| transport_error(&format!("cannot open {path}"), err))?;

    Ok(RawLink {
        link: Box::new(link),
        port: path,
        recorder: None,
    })
}

pub fn open_session(args: &LinkArgs) -> CliResult<Connection> {
    let config = SessionConfig {
        frame: FrameConfig {
            read_timeout: parse_duration(&args.timeout)?,
            ..FrameConfig::default()
        },
        handshake: if args.strict_handshake {
            HandshakePolicy::FailFast
        } else {
            HandshakePolicy::BestEffort
        },
    };

    let RawLink {
        link,
        port,
        recorder,
    } = open_link(args, Simulated::Player)?;
    let session =
        WavTrigger::with_link(link, config).map_err(|err| device_error("handshake failed", err))?;

    if let Some(recorder) = &recorder {
        debug!(frames = recorder.writes().len(), "dry run: dropping handshake frames");
        recorder.clear_writes();
    }

    Ok(Connection {
        session: Some(session),
        port,
        recorder,
    })
}

fn recorded(recorder: Option<&MemoryLink>) -> Vec<String> {
    recorder
        .map(|r| r.writes().iter().map(|frame| to_hex(frame)).collect())
        .unwrap_or_default()
}

fn simulator(simulated: Simulated) -> MemoryLink {
    match simulated {
        Simulated::Player => {
            let mut version = vec![0xF0, 0xAA, 0x19, 0x81];
            let mut text = [0u8; 20];
            text[..7].copy_from_slice(b"dry-run");
            version.extend_from_slice(&text);
            version.push(0x55);

            MemoryLink::new()
                .with_inbound(&version)
                .with_inbound(&[0xF0, 0xAA, 0x08, 0x82, 0x0E, 0x00, 0x00, 0x55])
        }
        Simulated::Bootloader => {
            MemoryLink::new().with_inbound(&[bootloader::ACK, bootloader::ACK, 0x00])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dry_run_args() -> LinkArgs {
        LinkArgs {
            port: None,
            baud: 57_600,
            timeout: "1s".into(),
            strict_handshake: true,
            dry_run: true,
        }
    }

    #[test]
    fn dry_run_session_passes_strict_handshake() {
        let mut conn = open_session(&dry_run_args()).unwrap();
        assert_eq!(conn.session().unwrap().version(), "dry-run");
        assert_eq!(conn.session().unwrap().voices(), 14);
        assert_eq!(conn.port, DRY_RUN_PORT);
    }

    #[test]
    fn finish_reports_only_command_frames() {
        let mut conn = open_session(&dry_run_args()).unwrap();
        conn.session().unwrap().play(1).unwrap();

        let frames = conn.finish().unwrap();

        assert_eq!(frames, vec!["f0aa080301010055".to_string()]);
    }

    #[test]
    fn dropped_after_failed_command_writes_nothing() {
        let mut conn = open_session(&dry_run_args()).unwrap();
        let recorder = conn.recorder.clone().unwrap();

        assert!(conn.session().unwrap().play(1000).is_err());
        drop(conn);

        assert!(recorder.writes().is_empty());
        assert!(recorder.is_closed());
    }

    #[test]
    fn dropped_after_timeout_writes_only_the_query() {
        let mut conn = open_session(&dry_run_args()).unwrap();
        let recorder = conn.recorder.clone().unwrap();

        let err = conn.session().unwrap().playing().unwrap_err();
        assert!(err.is_timeout());
        drop(conn);

        assert_eq!(recorder.writes(), vec![vec![0xF0, 0xAA, 0x05, 0x07, 0x55]]);
    }

    #[test]
    fn missing_port_is_usage_error() {
        let args = LinkArgs {
            dry_run: false,
            ..dry_run_args()
        };
        let err = open_link(&args, Simulated::Player).err().unwrap();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn bootloader_simulator_acknowledges() {
        let mut raw = open_link(&dry_run_args(), Simulated::Bootloader).unwrap();
        let info = bootloader::probe(&mut raw.link, &Default::default()).unwrap();
        assert!(info.raw.is_empty());
        assert_eq!(recorded(raw.recorder.as_ref()).len(), 2);
    }
}
