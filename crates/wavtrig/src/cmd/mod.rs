use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use wavtrig_frame::{Command as Frame, TRACK_RANGE};
use wavtrig_transport::DEFAULT_BAUD_RATE;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bootloader;
pub mod control;
pub mod info;
pub mod link;
pub mod status;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read firmware version, voice count and track count.
    Info,
    /// Play a track, mixed with anything already playing.
    Play(TrackArgs),
    /// Play a track and stop everything else.
    Solo(TrackArgs),
    /// Stop a track.
    Stop(TrackArgs),
    /// Pause a track.
    Pause(TrackArgs),
    /// Resume a paused track.
    Resume(TrackArgs),
    /// Load a track paused, for a later resume-all.
    Load(TrackArgs),
    /// Turn looping on (or off with --off) for a track.
    Loop(LoopArgs),
    /// Stop every track.
    StopAll,
    /// Resume every paused or loaded track at once.
    ResumeAll,
    /// Set master or track volume (0-100).
    Volume(VolumeArgs),
    /// Set master or track gain in dB (-70 to 10).
    Gain(GainArgs),
    /// Fade a track to a volume and keep it playing.
    Fade(FadeArgs),
    /// Fade a track to silence and stop it.
    FadeOut(FadeOutArgs),
    /// Shift the sample rate of all tracks.
    Pitch(PitchArgs),
    /// Switch the on-board amplifier.
    Amp(AmpArgs),
    /// Show which tracks are playing.
    Status(StatusArgs),
    /// Probe the serial bootloader (board must be in boot mode).
    Bootloader,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info => info::run(link, format),
        Command::Play(a) => {
            let track = track_number(a.track)?;
            control::run(link, format, Frame::TrackPlay, |wt| wt.play(track))
        }
        Command::Solo(a) => {
            let track = track_number(a.track)?;
            control::run(link, format, Frame::TrackSolo, |wt| wt.solo(track))
        }
        Command::Stop(a) => {
            let track = track_number(a.track)?;
            control::run(link, format, Frame::TrackStop, |wt| wt.stop(track))
        }
        Command::Pause(a) => {
            let track = track_number(a.track)?;
            control::run(link, format, Frame::TrackPause, |wt| wt.pause(track))
        }
        Command::Resume(a) => {
            let track = track_number(a.track)?;
            control::run(link, format, Frame::TrackResume, |wt| wt.resume(track))
        }
        Command::Load(a) => {
            let track = track_number(a.track)?;
            control::run(link, format, Frame::TrackLoad, |wt| wt.load(track))
        }
        Command::Loop(a) => {
            let track = track_number(a.track)?;
            let frame = if a.off {
                Frame::TrackLoopOff
            } else {
                Frame::TrackLoopOn
            };
            control::run(link, format, frame, |wt| wt.set_loop(track, !a.off))
        }
        Command::StopAll => control::run(link, format, Frame::StopAll, |wt| wt.stop_all()),
        Command::ResumeAll => control::run(link, format, Frame::ResumeAll, |wt| wt.resume_all()),
        Command::Volume(a) => match a.track.map(track_number).transpose()? {
            Some(track) => control::run(link, format, Frame::TrackVolume, |wt| {
                wt.track_volume(track, a.volume)
            }),
            None => control::run(link, format, Frame::MasterVolume, |wt| {
                wt.master_volume(a.volume)
            }),
        },
        Command::Gain(a) => match a.track.map(track_number).transpose()? {
            Some(track) => control::run(link, format, Frame::TrackVolume, |wt| {
                wt.track_gain(track, a.gain)
            }),
            None => control::run(link, format, Frame::MasterVolume, |wt| {
                wt.master_gain(a.gain)
            }),
        },
        Command::Fade(a) => {
            let track = track_number(a.track)?;
            control::run(link, format, Frame::Fade, |wt| {
                wt.fade(track, a.volume, a.time_ms)
            })
        }
        Command::FadeOut(a) => {
            let track = track_number(a.track)?;
            control::run(link, format, Frame::Fade, |wt| wt.fade_out(track, a.time_ms))
        }
        Command::Pitch(a) => control::run(link, format, Frame::SamplerateOffset, |wt| {
            wt.pitch(a.offset)
        }),
        Command::Amp(a) => control::run(link, format, Frame::AmpPower, |wt| {
            wt.amp_power(a.state == AmpState::On)
        }),
        Command::Status(args) => status::run(link, args, format),
        Command::Bootloader => bootloader::run(link, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the board. Shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial device (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, short = 'p', env = "WAVTRIG_PORT", global = true)]
    pub port: Option<String>,

    /// Baud rate; must match the board's init file.
    #[arg(long, env = "WAVTRIG_BAUD", default_value_t = DEFAULT_BAUD_RATE, global = true)]
    pub baud: u32,

    /// Deadline for device replies (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub timeout: String,

    /// Fail when version or system info cannot be read.
    #[arg(long, global = true)]
    pub strict_handshake: bool,

    /// Print the frames that would be written instead of opening a port.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct TrackArgs {
    /// Track number (1-999).
    pub track: i32,
}

#[derive(Args, Debug)]
pub struct LoopArgs {
    /// Track number (1-999).
    pub track: i32,
    /// Turn looping off instead of on.
    #[arg(long)]
    pub off: bool,
}

#[derive(Args, Debug)]
pub struct VolumeArgs {
    /// Volume, 0 (silent) to 100 (+10 dB).
    pub volume: u8,
    /// Apply to one track instead of the master output.
    #[arg(long)]
    pub track: Option<i32>,
}

#[derive(Args, Debug)]
pub struct GainArgs {
    /// Gain in dB (-70 to 10).
    #[arg(allow_negative_numbers = true)]
    pub gain: i16,
    /// Apply to one track instead of the master output.
    #[arg(long)]
    pub track: Option<i32>,
}

#[derive(Args, Debug)]
pub struct FadeArgs {
    /// Track number (1-999).
    pub track: i32,
    /// Target volume (0-100).
    pub volume: u8,
    /// Fade duration in milliseconds (0-32767).
    #[arg(long = "time", value_name = "MS", default_value_t = 1000)]
    pub time_ms: u16,
}

#[derive(Args, Debug)]
pub struct FadeOutArgs {
    /// Track number (1-999).
    pub track: i32,
    /// Fade duration in milliseconds (0-32767).
    #[arg(long = "time", value_name = "MS", default_value_t = 1000)]
    pub time_ms: u16,
}

#[derive(Args, Debug)]
pub struct PitchArgs {
    /// Sample-rate offset; clamped to -32767..=32767.
    #[arg(allow_negative_numbers = true)]
    pub offset: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AmpState {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct AmpArgs {
    pub state: AmpState,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Poll repeatedly at this interval (e.g. 1s, 500ms) until Ctrl-C.
    #[arg(long, value_name = "INTERVAL")]
    pub watch: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Narrow a track argument to the wire width. Values that cannot be a track
/// at all get the same usage error the session gives for 1000.
fn track_number(value: i32) -> CliResult<i16> {
    i16::try_from(value).map_err(|_| {
        CliError::new(
            USAGE,
            format!(
                "track {value} out of range ({}..={})",
                TRACK_RANGE.start(),
                TRACK_RANGE.end()
            ),
        )
    })
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
