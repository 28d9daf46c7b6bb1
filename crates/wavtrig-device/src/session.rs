use tracing::{debug, info, warn};
use wavtrig_frame::{
    clamp_pitch, volume_to_gain, Command, FrameConfig, FrameError, FramedLink, Params,
    FADE_TO_LEVEL, FADE_TO_STOP,
};
use wavtrig_transport::SerialLink;

use crate::error::{DeviceError, Result};
use crate::handshake::{handshake, DeviceInfo, HandshakePolicy};

/// Session-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Read deadlines for fixed-size and status replies.
    pub frame: FrameConfig,
    /// Behavior when the connect-time queries fail.
    pub handshake: HandshakePolicy,
}

/// An open session with a WAV Trigger.
///
/// Created by [`connect`](crate::connect) or [`WavTrigger::with_link`], which
/// run the version/system-info handshake. Commands are fire-and-forget; only
/// [`playing`](Self::playing) reads a reply after the handshake.
///
/// A session is either open or closed. It closes on [`close`](Self::close),
/// on drop, or when the link fails; every later operation returns
/// [`DeviceError::TransportClosed`].
pub struct WavTrigger<L: SerialLink> {
    link: Option<FramedLink<L>>,
    info: DeviceInfo,
    config: SessionConfig,
}

impl<L: SerialLink> WavTrigger<L> {
    /// Take ownership of an already-open link and run the handshake.
    ///
    /// On a handshake error the link is closed before returning.
    pub fn with_link(link: L, config: SessionConfig) -> Result<Self> {
        let mut framed = FramedLink::with_config(link, config.frame.clone());
        let info = match handshake(&mut framed, config.handshake) {
            Ok(info) => info,
            Err(err) => {
                if let Err(close_err) = framed.get_mut().close() {
                    warn!(error = %close_err, "failed to release link after handshake error");
                }
                return Err(err);
            }
        };

        info!(
            link = framed.get_ref().name(),
            version = %info.version,
            voices = info.voices,
            tracks = info.tracks,
            "wav trigger session open"
        );

        Ok(Self {
            link: Some(framed),
            info,
            config,
        })
    }

    /// Start a track, mixing it with whatever else is playing.
    pub fn play(&mut self, track: i16) -> Result<()> {
        self.command(Command::TrackPlay, Params::new().track(track))
    }

    /// Start a track and stop everything else.
    pub fn solo(&mut self, track: i16) -> Result<()> {
        self.command(Command::TrackSolo, Params::new().track(track))
    }

    pub fn stop(&mut self, track: i16) -> Result<()> {
        self.command(Command::TrackStop, Params::new().track(track))
    }

    pub fn pause(&mut self, track: i16) -> Result<()> {
        self.command(Command::TrackPause, Params::new().track(track))
    }

    pub fn resume(&mut self, track: i16) -> Result<()> {
        self.command(Command::TrackResume, Params::new().track(track))
    }

    /// Load a track paused, ready for a synchronized [`resume_all`](Self::resume_all).
    pub fn load(&mut self, track: i16) -> Result<()> {
        self.command(Command::TrackLoad, Params::new().track(track))
    }

    /// Turn looping on or off for a track.
    pub fn set_loop(&mut self, track: i16, enabled: bool) -> Result<()> {
        let command = if enabled {
            Command::TrackLoopOn
        } else {
            Command::TrackLoopOff
        };
        self.command(command, Params::new().track(track))
    }

    pub fn stop_all(&mut self) -> Result<()> {
        self.command(Command::StopAll, Params::new())
    }

    /// Resume every paused or loaded track at once.
    pub fn resume_all(&mut self) -> Result<()> {
        self.command(Command::ResumeAll, Params::new())
    }

    /// Master volume on a 0..=100 scale.
    pub fn master_volume(&mut self, volume: u8) -> Result<()> {
        let gain = volume_to_gain(volume)?;
        self.master_gain(gain)
    }

    /// Per-track volume on a 0..=100 scale.
    pub fn track_volume(&mut self, track: i16, volume: u8) -> Result<()> {
        let gain = volume_to_gain(volume)?;
        self.track_gain(track, gain)
    }

    /// Master gain in dB, -70..=10.
    pub fn master_gain(&mut self, gain: i16) -> Result<()> {
        self.command(Command::MasterVolume, Params::new().gain(gain))
    }

    /// Per-track gain in dB, -70..=10.
    pub fn track_gain(&mut self, track: i16, gain: i16) -> Result<()> {
        self.command(Command::TrackVolume, Params::new().track(track).gain(gain))
    }

    /// Shift the playback sample rate of every track. Out-of-range offsets
    /// are clamped to +/-32767.
    pub fn pitch(&mut self, offset: i32) -> Result<()> {
        self.command(
            Command::SamplerateOffset,
            Params::new().offset(clamp_pitch(offset)),
        )
    }

    /// Fade a track to `volume` (0..=100) over `time_ms`, leaving it playing.
    pub fn fade(&mut self, track: i16, volume: u8, time_ms: u16) -> Result<()> {
        let gain = volume_to_gain(volume)?;
        self.command(
            Command::Fade,
            Params::new()
                .track(track)
                .gain(gain)
                .time_ms(time_ms)
                .flag(FADE_TO_LEVEL),
        )
    }

    /// Fade a track to silence over `time_ms`, then stop it.
    pub fn fade_out(&mut self, track: i16, time_ms: u16) -> Result<()> {
        let gain = volume_to_gain(0)?;
        self.command(
            Command::Fade,
            Params::new()
                .track(track)
                .gain(gain)
                .time_ms(time_ms)
                .flag(FADE_TO_STOP),
        )
    }

    /// Switch the on-board amplifier.
    pub fn amp_power(&mut self, on: bool) -> Result<()> {
        self.command(Command::AmpPower, Params::new().flag(u8::from(on)))
    }

    /// Tracks currently playing.
    ///
    /// Returns `Ok(Some(tracks))` for a valid reply (empty when idle) and
    /// `Ok(None)` when the reply was malformed; pending input is discarded in
    /// that case so the next query starts clean. No reply at all is a timeout
    /// error.
    pub fn playing(&mut self) -> Result<Option<Vec<i16>>> {
        let result = self.exchange(|link| {
            link.send(Command::GetStatus, &Params::new())?;
            link.read_status()
        });

        match result {
            Ok(tracks) => Ok(Some(tracks)),
            Err(DeviceError::Frame(FrameError::Malformed(err))) => {
                debug!(error = %err, "status reply dropped");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Send STOP_ALL and release the link.
    ///
    /// Closing is idempotent: a closed session returns `Ok(())` without I/O.
    /// The link is released even when STOP_ALL cannot be written; the first
    /// error encountered is returned.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut link) = self.link.take() else {
            return Ok(());
        };

        let stopped = link.send(Command::StopAll, &Params::new());
        if let Err(err) = &stopped {
            warn!(error = %err, "failed to stop playback while closing");
        }
        let released = link.get_mut().close();
        info!(link = link.get_ref().name(), "wav trigger session closed");

        stopped?;
        released?;
        Ok(())
    }

    /// End the session without STOP_ALL and hand back the link.
    ///
    /// Playback continues on the board. Used by one-shot tools that must not
    /// silence the tracks they just started.
    pub fn detach(mut self) -> Result<L> {
        let link = self.link.take().ok_or(DeviceError::TransportClosed)?;
        debug!(link = link.get_ref().name(), "wav trigger session detached");
        Ok(link.into_inner())
    }

    /// Whether the session still owns an open link.
    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Identification captured at connect time.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Firmware version text; empty if the query failed.
    pub fn version(&self) -> &str {
        &self.info.version
    }

    pub fn voices(&self) -> u8 {
        self.info.voices
    }

    pub fn tracks(&self) -> i16 {
        self.info.tracks
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn command(&mut self, command: Command, params: Params) -> Result<()> {
        self.exchange(|link| link.send(command, &params))
    }

    /// Run one exchange on the open link, closing the session if the link fails.
    fn exchange<T>(
        &mut self,
        op: impl FnOnce(&mut FramedLink<L>) -> wavtrig_frame::Result<T>,
    ) -> Result<T> {
        let link = self.link.as_mut().ok_or(DeviceError::TransportClosed)?;
        match op(link) {
            Ok(value) => Ok(value),
            Err(err) if err.is_fatal() => {
                warn!(error = %err, "link failed, closing session");
                if let Some(mut link) = self.link.take() {
                    if let Err(close_err) = link.get_mut().close() {
                        warn!(error = %close_err, "failed to release link after link failure");
                    }
                }
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl<L: SerialLink> Drop for WavTrigger<L> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "close on drop failed");
        }
    }
}

impl<L: SerialLink> std::fmt::Debug for WavTrigger<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavTrigger")
            .field("open", &self.is_open())
            .field("info", &self.info)
            .field("config", &self.config)
            .finish()
    }
}
