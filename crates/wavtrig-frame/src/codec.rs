use std::ops::RangeInclusive;

use bytes::{Bytes, BytesMut};

use crate::catalog::{Command, END, HEADER_SIZE, START, STATUS_OPCODE};
use crate::error::{FrameError, ProtocolError, Result};

/// Valid track numbers.
pub const TRACK_RANGE: RangeInclusive<i16> = 1..=999;

/// Valid gain values in dB.
pub const GAIN_RANGE: RangeInclusive<i16> = -70..=10;

/// Valid user-facing volume values.
pub const VOLUME_RANGE: RangeInclusive<u8> = 0..=100;

/// Valid fade durations in milliseconds (signed 16-bit on the wire).
pub const FADE_TIME_RANGE: RangeInclusive<u16> = 0..=i16::MAX as u16;

/// Sample-rate offsets the device accepts.
pub const PITCH_RANGE: RangeInclusive<i16> = -32767..=32767;

/// Fade flag: fade to the target level and keep playing.
pub const FADE_TO_LEVEL: u8 = 0x00;

/// Fade flag: fade to silence, then stop the track.
pub const FADE_TO_STOP: u8 = 0x01;

/// Parameter values for a command's slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Params {
    pub track: Option<i16>,
    pub gain: Option<i16>,
    pub time_ms: Option<u16>,
    pub offset: Option<i16>,
    pub flag: Option<u8>,
}

impl Params {
    /// No parameters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(mut self, track: i16) -> Self {
        self.track = Some(track);
        self
    }

    pub fn gain(mut self, gain: i16) -> Self {
        self.gain = Some(gain);
        self
    }

    pub fn time_ms(mut self, time_ms: u16) -> Self {
        self.time_ms = Some(time_ms);
        self
    }

    pub fn offset(mut self, offset: i16) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn flag(mut self, flag: u8) -> Self {
        self.flag = Some(flag);
        self
    }
}

/// Encode a command into a new frame.
///
/// The command's template is copied and each parameter is written into its
/// slot as a little-endian i16 (the flag as a single byte). Ranges are
/// checked before anything is written, so an error never yields a partial
/// frame.
///
/// ```text
/// ┌──────┬──────┬────────┬────────┬──────────────────┬──────┐
/// │ 0xF0 │ 0xAA │ Length │ Opcode │ Payload slots    │ 0x55 │
/// │      │      │ (u8)   │ (u8)   │ (i16 LE / u8)    │      │
/// └──────┴──────┴────────┴────────┴──────────────────┴──────┘
/// ```
pub fn encode(command: Command, params: &Params) -> Result<Bytes> {
    let template = command.template();
    let slots = template.slots;

    let track = slot_value(command, "track", slots.track, params.track)?
        .map(|(at, track)| check_range("track", track, &TRACK_RANGE).map(|v| (at, v)))
        .transpose()?;
    let gain = slot_value(command, "gain", slots.gain, params.gain)?
        .map(|(at, gain)| check_range("gain", gain, &GAIN_RANGE).map(|v| (at, v)))
        .transpose()?;
    let time = slot_value(command, "time", slots.time, params.time_ms)?
        .map(|(at, time)| {
            check_range("fade time", time, &FADE_TIME_RANGE).map(|v| (at, v as i16))
        })
        .transpose()?;
    let offset = slot_value(command, "offset", slots.offset, params.offset)?
        .map(|(at, offset)| check_range("pitch offset", offset, &PITCH_RANGE).map(|v| (at, v)))
        .transpose()?;
    let flag = slot_value(command, "flag", slots.flag, params.flag)?;

    let mut frame = BytesMut::from(template.bytes);
    for (at, value) in [track, gain, time, offset].into_iter().flatten() {
        frame[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }
    if let Some((at, flag)) = flag {
        frame[at] = flag;
    }

    Ok(frame.freeze())
}

fn slot_value<T>(
    command: Command,
    name: &'static str,
    slot: Option<usize>,
    value: Option<T>,
) -> Result<Option<(usize, T)>> {
    match (slot, value) {
        (Some(at), Some(value)) => Ok(Some((at, value))),
        (Some(_), None) => Err(FrameError::MissingParameter {
            command: command.name(),
            name,
        }),
        (None, Some(_)) => Err(FrameError::UnexpectedParameter {
            command: command.name(),
            name,
        }),
        (None, None) => Ok(None),
    }
}

fn check_range<T>(name: &'static str, value: T, range: &RangeInclusive<T>) -> Result<T>
where
    T: PartialOrd + Copy + Into<i64>,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(FrameError::out_of_range(
            name,
            value,
            (*range.start()).into()..=(*range.end()).into(),
        ))
    }
}

/// Validate a fixed-size response frame and return its payload.
///
/// The payload is everything between the opcode and the terminator.
pub fn decode_fixed(bytes: &[u8], expected_len: usize, expected_opcode: u8) -> Result<&[u8]> {
    if bytes.len() != expected_len || bytes.len() <= HEADER_SIZE {
        return Err(ProtocolError::LengthMismatch {
            declared: expected_len,
            actual: bytes.len(),
        }
        .into());
    }

    check_header(bytes, expected_opcode)?;

    if bytes[2] as usize != expected_len {
        return Err(ProtocolError::LengthMismatch {
            declared: bytes[2] as usize,
            actual: expected_len,
        }
        .into());
    }

    let last = bytes[bytes.len() - 1];
    if last != END {
        return Err(ProtocolError::MissingTerminator { found: last }.into());
    }

    Ok(&bytes[HEADER_SIZE..bytes.len() - 1])
}

/// Total size of a status frame, from its 4-byte header.
///
/// The firmware counts the whole frame in the length byte, which leaves an
/// odd remainder after the header (payload pairs plus terminator). An even
/// remainder means the terminator was not counted and follows the payload.
pub fn status_frame_len(header: &[u8]) -> Result<usize> {
    if header.len() < HEADER_SIZE {
        return Err(ProtocolError::LengthMismatch {
            declared: HEADER_SIZE,
            actual: header.len(),
        }
        .into());
    }

    check_header(header, STATUS_OPCODE)?;

    let declared = header[2] as usize;
    if declared < HEADER_SIZE {
        return Err(ProtocolError::LengthMismatch {
            declared,
            actual: HEADER_SIZE,
        }
        .into());
    }

    let remainder = declared - HEADER_SIZE;
    if remainder % 2 == 1 {
        Ok(declared)
    } else {
        Ok(declared + 1)
    }
}

/// Parse a complete status frame into the list of playing tracks.
///
/// An empty payload means no track is playing.
pub fn decode_variable_status(bytes: &[u8]) -> Result<Vec<i16>> {
    let total = status_frame_len(bytes)?;
    if bytes.len() != total {
        return Err(ProtocolError::LengthMismatch {
            declared: total,
            actual: bytes.len(),
        }
        .into());
    }

    let last = bytes[total - 1];
    if last != END {
        return Err(ProtocolError::MissingTerminator { found: last }.into());
    }

    Ok(bytes[HEADER_SIZE..total - 1]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Firmware version text from a version payload, trimmed of padding.
pub fn decode_version(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Voice count and track count from a sys-info payload.
pub fn decode_sys_info(payload: &[u8]) -> Result<(u8, i16)> {
    match payload {
        [voices, lo, hi] => Ok((*voices, i16::from_le_bytes([*lo, *hi]))),
        _ => Err(ProtocolError::LengthMismatch {
            declared: 3,
            actual: payload.len(),
        }
        .into()),
    }
}

/// Map a 0..=100 volume linearly onto the -70..=+10 dB gain range.
pub fn volume_to_gain(volume: u8) -> Result<i16> {
    let volume = check_range("volume", volume, &VOLUME_RANGE)?;
    let span = GAIN_RANGE.end() - GAIN_RANGE.start();
    Ok(GAIN_RANGE.start() + (volume as i16 * span) / *VOLUME_RANGE.end() as i16)
}

/// Clamp a sample-rate offset into the range the device accepts.
pub fn clamp_pitch(offset: i32) -> i16 {
    offset.clamp(*PITCH_RANGE.start() as i32, *PITCH_RANGE.end() as i32) as i16
}

/// Lowercase hex rendering of a frame, for logs and dry-run output.
pub fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn check_header(bytes: &[u8], expected_opcode: u8) -> Result<()> {
    if bytes[0..2] != START {
        return Err(ProtocolError::BadMarkers {
            found: [bytes[0], bytes[1]],
        }
        .into());
    }
    if bytes[3] != expected_opcode {
        return Err(ProtocolError::UnexpectedOpcode {
            expected: expected_opcode,
            found: bytes[3],
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::catalog::{SYS_INFO_RESPONSE, VERSION_RESPONSE};

    #[test]
    fn track_play_frame_for_every_valid_track() {
        for track in TRACK_RANGE {
            let frame = encode(Command::TrackPlay, &Params::new().track(track)).unwrap();
            let [lo, hi] = track.to_le_bytes();
            assert_eq!(
                frame.as_ref(),
                &[0xF0, 0xAA, 0x08, 0x03, 0x01, lo, hi, 0x55]
            );
            assert_eq!(i16::from_le_bytes([frame[5], frame[6]]), track);
        }
    }

    #[test]
    fn master_volume_carries_gain() {
        for gain in GAIN_RANGE {
            let frame = encode(Command::MasterVolume, &Params::new().gain(gain)).unwrap();
            assert_eq!(frame.len(), 7);
            assert_eq!(i16::from_le_bytes([frame[4], frame[5]]), gain);
        }
    }

    #[test]
    fn negative_gain_is_twos_complement() {
        let frame = encode(Command::MasterVolume, &Params::new().gain(-70)).unwrap();
        assert_eq!(frame.as_ref(), &[0xF0, 0xAA, 0x07, 0x05, 0xBA, 0xFF, 0x55]);
    }

    #[test]
    fn fade_frame_layout() {
        let params = Params::new()
            .track(300)
            .gain(-20)
            .time_ms(2000)
            .flag(FADE_TO_STOP);
        let frame = encode(Command::Fade, &params).unwrap();

        let mut expected = BytesMut::new();
        expected.put_slice(&[0xF0, 0xAA, 0x0C, 0x0A]);
        expected.put_i16_le(300);
        expected.put_i16_le(-20);
        expected.put_i16_le(2000);
        expected.put_u8(0x01);
        expected.put_u8(0x55);
        assert_eq!(frame.as_ref(), expected.as_ref());
    }

    #[test]
    fn track_volume_frame_layout() {
        let frame = encode(Command::TrackVolume, &Params::new().track(12).gain(5)).unwrap();
        assert_eq!(
            frame.as_ref(),
            &[0xF0, 0xAA, 0x09, 0x08, 0x0C, 0x00, 0x05, 0x00, 0x55]
        );
    }

    #[test]
    fn encode_never_touches_template() {
        let before = Command::TrackStop.template().bytes.to_vec();
        let _ = encode(Command::TrackStop, &Params::new().track(999)).unwrap();
        let second = encode(Command::TrackStop, &Params::new().track(1)).unwrap();

        assert_eq!(Command::TrackStop.template().bytes, before.as_slice());
        assert_eq!(second[5], 0x01);
        assert_eq!(second[6], 0x00);
    }

    #[test]
    fn out_of_range_track_rejected() {
        for track in [0, -1, 1000, i16::MAX] {
            let err = encode(Command::TrackPlay, &Params::new().track(track)).unwrap_err();
            assert!(matches!(
                err,
                FrameError::InvalidArgument { name: "track", .. }
            ));
        }
    }

    #[test]
    fn out_of_range_gain_rejected() {
        for gain in [-71, 11] {
            let err = encode(Command::MasterVolume, &Params::new().gain(gain)).unwrap_err();
            assert!(matches!(err, FrameError::InvalidArgument { name: "gain", .. }));
        }
    }

    #[test]
    fn fade_time_above_i16_rejected() {
        let params = Params::new().track(1).gain(0).time_ms(40_000).flag(0);
        let err = encode(Command::Fade, &params).unwrap_err();
        assert!(matches!(err, FrameError::InvalidArgument { name: "fade time", .. }));
    }

    #[test]
    fn missing_and_unexpected_parameters() {
        let err = encode(Command::TrackPlay, &Params::new()).unwrap_err();
        assert!(matches!(err, FrameError::MissingParameter { name: "track", .. }));

        let err = encode(Command::StopAll, &Params::new().track(1)).unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedParameter { name: "track", .. }));
    }

    #[test]
    fn volume_mapping_is_boundary_exact_and_monotonic() {
        assert_eq!(volume_to_gain(0).unwrap(), -70);
        assert_eq!(volume_to_gain(50).unwrap(), -30);
        assert_eq!(volume_to_gain(100).unwrap(), 10);

        let gains: Vec<i16> = VOLUME_RANGE.map(|v| volume_to_gain(v).unwrap()).collect();
        assert!(gains.windows(2).all(|w| w[0] <= w[1]));
        assert!(gains.iter().all(|g| GAIN_RANGE.contains(g)));
    }

    #[test]
    fn volume_above_100_rejected() {
        let err = volume_to_gain(101).unwrap_err();
        assert!(matches!(err, FrameError::InvalidArgument { name: "volume", .. }));
    }

    #[test]
    fn pitch_is_clamped() {
        assert_eq!(clamp_pitch(100_000), 32767);
        assert_eq!(clamp_pitch(-100_000), -32767);
        assert_eq!(clamp_pitch(-32768), -32767);
        assert_eq!(clamp_pitch(-1200), -1200);
    }

    #[test]
    fn decode_status_with_tracks() {
        let frame = [0xF0, 0xAA, 0x08, 0x83, 0x02, 0x00, 0x05, 0x00, 0x55];
        assert_eq!(decode_variable_status(&frame).unwrap(), vec![2, 5]);
    }

    #[test]
    fn decode_status_header_only() {
        let frame = [0xF0, 0xAA, 0x04, 0x83, 0x55];
        assert_eq!(decode_variable_status(&frame).unwrap(), Vec::<i16>::new());
    }

    #[test]
    fn decode_status_with_terminator_counted() {
        let frame = [0xF0, 0xAA, 0x09, 0x83, 0x02, 0x00, 0x05, 0x00, 0x55];
        assert_eq!(status_frame_len(&frame[..4]).unwrap(), 9);
        assert_eq!(decode_variable_status(&frame).unwrap(), vec![2, 5]);

        let idle = [0xF0, 0xAA, 0x05, 0x83, 0x55];
        assert_eq!(decode_variable_status(&idle).unwrap(), Vec::<i16>::new());
    }

    #[test]
    fn decode_status_rejects_bad_framing() {
        let wrong_opcode = [0xF0, 0xAA, 0x04, 0x81, 0x55];
        assert!(matches!(
            decode_variable_status(&wrong_opcode),
            Err(FrameError::Malformed(ProtocolError::UnexpectedOpcode { .. }))
        ));

        let no_terminator = [0xF0, 0xAA, 0x06, 0x83, 0x02, 0x00, 0x00];
        assert!(matches!(
            decode_variable_status(&no_terminator),
            Err(FrameError::Malformed(ProtocolError::MissingTerminator { .. }))
        ));

        let truncated = [0xF0, 0xAA, 0x08, 0x83, 0x02, 0x00, 0x55];
        assert!(matches!(
            decode_variable_status(&truncated),
            Err(FrameError::Malformed(ProtocolError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn decode_fixed_returns_payload() {
        let frame = [0xF0, 0xAA, 0x08, 0x82, 0x0E, 0x2C, 0x01, 0x55];
        let payload = decode_fixed(&frame, SYS_INFO_RESPONSE.len, SYS_INFO_RESPONSE.opcode).unwrap();
        assert_eq!(payload, &[0x0E, 0x2C, 0x01]);
        assert_eq!(decode_sys_info(payload).unwrap(), (14, 300));
    }

    #[test]
    fn decode_fixed_rejects_bad_markers() {
        let frame = [0xF1, 0xAA, 0x08, 0x82, 0x0E, 0x2C, 0x01, 0x55];
        assert!(matches!(
            decode_fixed(&frame, 8, 0x82),
            Err(FrameError::Malformed(ProtocolError::BadMarkers { .. }))
        ));
    }

    #[test]
    fn decode_fixed_rejects_missing_terminator() {
        let frame = [0xF0, 0xAA, 0x08, 0x82, 0x0E, 0x2C, 0x01, 0x00];
        assert!(matches!(
            decode_fixed(&frame, 8, 0x82),
            Err(FrameError::Malformed(ProtocolError::MissingTerminator { found: 0x00 }))
        ));
    }

    #[test]
    fn decode_fixed_rejects_wrong_opcode_and_length() {
        let frame = [0xF0, 0xAA, 0x08, 0x81, 0x0E, 0x2C, 0x01, 0x55];
        assert!(matches!(
            decode_fixed(&frame, 8, 0x82),
            Err(FrameError::Malformed(ProtocolError::UnexpectedOpcode {
                expected: 0x82,
                found: 0x81
            }))
        ));

        assert!(matches!(
            decode_fixed(&frame[..7], 8, 0x82),
            Err(FrameError::Malformed(ProtocolError::LengthMismatch { .. }))
        ));

        let bad_len_byte = [0xF0, 0xAA, 0x07, 0x82, 0x0E, 0x2C, 0x01, 0x55];
        assert!(matches!(
            decode_fixed(&bad_len_byte, 8, 0x82),
            Err(FrameError::Malformed(ProtocolError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn version_text_is_trimmed() {
        let mut frame = BytesMut::new();
        frame.put_slice(&[0xF0, 0xAA, 0x19, 0x81]);
        let mut text = [0u8; 20];
        text[..8].copy_from_slice(b"WT v1.10");
        frame.put_slice(&text);
        frame.put_u8(0x55);

        let payload = decode_fixed(&frame, VERSION_RESPONSE.len, VERSION_RESPONSE.opcode).unwrap();
        assert_eq!(decode_version(payload), "WT v1.10");
        assert_eq!(decode_version(b"  WT v1.20 \r\n"), "WT v1.20");
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(to_hex(&[0xF0, 0xAA, 0x05, 0x04, 0x55]), "f0aa050455");
        assert_eq!(to_hex(&[]), "");
    }
}
