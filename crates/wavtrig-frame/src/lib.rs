//! WAV Trigger command catalog and serial frame codec.
//!
//! Every message on the wire is framed as:
//! - 2 start bytes `0xF0 0xAA`
//! - a 1-byte length (the whole frame) and a 1-byte opcode
//! - a fixed payload of little-endian i16 fields and flag bytes
//! - a `0x55` terminator
//!
//! Commands are built from immutable templates; responses are read in
//! exactly-sized chunks and validated before their payload is parsed.

pub mod catalog;
pub mod codec;
pub mod error;
pub mod framed;

pub use catalog::{
    Command, Response, Slots, Template, END, HEADER_SIZE, START, STATUS_OPCODE,
    SYS_INFO_RESPONSE, VERSION_RESPONSE,
};
pub use codec::{
    clamp_pitch, decode_fixed, decode_sys_info, decode_variable_status, decode_version, encode,
    status_frame_len, to_hex, volume_to_gain, Params, FADE_TIME_RANGE, FADE_TO_LEVEL,
    FADE_TO_STOP, GAIN_RANGE, PITCH_RANGE, TRACK_RANGE, VOLUME_RANGE,
};
pub use error::{FrameError, ProtocolError, Result};
pub use framed::{FrameConfig, FramedLink, DEFAULT_STATUS_TIMEOUT};
