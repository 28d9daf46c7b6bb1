//! The fixed command set a WAV Trigger understands.
//!
//! Every command is a read-only [`Template`]: a prototype frame plus the
//! byte offsets where parameters go. Frames are produced by
//! [`encode`](crate::codec::encode), which copies the prototype into a fresh
//! buffer. Templates themselves are never written to.

use std::fmt;

/// First two bytes of every frame.
pub const START: [u8; 2] = [0xF0, 0xAA];

/// Last byte of every frame.
pub const END: u8 = 0x55;

/// Start markers, length byte and opcode.
pub const HEADER_SIZE: usize = 4;

/// Opcode/size pair of a fixed-length response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub opcode: u8,
    pub len: usize,
}

/// Reply to `GET_VERSION`: 20 bytes of firmware version text.
pub const VERSION_RESPONSE: Response = Response {
    opcode: 0x81,
    len: 25,
};

/// Reply to `GET_SYS_INFO`: voice count (u8) and track count (i16).
pub const SYS_INFO_RESPONSE: Response = Response {
    opcode: 0x82,
    len: 8,
};

/// Opcode of the variable-length reply to `GET_STATUS`.
pub const STATUS_OPCODE: u8 = 0x83;

/// Command kinds, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    GetVersion,
    GetSysInfo,
    GetStatus,
    TrackSolo,
    TrackPlay,
    TrackPause,
    TrackResume,
    TrackStop,
    TrackLoopOn,
    TrackLoopOff,
    TrackLoad,
    StopAll,
    ResumeAll,
    MasterVolume,
    TrackVolume,
    Fade,
    SamplerateOffset,
    AmpPower,
}

impl Command {
    /// Every command, in catalog order.
    pub const ALL: [Command; 18] = [
        Command::GetVersion,
        Command::GetSysInfo,
        Command::GetStatus,
        Command::TrackSolo,
        Command::TrackPlay,
        Command::TrackPause,
        Command::TrackResume,
        Command::TrackStop,
        Command::TrackLoopOn,
        Command::TrackLoopOff,
        Command::TrackLoad,
        Command::StopAll,
        Command::ResumeAll,
        Command::MasterVolume,
        Command::TrackVolume,
        Command::Fade,
        Command::SamplerateOffset,
        Command::AmpPower,
    ];

    /// The immutable template for this command.
    pub fn template(self) -> &'static Template {
        &CATALOG[self as usize]
    }

    /// Protocol name, e.g. `TRACK_PLAY`.
    pub fn name(self) -> &'static str {
        self.template().name
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte offsets of the parameters a template accepts.
///
/// `None` means the command has no such parameter. Offsets name the low
/// byte of a little-endian i16, except `flag` which is a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slots {
    pub track: Option<usize>,
    pub gain: Option<usize>,
    pub time: Option<usize>,
    pub offset: Option<usize>,
    pub flag: Option<usize>,
}

impl Slots {
    const NONE: Slots = Slots {
        track: None,
        gain: None,
        time: None,
        offset: None,
        flag: None,
    };

    const TRACK: Slots = Slots {
        track: Some(5),
        ..Slots::NONE
    };
}

/// A prototype frame.
#[derive(Debug, PartialEq, Eq)]
pub struct Template {
    pub command: Command,
    pub name: &'static str,
    pub opcode: u8,
    pub bytes: &'static [u8],
    pub slots: Slots,
}

impl Template {
    /// Total frame length on the wire.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Templates always carry at least header and terminator.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

const fn track_template(command: Command, name: &'static str, bytes: &'static [u8]) -> Template {
    Template {
        command,
        name,
        opcode: 0x03,
        bytes,
        slots: Slots::TRACK,
    }
}

const fn bare_template(
    command: Command,
    name: &'static str,
    opcode: u8,
    bytes: &'static [u8],
) -> Template {
    Template {
        command,
        name,
        opcode,
        bytes,
        slots: Slots::NONE,
    }
}

/// Indexed by `Command as usize`.
static CATALOG: [Template; 18] = [
    bare_template(
        Command::GetVersion,
        "GET_VERSION",
        0x01,
        &[0xF0, 0xAA, 0x05, 0x01, 0x55],
    ),
    bare_template(
        Command::GetSysInfo,
        "GET_SYS_INFO",
        0x02,
        &[0xF0, 0xAA, 0x05, 0x02, 0x55],
    ),
    bare_template(
        Command::GetStatus,
        "GET_STATUS",
        0x07,
        &[0xF0, 0xAA, 0x05, 0x07, 0x55],
    ),
    track_template(
        Command::TrackSolo,
        "TRACK_SOLO",
        &[0xF0, 0xAA, 0x08, 0x03, 0x00, 0x00, 0x00, 0x55],
    ),
    track_template(
        Command::TrackPlay,
        "TRACK_PLAY",
        &[0xF0, 0xAA, 0x08, 0x03, 0x01, 0x00, 0x00, 0x55],
    ),
    track_template(
        Command::TrackPause,
        "TRACK_PAUSE",
        &[0xF0, 0xAA, 0x08, 0x03, 0x02, 0x00, 0x00, 0x55],
    ),
    track_template(
        Command::TrackResume,
        "TRACK_RESUME",
        &[0xF0, 0xAA, 0x08, 0x03, 0x03, 0x00, 0x00, 0x55],
    ),
    track_template(
        Command::TrackStop,
        "TRACK_STOP",
        &[0xF0, 0xAA, 0x08, 0x03, 0x04, 0x00, 0x00, 0x55],
    ),
    track_template(
        Command::TrackLoopOn,
        "TRACK_LOOP_ON",
        &[0xF0, 0xAA, 0x08, 0x03, 0x05, 0x00, 0x00, 0x55],
    ),
    track_template(
        Command::TrackLoopOff,
        "TRACK_LOOP_OFF",
        &[0xF0, 0xAA, 0x08, 0x03, 0x06, 0x00, 0x00, 0x55],
    ),
    track_template(
        Command::TrackLoad,
        "TRACK_LOAD",
        &[0xF0, 0xAA, 0x08, 0x03, 0x07, 0x00, 0x00, 0x55],
    ),
    bare_template(
        Command::StopAll,
        "STOP_ALL",
        0x04,
        &[0xF0, 0xAA, 0x05, 0x04, 0x55],
    ),
    bare_template(
        Command::ResumeAll,
        "RESUME_ALL",
        0x0B,
        &[0xF0, 0xAA, 0x05, 0x0B, 0x55],
    ),
    Template {
        command: Command::MasterVolume,
        name: "MASTER_VOLUME",
        opcode: 0x05,
        bytes: &[0xF0, 0xAA, 0x07, 0x05, 0x00, 0x00, 0x55],
        slots: Slots {
            gain: Some(4),
            ..Slots::NONE
        },
    },
    Template {
        command: Command::TrackVolume,
        name: "TRACK_VOLUME",
        opcode: 0x08,
        bytes: &[0xF0, 0xAA, 0x09, 0x08, 0x00, 0x00, 0x00, 0x00, 0x55],
        slots: Slots {
            track: Some(4),
            gain: Some(6),
            ..Slots::NONE
        },
    },
    Template {
        command: Command::Fade,
        name: "FADE",
        opcode: 0x0A,
        bytes: &[
            0xF0, 0xAA, 0x0C, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x55,
        ],
        slots: Slots {
            track: Some(4),
            gain: Some(6),
            time: Some(8),
            flag: Some(10),
            ..Slots::NONE
        },
    },
    Template {
        command: Command::SamplerateOffset,
        name: "SAMPLERATE_OFFSET",
        opcode: 0x0C,
        bytes: &[0xF0, 0xAA, 0x07, 0x0C, 0x00, 0x00, 0x55],
        slots: Slots {
            offset: Some(4),
            ..Slots::NONE
        },
    },
    Template {
        command: Command::AmpPower,
        name: "AMP_POWER",
        opcode: 0x09,
        bytes: &[0xF0, 0xAA, 0x06, 0x09, 0x00, 0x55],
        slots: Slots {
            flag: Some(4),
            ..Slots::NONE
        },
    },
];
