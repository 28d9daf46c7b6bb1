//! Serial control of RobertSonics WAV Trigger audio players.
//!
//! A WAV Trigger plays numbered WAV files from a microSD card, mixing up to
//! 14 voices. It is driven over a 57600 baud serial line with small binary
//! frames; this crate speaks that protocol.
//!
//! # Crate Structure
//!
//! - [`transport`]: blocking serial link abstraction, real ports and an in-memory link
//! - [`frame`]: command catalog, frame encoding and response validation
//! - [`device`]: the `WavTrigger` session (behind the `device` feature)

/// Re-export transport types.
pub mod transport {
    pub use wavtrig_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wavtrig_frame::*;
}

/// Re-export device session types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use wavtrig_device::*;
}

#[cfg(feature = "device")]
pub use wavtrig_device::{connect, connect_with_config, DeviceError, WavTrigger};
