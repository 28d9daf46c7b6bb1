//! Blocking serial link abstraction.
//!
//! Provides a narrow interface over the byte stream a WAV Trigger is attached to:
//! - blocking write of a complete buffer
//! - blocking read of exactly N bytes with a deadline
//! - discard of pending input
//!
//! This is the lowest layer of wavtrig. Everything else builds on top of
//! the [`SerialLink`] trait provided here.

pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use serialport;

pub use error::{Result, TransportError};
pub use memory::MemoryLink;
pub use serial::{SerialConfig, SerialPortLink, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
pub use traits::SerialLink;
