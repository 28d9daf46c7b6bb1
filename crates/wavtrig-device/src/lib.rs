//! Session management for a serial-attached WAV Trigger.
//!
//! This is the layer applications use. Connect to a board, read its
//! version and track counts, then play, mix and fade tracks by number.
//!
//! ```no_run
//! let mut wt = wavtrig_device::connect("/dev/ttyUSB0")?;
//! wt.master_volume(80)?;
//! wt.play(1)?;
//! if let Some(tracks) = wt.playing()? {
//!     println!("playing: {tracks:?}");
//! }
//! wt.close()?;
//! # Ok::<(), wavtrig_device::DeviceError>(())
//! ```

pub mod bootloader;
pub mod connector;
pub mod error;
pub mod handshake;
pub mod session;

pub use bootloader::{probe, BootloaderConfig, BootloaderInfo};
pub use connector::{connect, connect_with_config};
pub use error::{DeviceError, Result};
pub use handshake::{handshake, read_sys_info, read_version, DeviceInfo, HandshakePolicy};
pub use session::{SessionConfig, WavTrigger};
