//! Driver library for the GPIO register block of Broadcom BCM283x / BCM2711 SoCs (the Raspberry
//! Pi family).
//!
//! The GPIO block is a page of 32-bit hardware registers in physical memory. This driver maps that
//! page for the lifetime of a client *session*, and lets the client pick one pin at a time, set
//! its direction, drive its level, and read its level back.
//!
//! # Register layout
//!
//! *See [`registers`].*
//!
//! Four register families are involved, each a run of 32-bit registers 4 bytes apart:
//!
//! | Family | Offset | Pins per register | Bits per pin |
//! |--------|--------|-------------------|--------------|
//! | Select | 0x00   | 10                | 3            |
//! | Set    | 0x1C   | 32                | 1            |
//! | Clear  | 0x28   | 32                | 1            |
//! | Level  | 0x34   | 32                | 1            |
//!
//! [`registers::locate`] computes the absolute register address and bit position for any pin in
//! any family. Pins are checked against the [`Platform`] before any register is touched; pin
//! numbers out of range are rejected with [`Error::InvalidPin`].
//!
//! # Construction
//!
//! To set up the driver:
//!
//! - Pick a [`Platform`] describing your SoC, e.g. [`Platform::BCM2837`] for a Raspberry Pi 3.
//! - Obtain a [`MemoryMapper`] which can map physical memory into your address space. With the
//!   `devmem` Cargo feature, [`mapper::devmem::DevMem`] maps through `/dev/mem`.
//! - Construct a [`Session`] from the two.
//!
//! ```
//! # fn main() -> Result<(), bcmgpio::Error<core::convert::Infallible>> {
//! # let mapper = bcmgpio::mapper::noop::NoopMapper;
//! let mut session = bcmgpio::Session::new(mapper, bcmgpio::Platform::BCM2837);
//! session.open_session()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Sessions
//!
//! *See [`Session`].*
//!
//! An open session owns the mapped [`RegisterWindow`] and remembers the pin most recently
//! configured. Level writes and reads act on that pin:
//!
//! ```
//! # fn main() -> Result<(), bcmgpio::Error<core::convert::Infallible>> {
//! # let mapper = bcmgpio::mapper::noop::NoopMapper;
//! # let mut session = bcmgpio::Session::open(mapper, bcmgpio::Platform::BCM2837)?;
//! session.configure(4, bcmgpio::Direction::Output)?;
//! session.write_level(bcmgpio::Level::High)?;
//! let level = session.read_level()?;
//! session.close_session()?;
//! # let _ = level;
//! # Ok(())
//! # }
//! ```
//!
//! Writing or reading before any pin is configured fails with [`Error::NoPinSelected`]; any
//! command on a closed session fails with [`Error::SessionClosed`]. Closing consumes the register
//! window, so no register can be reached after the mapping is gone. Dropping an open session
//! closes it.
//!
//! ## Select register writes
//!
//! Each select register carries the 3-bit fields of 10 pins. By default, configuring a pin
//! overwrites its whole select register with the new field, which resets the other 9 pins in that
//! register to inputs. Use [`SelectWrite::ReadModify`] to preserve them:
//!
//! ```
//! let platform = bcmgpio::Platform::BCM2837.with_select_write(bcmgpio::SelectWrite::ReadModify);
//! # let _ = platform;
//! ```
//!
//! # Command protocol
//!
//! *See [`protocol`].*
//!
//! Sessions also speak a byte-level protocol, as a character device would: a configure request
//! carrying an 8-byte `{ mode: i32, pin_number: u32 }` block, a one-byte write of `b'1'` or
//! `b'0'`, and a read that answers with one such byte. Bytes are moved through a [`Transfer`],
//! and a failed transfer is reported as [`Error::TransferFailure`].
//!
//! # Sharing a session
//!
//! *See [`Device`].*
//!
//! Separate [`Session`] values are fully independent, each with its own window and selected pin.
//! When several callers must go through a single session instead, wrap it in a [`Device`], which
//! hands the opener a [`DeviceHandle`] and refuses a second `open` while that handle is live. All
//! commands go through the handle, each serialized behind a mutex. A handle can also issue
//! [`PortPin`]s implementing the `embedded-hal` digital traits:
//!
//! ```
//! # use embedded_hal::digital::v2::OutputPin;
//! # fn main() -> Result<(), bcmgpio::Error<core::convert::Infallible>> {
//! # let mapper = bcmgpio::mapper::noop::NoopMapper;
//! let device = bcmgpio::Device::<bcmgpio::DefaultMutex<_>, _>::new(mapper, Default::default());
//! let mut file = device.open()?;
//! let mut led = file.output_pin(17)?;
//! led.set_high()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Mutual exclusion
//!
//! In a `std` environment, enable the `std` Cargo feature and `mutex::DefaultMutex<T>` will be
//! `std::sync::Mutex<T>`. For Cortex-M environments using the `cortex-m` crate, enable the
//! `cortexm` feature (without `std`) and `DefaultMutex<T>` will be
//! `cortex_m::interrupt::Mutex<core::cell::RefCell<T>>`. Any other type implementing
//! [`SessionMutex`] may be used as well.
//!
//! # Logging
//!
//! The driver logs through the `log` facade: session and mapping lifecycle at `debug`, every
//! register load and store at `trace`, and rejected commands at `warn`. No logger is installed.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate embedded_hal as hal;

pub mod config;
pub mod device;
pub mod error;
pub mod mapper;
pub mod mutex;
pub mod pin;
pub mod protocol;
pub mod registers;
pub mod session;
pub mod window;

pub use config::{Direction, Platform, SelectWrite};
pub use device::{Device, DeviceHandle};
pub use error::Error;
pub use mapper::{CachePolicy, MappedRegion, MemoryMapper};
#[cfg(any(feature = "std", feature = "cortexm"))]
pub use mutex::DefaultMutex;
pub use mutex::SessionMutex;
pub use pin::{Level, PinIO, PortPin};
pub use protocol::{Command, ConfigureArgs, Reply, Transfer, UserBuffer};
pub use registers::{Family, Pin};
pub use session::Session;
pub use window::{MapFailure, RegisterWindow};
