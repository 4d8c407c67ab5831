//! The command protocol spoken by session clients, and its wire encodings.
//!
//! Three commands exist:
//!
//! - **Configure** arrives as an 8-byte argument block laid out as [`ConfigureArgs`]: a signed
//!   32-bit mode (0 for input, 1 for output) followed by an unsigned 32-bit pin number, both in
//!   native byte order.
//! - **SetLevel** arrives as a written byte, `b'1'` for high or `b'0'` for low.
//! - **QueryLevel** answers a read with exactly one byte in the same encoding, however many bytes
//!   were asked for.
//!
//! Bytes cross between the caller and the driver through a [`Transfer`]. A failed transfer is
//! reported as [`Error::TransferFailure`] and no register is touched.
//!
//! Requests are checked in a fixed order: a closed session is reported first, then a zero-length
//! transfer, then a failed copy, then an invalid payload.

use core::convert::TryFrom;

use log::debug;

use crate::config::Direction;
use crate::error::Error;
use crate::mapper::MemoryMapper;
use crate::pin::Level;
use crate::session::Session;

const LEVEL_LOW: u8 = b'0';
const LEVEL_HIGH: u8 = b'1';

const MODE_INPUT: i32 = 0;
const MODE_OUTPUT: i32 = 1;

/// A copy to or from the caller's buffer failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferFault;

/// The primitive used to move argument blocks and data bytes between the caller and the driver.
pub trait Transfer {
    /// Fill `dst` completely from the caller.
    fn copy_in(&mut self, dst: &mut [u8]) -> Result<(), TransferFault>;
    /// Hand all of `src` to the caller.
    fn copy_out(&mut self, src: &[u8]) -> Result<(), TransferFault>;
}

/// A caller buffer in the driver's own address space. Copies fault when the buffer is shorter than
/// the data moved.
pub struct UserBuffer<'a>(pub &'a mut [u8]);

impl<'a> Transfer for UserBuffer<'a> {
    fn copy_in(&mut self, dst: &mut [u8]) -> Result<(), TransferFault> {
        let src = self.0.get(..dst.len()).ok_or(TransferFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn copy_out(&mut self, src: &[u8]) -> Result<(), TransferFault> {
        let dst = self.0.get_mut(..src.len()).ok_or(TransferFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// The argument block of a configure request.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigureArgs {
    pub mode: i32,
    pub pin_number: u32,
}

impl ConfigureArgs {
    /// Size of the argument block on the wire.
    pub const SIZE: usize = 8;

    pub fn new(direction: Direction, pin_number: u32) -> Self {
        let mode = match direction {
            Direction::Input => MODE_INPUT,
            Direction::Output => MODE_OUTPUT,
        };
        Self { mode, pin_number }
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self {
            mode: i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            pin_number: u32::from_ne_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&self.mode.to_ne_bytes());
        bytes[4..].copy_from_slice(&self.pin_number.to_ne_bytes());
        bytes
    }

    /// Decode the mode field. Returns the raw mode if it is neither input nor output.
    pub fn direction(&self) -> Result<Direction, i32> {
        match self.mode {
            MODE_INPUT => Ok(Direction::Input),
            MODE_OUTPUT => Ok(Direction::Output),
            other => Err(other),
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Level, u8> {
        match byte {
            LEVEL_LOW => Ok(Level::Low),
            LEVEL_HIGH => Ok(Level::High),
            other => Err(other),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        match level {
            Level::Low => LEVEL_LOW,
            Level::High => LEVEL_HIGH,
        }
    }
}

/// A decoded client request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Configure { pin: u32, direction: Direction },
    SetLevel(Level),
    QueryLevel,
}

/// The result of executing a `Command`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Done,
    Level(Level),
}

impl Command {
    /// Decode a configure argument block.
    pub fn configure<E>(args: ConfigureArgs) -> Result<Command, Error<E>> {
        let direction = args.direction().map_err(Error::InvalidDirection)?;
        Ok(Command::Configure {
            pin: args.pin_number,
            direction,
        })
    }

    /// Decode a level write from its first byte.
    pub fn set_level<E>(byte: u8) -> Result<Command, Error<E>> {
        Level::try_from(byte)
            .map(Command::SetLevel)
            .map_err(Error::InvalidLevel)
    }
}

impl<MM: MemoryMapper> Session<MM> {
    /// Run a decoded command against this session.
    pub fn execute(&mut self, command: Command) -> Result<Reply, Error<MM::Error>> {
        match command {
            Command::Configure { pin, direction } => {
                self.configure(pin, direction).map(|_| Reply::Done)
            }
            Command::SetLevel(level) => self.write_level(level).map(|_| Reply::Done),
            Command::QueryLevel => self.read_level().map(Reply::Level),
        }
    }

    /// Handle a configure request whose argument block is fetched through `arg`.
    pub fn handle_configure<T: Transfer>(&mut self, arg: &mut T) -> Result<(), Error<MM::Error>> {
        self.ensure_open()?;
        let mut bytes = [0u8; ConfigureArgs::SIZE];
        arg.copy_in(&mut bytes).map_err(|_| Error::TransferFailure)?;
        let args = ConfigureArgs::from_bytes(bytes);
        debug!("configure request: {:?}", args);
        self.execute(Command::configure::<MM::Error>(args)?).map(|_| ())
    }

    /// Handle a write of `count` bytes from `src`. Only the first byte is used; the number of
    /// bytes consumed (always 1) is returned.
    pub fn handle_write<T: Transfer>(
        &mut self,
        src: &mut T,
        count: usize,
    ) -> Result<usize, Error<MM::Error>> {
        self.ensure_open()?;
        if count == 0 {
            return Err(Error::ShortTransfer);
        }
        let mut byte = [0u8; 1];
        src.copy_in(&mut byte).map_err(|_| Error::TransferFailure)?;
        self.execute(Command::set_level::<MM::Error>(byte[0])?)?;
        Ok(1)
    }

    /// Handle a read of up to `count` bytes into `dst`. Exactly one level byte is produced and
    /// its count (1) returned.
    pub fn handle_read<T: Transfer>(
        &mut self,
        dst: &mut T,
        count: usize,
    ) -> Result<usize, Error<MM::Error>> {
        self.ensure_open()?;
        if count == 0 {
            return Err(Error::ShortTransfer);
        }
        let level = self.read_level()?;
        dst.copy_out(&[u8::from(level)]).map_err(|_| Error::TransferFailure)?;
        Ok(1)
    }
}
