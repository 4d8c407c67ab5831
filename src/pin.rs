//! Pin levels, and `embedded-hal` pins backed by a shared session.

#[cfg(feature = "unproven")]
use hal::digital::v2::InputPin;
use hal::digital::v2::OutputPin;

use crate::registers::Pin;

/// The logic level of a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Level {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> bool {
        level == Level::High
    }
}

/// An indirection between `PortPin` and whatever owns the session, so that pins can be issued by
/// any adapter that serializes access to the registers.
pub trait PinIO {
    type Error;

    /// Drive `pin` to `level` through the set or clear register.
    fn write_pin(&self, pin: Pin, level: Level) -> Result<(), Self::Error>;

    /// Read the live level of `pin`.
    fn read_pin(&self, pin: Pin) -> Result<Level, Self::Error>;
}

/// A single GPIO pin. Implements the `embedded-hal` digital traits, so the GPIO block can be
/// handed to drivers written against them.
pub struct PortPin<'io, IO: PinIO> {
    io: &'io IO,
    pin: Pin,
}

impl<'io, IO: PinIO> PortPin<'io, IO> {
    pub(crate) fn new(io: &'io IO, pin: Pin) -> Self {
        Self { io, pin }
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }
}

impl<'io, IO: PinIO> OutputPin for PortPin<'io, IO> {
    type Error = IO::Error;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.io.write_pin(self.pin, Level::Low)
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.io.write_pin(self.pin, Level::High)
    }
}

#[cfg(feature = "unproven")]
impl<'io, IO: PinIO> InputPin for PortPin<'io, IO> {
    type Error = IO::Error;

    fn is_high(&self) -> Result<bool, Self::Error> {
        self.io.read_pin(self.pin).map(bool::from)
    }
    fn is_low(&self) -> Result<bool, Self::Error> {
        self.io.read_pin(self.pin).map(|l| l == Level::Low)
    }
}
