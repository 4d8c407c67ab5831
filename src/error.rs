//! The driver's error type.

use core::fmt;

use crate::window::MapFailure;

/// Everything a session or protocol operation may report. `E` is the error type of the
/// `MemoryMapper` in use.
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// The register window could not be mapped, so the session did not open.
    SessionOpen(MapFailure<E>),
    /// A session is already open.
    AlreadyOpen,
    /// The session is closed; nothing may be done until it is opened again.
    SessionClosed,
    /// A level was written or read before any pin was configured.
    NoPinSelected,
    /// The pin number is outside the platform's range.
    InvalidPin(u32),
    /// The configure request carried a mode other than input (0) or output (1).
    InvalidDirection(i32),
    /// A level byte other than `b'0'` or `b'1'` was written.
    InvalidLevel(u8),
    /// The caller offered no room for the data being transferred.
    ShortTransfer,
    /// Copying arguments or data to or from the caller failed.
    TransferFailure,
}

impl<E> From<MapFailure<E>> for Error<E> {
    fn from(e: MapFailure<E>) -> Self {
        Error::SessionOpen(e)
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::SessionOpen(e) => write!(f, "cannot open session: {}", e),
            Error::AlreadyOpen => f.write_str("session already open"),
            Error::SessionClosed => f.write_str("session is closed"),
            Error::NoPinSelected => f.write_str("no pin has been configured"),
            Error::InvalidPin(pin) => write!(f, "no such GPIO pin: {}", pin),
            Error::InvalidDirection(mode) => write!(f, "invalid pin mode: {}", mode),
            Error::InvalidLevel(byte) => write!(f, "invalid level byte: {:#04x}", byte),
            Error::ShortTransfer => f.write_str("transfer too short"),
            Error::TransferFailure => f.write_str("cannot copy data to or from the caller"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for MapFailure<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e: Error<&str> = Error::SessionOpen(MapFailure("permission denied"));
        assert_eq!(
            e.to_string(),
            "cannot open session: cannot map GPIO registers: permission denied"
        );
        assert_eq!(
            Error::<&str>::InvalidLevel(b'x').to_string(),
            "invalid level byte: 0x78"
        );
        assert_eq!(Error::<&str>::InvalidPin(54).to_string(), "no such GPIO pin: 54");
    }
}
