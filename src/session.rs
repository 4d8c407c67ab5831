//! The pin session: owns the register window while open, and remembers which pin was configured
//! last so that level writes and reads can act on it.
//!
//! ```text
//! Closed --open_session--> Open(None) --configure--> Open(Some(pin)) --close_session--> Closed
//! ```

use core::mem;

use log::{debug, warn};

use crate::config::{Direction, Platform, SelectWrite};
use crate::error::Error;
use crate::mapper::{MappedRegion, MemoryMapper};
use crate::pin::Level;
use crate::registers::{Family, Pin, Register};
use crate::window::RegisterWindow;

enum State<R: MappedRegion> {
    Closed,
    Open {
        window: RegisterWindow<R>,
        selected: Option<Pin>,
    },
}

/// A client session on the GPIO block.
///
/// Each `Session` owns its own window and selected pin, so separate callers holding separate
/// sessions never observe each other's selection. To share one session between callers, wrap it
/// in a [`Device`](crate::device::Device).
///
/// ```
/// # fn main() -> Result<(), bcmgpio::Error<core::convert::Infallible>> {
/// use bcmgpio::{Direction, Level, Platform, Session};
/// # let mapper = bcmgpio::mapper::noop::NoopMapper;
///
/// let mut session = Session::open(mapper, Platform::BCM2837)?;
/// session.configure(4, Direction::Output)?;
/// session.write_level(Level::High)?;
/// let _level = session.read_level()?;
/// session.close_session()?;
/// # Ok(())
/// # }
/// ```
pub struct Session<MM: MemoryMapper> {
    mapper: MM,
    platform: Platform,
    state: State<MM::Region>,
}

impl<MM: MemoryMapper> Session<MM> {
    /// Create a closed session that will map registers through `mapper`.
    pub fn new(mapper: MM, platform: Platform) -> Self {
        Self {
            mapper,
            platform,
            state: State::Closed,
        }
    }

    /// Create a session and open it.
    pub fn open(mapper: MM, platform: Platform) -> Result<Self, Error<MM::Error>> {
        let mut session = Self::new(mapper, platform);
        session.open_session()?;
        Ok(session)
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn is_open(&self) -> bool {
        match self.state {
            State::Open { .. } => true,
            State::Closed => false,
        }
    }

    /// The pin most recently configured in this session, if any.
    pub fn selected_pin(&self) -> Option<Pin> {
        match self.state {
            State::Open { selected, .. } => selected,
            State::Closed => None,
        }
    }

    /// Map the register window. The session starts with no pin selected.
    pub fn open_session(&mut self) -> Result<(), Error<MM::Error>> {
        if self.is_open() {
            warn!("GPIO session already open");
            return Err(Error::AlreadyOpen);
        }
        let window = RegisterWindow::open(&mut self.mapper, &self.platform)?;
        self.state = State::Open {
            window,
            selected: None,
        };
        debug!("GPIO session opened");
        Ok(())
    }

    /// Unmap the register window and forget the selected pin.
    pub fn close_session(&mut self) -> Result<(), Error<MM::Error>> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Open { window, .. } => {
                window.close(&mut self.mapper);
                debug!("GPIO session closed");
                Ok(())
            }
            State::Closed => {
                warn!("GPIO session closed twice");
                Err(Error::SessionClosed)
            }
        }
    }

    /// Set the function of `pin` to `direction` and make it the selected pin.
    ///
    /// With [`SelectWrite::Overwrite`] the whole select register is replaced by the new field, so
    /// the other pins sharing that register revert to inputs.
    pub fn configure(&mut self, pin: u32, direction: Direction) -> Result<Pin, Error<MM::Error>> {
        let platform = self.platform;
        let (window, selected) = self.open_state()?;
        let pin = platform.pin(pin).map_err(Error::InvalidPin)?;

        let addr = Register::Select(pin).into();
        let field = u32::from(direction) << pin.bit(Family::Select);
        let value = match platform.select_write() {
            SelectWrite::Overwrite => field,
            SelectWrite::ReadModify => window.read32(addr) & !pin.mask(Family::Select) | field,
        };
        window.write32(addr, value);
        *selected = Some(pin);

        debug!("GPIO pin {} configured as {:?}", pin.number(), direction);
        Ok(pin)
    }

    /// Drive the selected pin to `level`.
    pub fn write_level(&mut self, level: Level) -> Result<(), Error<MM::Error>> {
        let (window, selected) = self.open_state()?;
        let pin = require_selected(*selected)?;
        drive(window, pin, level);
        Ok(())
    }

    /// Read the live level of the selected pin.
    pub fn read_level(&self) -> Result<Level, Error<MM::Error>> {
        let (window, selected) = self.open_state_ref()?;
        let pin = require_selected(selected)?;
        Ok(sample(window, pin))
    }

    /// Drive `pin` to `level` without changing the selected pin.
    pub fn write_pin(&mut self, pin: Pin, level: Level) -> Result<(), Error<MM::Error>> {
        let (window, _) = self.open_state()?;
        drive(window, pin, level);
        Ok(())
    }

    /// Read the live level of `pin` without changing the selected pin.
    pub fn read_pin(&self, pin: Pin) -> Result<Level, Error<MM::Error>> {
        let (window, _) = self.open_state_ref()?;
        Ok(sample(window, pin))
    }

    /// Fail with `SessionClosed` unless the window is mapped.
    pub(crate) fn ensure_open(&self) -> Result<(), Error<MM::Error>> {
        self.open_state_ref().map(|_| ())
    }

    fn open_state(
        &mut self,
    ) -> Result<(&mut RegisterWindow<MM::Region>, &mut Option<Pin>), Error<MM::Error>> {
        match &mut self.state {
            State::Open { window, selected } => Ok((window, selected)),
            State::Closed => {
                warn!("GPIO session is closed");
                Err(Error::SessionClosed)
            }
        }
    }

    fn open_state_ref(
        &self,
    ) -> Result<(&RegisterWindow<MM::Region>, Option<Pin>), Error<MM::Error>> {
        match &self.state {
            State::Open { window, selected } => Ok((window, *selected)),
            State::Closed => {
                warn!("GPIO session is closed");
                Err(Error::SessionClosed)
            }
        }
    }
}

impl<MM: MemoryMapper> Drop for Session<MM> {
    fn drop(&mut self) {
        if let State::Open { window, .. } = mem::replace(&mut self.state, State::Closed) {
            window.close(&mut self.mapper);
        }
    }
}

fn require_selected<E>(selected: Option<Pin>) -> Result<Pin, Error<E>> {
    selected.ok_or_else(|| {
        warn!("GPIO level access before any pin was configured");
        Error::NoPinSelected
    })
}

fn drive<R: MappedRegion>(window: &mut RegisterWindow<R>, pin: Pin, level: Level) {
    let register = match level {
        Level::High => Register::Set(pin),
        Level::Low => Register::Clear(pin),
    };
    window.write32(register.into(), 1 << pin.bit(Family::Set));
}

fn sample<R: MappedRegion>(window: &RegisterWindow<R>, pin: Pin) -> Level {
    let bits = window.read32(Register::Level(pin).into());
    Level::from(bits & (1 << pin.bit(Family::Level)) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::test_spy::{SpyMapError, SpyMapper};
    use crate::window::MapFailure;

    fn open(spy: &SpyMapper) -> Session<SpyMapper> {
        Session::open(spy.split(), Platform::default()).unwrap()
    }

    #[test]
    fn output_round_trip() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        assert_eq!(s.configure(17, Direction::Output), Ok(Pin(17)));
        assert!(s.write_level(Level::High).is_ok());
        assert_eq!(s.read_level(), Ok(Level::High));
        assert!(s.write_level(Level::Low).is_ok());
        assert_eq!(s.read_level(), Ok(Level::Low));
    }

    #[test]
    fn pin_four_set_and_clear_registers() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        s.configure(4, Direction::Output).unwrap();
        assert_eq!(spy.get(0x00), 0b001 << 12);

        s.write_level(Level::High).unwrap();
        assert_eq!(spy.get(0x1C), 1 << 4);
        assert_eq!(spy.get(0x28), 0);
        assert_eq!(s.read_level(), Ok(Level::High));

        s.write_level(Level::Low).unwrap();
        assert_eq!(spy.get(0x28), 1 << 4);
        assert_eq!(s.read_level(), Ok(Level::Low));
        assert_eq!(
            spy.writes(),
            vec![(0x00, 0b001 << 12), (0x1C, 1 << 4), (0x28, 1 << 4)]
        );
    }

    #[test]
    fn pin_in_second_bank() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        s.configure(32, Direction::Output).unwrap();
        assert_eq!(spy.get(0x0C), 0b001 << 6);
        s.write_level(Level::High).unwrap();
        assert_eq!(spy.get(0x20), 1);
        assert_eq!(spy.get(0x1C), 0);
        assert_eq!(s.read_level(), Ok(Level::High));
        assert_eq!(spy.reads(), vec![0x38]);
    }

    #[test]
    fn input_level_follows_hardware() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        s.configure(31, Direction::Input).unwrap();
        assert_eq!(s.read_level(), Ok(Level::Low));
        spy.set(0x34, 1 << 31);
        assert_eq!(s.read_level(), Ok(Level::High));
    }

    #[test]
    fn level_access_without_configure() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        assert_eq!(s.write_level(Level::High), Err(Error::NoPinSelected));
        assert_eq!(s.read_level(), Err(Error::NoPinSelected));
        assert!(spy.writes().is_empty());
        assert!(spy.reads().is_empty());

        // Still usable afterwards.
        s.configure(4, Direction::Output).unwrap();
        assert!(s.write_level(Level::High).is_ok());
    }

    #[test]
    fn invalid_pin_rejected() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        s.configure(4, Direction::Output).unwrap();
        assert_eq!(s.configure(54, Direction::Output), Err(Error::InvalidPin(54)));
        assert_eq!(
            s.configure(u32::max_value(), Direction::Input),
            Err(Error::InvalidPin(u32::max_value()))
        );
        assert_eq!(s.selected_pin(), Some(Pin(4)));
        assert_eq!(spy.writes().len(), 1);
    }

    #[test]
    fn reconfigure_moves_selection() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        s.configure(4, Direction::Output).unwrap();
        s.configure(17, Direction::Output).unwrap();
        s.write_level(Level::High).unwrap();
        assert_eq!(spy.get(0x1C), 1 << 17);
    }

    #[test]
    fn select_overwrite_clobbers_siblings() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        // Pins 5 and 6 share select register 0 with pin 4.
        spy.set(0x00, 0b001 << 15 | 0b001 << 18);
        s.configure(4, Direction::Output).unwrap();
        assert_eq!(spy.get(0x00), 0b001 << 12);
        assert!(spy.reads().is_empty());
    }

    #[test]
    fn select_read_modify_preserves_siblings() {
        let spy = SpyMapper::new();
        let platform = Platform::default().with_select_write(SelectWrite::ReadModify);
        let mut s = Session::open(spy.split(), platform).unwrap();
        spy.set(0x00, 0b001 << 15 | 0b111 << 12 | 0b001 << 18);
        s.configure(4, Direction::Input).unwrap();
        assert_eq!(spy.get(0x00), 0b001 << 15 | 0b001 << 18);
        s.configure(4, Direction::Output).unwrap();
        assert_eq!(spy.get(0x00), 0b001 << 15 | 0b001 << 12 | 0b001 << 18);
        assert_eq!(spy.reads(), vec![0x00, 0x00]);
    }

    #[test]
    fn closed_session_rejects_commands() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        s.configure(4, Direction::Output).unwrap();
        assert!(s.close_session().is_ok());
        assert!(!spy.is_mapped());
        assert_eq!(s.configure(4, Direction::Output), Err(Error::SessionClosed));
        assert_eq!(s.write_level(Level::High), Err(Error::SessionClosed));
        assert_eq!(s.read_level(), Err(Error::SessionClosed));
        assert_eq!(s.read_pin(Pin(4)), Err(Error::SessionClosed));
        assert_eq!(s.close_session(), Err(Error::SessionClosed));
        assert_eq!(spy.unmaps(), 1);
    }

    #[test]
    fn reopen_starts_without_selection() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        s.configure(4, Direction::Output).unwrap();
        s.close_session().unwrap();
        assert_eq!(s.selected_pin(), None);
        s.open_session().unwrap();
        assert_eq!(s.selected_pin(), None);
        assert_eq!(s.write_level(Level::High), Err(Error::NoPinSelected));
        assert_eq!(spy.maps().len(), 2);
    }

    #[test]
    fn open_twice_rejected() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        assert_eq!(s.open_session(), Err(Error::AlreadyOpen));
        assert_eq!(spy.maps().len(), 1);
        assert!(s.is_open());
    }

    #[test]
    fn open_failure_reported() {
        let spy = SpyMapper::new();
        spy.fail_next_map();
        let result = Session::open(spy.split(), Platform::default());
        assert_eq!(
            result.err(),
            Some(Error::SessionOpen(MapFailure(SpyMapError)))
        );
        assert!(!spy.is_mapped());
    }

    #[test]
    fn drop_unmaps_window() {
        let spy = SpyMapper::new();
        {
            let mut s = open(&spy);
            s.configure(4, Direction::Output).unwrap();
        }
        assert!(!spy.is_mapped());
        assert_eq!(spy.unmaps(), 1);
    }

    #[test]
    fn explicit_pin_access_keeps_selection() {
        let spy = SpyMapper::new();
        let mut s = open(&spy);
        s.configure(4, Direction::Output).unwrap();
        s.write_pin(Pin(9), Level::High).unwrap();
        assert_eq!(spy.get(0x1C), 1 << 9);
        assert_eq!(s.read_pin(Pin(9)), Ok(Level::High));
        assert_eq!(s.selected_pin(), Some(Pin(4)));
        assert_eq!(s.read_level(), Ok(Level::Low));
    }

    #[test]
    fn separate_sessions_keep_separate_selection() {
        let first = SpyMapper::new();
        let second = SpyMapper::new();
        let mut a = open(&first);
        let mut b = open(&second);
        a.configure(4, Direction::Output).unwrap();
        assert_eq!(b.write_level(Level::High), Err(Error::NoPinSelected));
        b.configure(22, Direction::Output).unwrap();
        assert_eq!(a.selected_pin(), Some(Pin(4)));
        assert_eq!(b.selected_pin(), Some(Pin(22)));
    }
}
