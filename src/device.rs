//! A single GPIO session shared by every caller of a device, with access serialized by a mutex.
//!
//! This is the model of a character device: a caller `open`s it and receives a [`DeviceHandle`],
//! issues `ioctl`/`write`/`read` requests through that handle, and `release`s it. Only one handle
//! may exist at a time; a second `open` while one is live fails with [`Error::AlreadyOpen`]. The
//! selected pin therefore belongs to the holder of the handle, and no other caller can change it
//! or close the session underneath them.

use core::marker::PhantomData;
use core::mem;

use crate::config::{Direction, Platform};
use crate::error::Error;
use crate::mapper::MemoryMapper;
use crate::mutex::SessionMutex;
use crate::pin::{Level, PinIO, PortPin};
use crate::protocol::{Command, Reply, Transfer};
use crate::registers::Pin;
use crate::session::Session;

/// The shared device. `M` is the mutex type guarding the session, usually
/// [`DefaultMutex`](crate::mutex::DefaultMutex).
///
/// ```
/// # fn main() -> Result<(), bcmgpio::Error<core::convert::Infallible>> {
/// use bcmgpio::protocol::{ConfigureArgs, UserBuffer};
/// use bcmgpio::{DefaultMutex, Device, Direction, Platform};
/// # let mapper = bcmgpio::mapper::noop::NoopMapper;
///
/// let device = Device::<DefaultMutex<_>, _>::new(mapper, Platform::BCM2837);
/// let mut file = device.open()?;
/// let mut arg = ConfigureArgs::new(Direction::Output, 4).to_bytes();
/// file.ioctl(&mut UserBuffer(&mut arg))?;
/// file.write(&mut UserBuffer(&mut [b'1']), 1)?;
/// let mut state = [0u8];
/// file.read(&mut UserBuffer(&mut state), 1)?;
/// file.release()?;
/// # Ok(())
/// # }
/// ```
pub struct Device<M, MM>(M, PhantomData<fn() -> MM>)
where
    M: SessionMutex<Session<MM>>,
    MM: MemoryMapper;

impl<M, MM> Device<M, MM>
where
    M: SessionMutex<Session<MM>>,
    MM: MemoryMapper,
{
    /// Create a device whose sessions map registers through `mapper`. No session is open yet.
    pub fn new(mapper: MM, platform: Platform) -> Self {
        Device(M::new(Session::new(mapper, platform)), PhantomData)
    }

    /// Start a session, mapping the register window. The returned handle is the only way to
    /// command or close the session; dropping it closes the session too.
    pub fn open(&self) -> Result<DeviceHandle<'_, M, MM>, Error<MM::Error>> {
        self.0.lock(|s| s.open_session())?;
        Ok(DeviceHandle { device: self })
    }

    /// Whether some caller currently holds the session open.
    pub fn is_open(&self) -> bool {
        self.0.lock(|s| s.is_open())
    }
}

/// Exclusive access to the open session of a [`Device`].
///
/// Every command locks the device for its own duration, so a handle may be sent to another thread
/// and used there.
#[must_use = "dropping the handle closes the session"]
pub struct DeviceHandle<'d, M, MM>
where
    M: SessionMutex<Session<MM>>,
    MM: MemoryMapper,
{
    device: &'d Device<M, MM>,
}

impl<'d, M, MM> DeviceHandle<'d, M, MM>
where
    M: SessionMutex<Session<MM>>,
    MM: MemoryMapper,
{
    fn lock<R, F: FnOnce(&mut Session<MM>) -> R>(&self, f: F) -> R {
        self.device.0.lock(f)
    }

    /// The pin most recently configured through this handle, if any.
    pub fn selected_pin(&self) -> Option<Pin> {
        self.lock(|s| s.selected_pin())
    }

    pub fn execute(&mut self, command: Command) -> Result<Reply, Error<MM::Error>> {
        self.lock(|s| s.execute(command))
    }

    /// Configure request; see [`Session::handle_configure`].
    pub fn ioctl<T: Transfer>(&mut self, arg: &mut T) -> Result<(), Error<MM::Error>> {
        self.lock(|s| s.handle_configure(arg))
    }

    /// Level write; see [`Session::handle_write`].
    pub fn write<T: Transfer>(
        &mut self,
        src: &mut T,
        count: usize,
    ) -> Result<usize, Error<MM::Error>> {
        self.lock(|s| s.handle_write(src, count))
    }

    /// Level read; see [`Session::handle_read`].
    pub fn read<T: Transfer>(
        &mut self,
        dst: &mut T,
        count: usize,
    ) -> Result<usize, Error<MM::Error>> {
        self.lock(|s| s.handle_read(dst, count))
    }

    /// End the session, unmapping the register window.
    pub fn release(self) -> Result<(), Error<MM::Error>> {
        let device = self.device;
        mem::forget(self);
        device.0.lock(|s| s.close_session())
    }

    /// Configure `pin` as an output and return an `embedded-hal` pin for it. The pin also becomes
    /// the session's selected pin.
    pub fn output_pin(&mut self, pin: u32) -> Result<PortPin<'_, Self>, Error<MM::Error>> {
        self.configured_pin(pin, Direction::Output)
    }

    /// Configure `pin` as an input and return an `embedded-hal` pin for it. The pin also becomes
    /// the session's selected pin.
    pub fn input_pin(&mut self, pin: u32) -> Result<PortPin<'_, Self>, Error<MM::Error>> {
        self.configured_pin(pin, Direction::Input)
    }

    fn configured_pin(
        &mut self,
        pin: u32,
        direction: Direction,
    ) -> Result<PortPin<'_, Self>, Error<MM::Error>> {
        let pin = self.lock(|s| s.configure(pin, direction))?;
        Ok(PortPin::new(self, pin))
    }
}

impl<'d, M, MM> Drop for DeviceHandle<'d, M, MM>
where
    M: SessionMutex<Session<MM>>,
    MM: MemoryMapper,
{
    fn drop(&mut self) {
        let _ = self.lock(|s| s.close_session());
    }
}

impl<'d, M, MM> PinIO for DeviceHandle<'d, M, MM>
where
    M: SessionMutex<Session<MM>>,
    MM: MemoryMapper,
{
    type Error = Error<MM::Error>;

    fn write_pin(&self, pin: Pin, level: Level) -> Result<(), Self::Error> {
        self.lock(|s| s.write_pin(pin, level))
    }
    fn read_pin(&self, pin: Pin) -> Result<Level, Self::Error> {
        self.lock(|s| s.read_pin(pin))
    }
}
