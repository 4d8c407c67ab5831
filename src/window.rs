//! The register window: the GPIO block mapped into the driver's address space for the duration
//! of a session.

use core::fmt;

use log::{debug, trace};

use crate::config::Platform;
use crate::mapper::{CachePolicy, MappedRegion, MemoryMapper};
use crate::registers::RegisterAddress;

/// Mapping the register window failed. Carries the mapper's error.
#[derive(Debug, PartialEq)]
pub struct MapFailure<E>(pub E);

impl<E: fmt::Display> fmt::Display for MapFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "cannot map GPIO registers: {}", self.0)
    }
}

/// One page of GPIO registers mapped uncached. The window is the only way to touch the mapped
/// memory; it is consumed by [`RegisterWindow::close`], so no register can be accessed after the
/// mapping is gone.
#[must_use = "a register window must be closed to release its mapping"]
pub struct RegisterWindow<R: MappedRegion> {
    region: R,
    base: usize,
}

impl<R: MappedRegion> RegisterWindow<R> {
    /// Map the GPIO block of `platform` through `mapper`. Nothing is retained if the mapper
    /// fails.
    pub fn open<MM>(mapper: &mut MM, platform: &Platform) -> Result<Self, MapFailure<MM::Error>>
    where
        MM: MemoryMapper<Region = R>,
    {
        let base = platform.gpio_base();
        let region = mapper
            .map(base, platform.window_len(), CachePolicy::Uncached)
            .map_err(MapFailure)?;
        debug!("GPIO window mapped at physical {:#x}", base);
        Ok(Self { region, base })
    }

    /// Physical address of the first register in the window.
    pub fn base(&self) -> usize {
        self.base
    }

    pub fn read32(&self, addr: RegisterAddress) -> u32 {
        let value = self.region.read32(addr.into());
        trace!("load  {:#010x} -> {:#010x}", self.base + usize::from(addr), value);
        value
    }

    pub fn write32(&mut self, addr: RegisterAddress, value: u32) {
        trace!("store {:#010x} <- {:#010x}", self.base + usize::from(addr), value);
        self.region.write32(addr.into(), value)
    }

    /// Release the mapping.
    pub fn close<MM>(self, mapper: &mut MM)
    where
        MM: MemoryMapper<Region = R>,
    {
        mapper.unmap(self.region);
        debug!("GPIO window at physical {:#x} unmapped", self.base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::test_spy::{SpyMapError, SpyMapper};
    use crate::registers::{Pin, Register};

    #[test]
    fn open_maps_one_uncached_page() {
        let spy = SpyMapper::new();
        let mut mapper = spy.split();
        let window = RegisterWindow::open(&mut mapper, &Platform::BCM2837).unwrap();
        assert_eq!(window.base(), 0x3F20_0000);
        assert_eq!(spy.maps(), vec![(0x3F20_0000, 4096, CachePolicy::Uncached)]);
        assert!(spy.is_mapped());
        window.close(&mut mapper);
        assert!(!spy.is_mapped());
        assert_eq!(spy.unmaps(), 1);
    }

    #[test]
    fn open_failure_retains_nothing() {
        let spy = SpyMapper::new();
        let mut mapper = spy.split();
        spy.fail_next_map();
        let result = RegisterWindow::open(&mut mapper, &Platform::BCM2711);
        assert_eq!(result.err(), Some(MapFailure(SpyMapError)));
        assert!(!spy.is_mapped());
        assert!(spy.maps().is_empty());
    }

    #[test]
    fn read_write_at_register_offsets() {
        let spy = SpyMapper::new();
        let mut mapper = spy.split();
        let mut window = RegisterWindow::open(&mut mapper, &Platform::default()).unwrap();
        window.write32(Register::Select(Pin(12)).into(), 0b001 << 6);
        assert_eq!(spy.get(0x04), 0b001 << 6);
        spy.set(0x34, 1 << 7);
        assert_eq!(window.read32(Register::Level(Pin(7)).into()), 1 << 7);
        assert_eq!(spy.reads(), vec![0x34]);
        window.close(&mut mapper);
    }
}
