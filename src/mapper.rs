//! The memory mapping collaborator. A `MemoryMapper` places a range of physical address space
//! into the driver's address space and hands back a `MappedRegion` through which 32-bit registers
//! in that range are read and written.

/// Caching behaviour requested for a mapping. Hardware registers must always be mapped
/// `Uncached`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    Uncached,
    Cached,
}

/// A live mapping of physical memory.
pub trait MappedRegion {
    /// Perform a single 32-bit load at `offset` bytes from the start of the region.
    fn read32(&self, offset: usize) -> u32;
    /// Perform a single 32-bit store of `value` at `offset` bytes from the start of the region.
    fn write32(&mut self, offset: usize, value: u32);
}

/// Something that can map and unmap physical memory.
pub trait MemoryMapper {
    /// The region type produced by a successful `map`.
    type Region: MappedRegion;
    /// The type of error that mapping may return.
    type Error;
    /// Map `len` bytes of physical memory starting at `phys` with the given cache policy.
    fn map(
        &mut self,
        phys: usize,
        len: usize,
        cache: CachePolicy,
    ) -> Result<Self::Region, Self::Error>;
    /// Release a region previously returned by `map`.
    fn unmap(&mut self, region: Self::Region);
}

pub mod mmio {
    //! Regions backed by real memory, accessed with volatile loads and stores.

    use core::ptr::{self, NonNull};

    use super::MappedRegion;

    /// A region of memory-mapped I/O. Every access is a single volatile 32-bit load or store, so
    /// the compiler can neither elide nor reorder it with respect to other register accesses.
    pub struct MmioRegion {
        base: NonNull<u32>,
        len: usize,
    }

    // Unsafety: the region is only a pointer to device memory that is valid in every thread of the
    // process. Exclusive access is enforced by ownership of the region itself.
    unsafe impl Send for MmioRegion {}

    impl MmioRegion {
        /// Wrap `len` bytes of memory starting at `base`.
        ///
        /// # Safety
        ///
        /// `base` must be 4-byte aligned and valid for volatile reads and writes of `len` bytes
        /// for as long as the region exists, and nothing else may create references into that
        /// memory in the meantime.
        pub unsafe fn new(base: NonNull<u32>, len: usize) -> Self {
            Self { base, len }
        }

        pub fn as_ptr(&self) -> *mut u32 {
            self.base.as_ptr()
        }

        pub fn len(&self) -> usize {
            self.len
        }

        fn word(&self, offset: usize) -> *mut u32 {
            assert!(
                offset % 4 == 0 && offset + 4 <= self.len,
                "register offset {:#x} outside {:#x}-byte region",
                offset,
                self.len
            );
            // In bounds per the assertion and the contract of `new`.
            unsafe { self.base.as_ptr().add(offset / 4) }
        }
    }

    impl MappedRegion for MmioRegion {
        fn read32(&self, offset: usize) -> u32 {
            unsafe { ptr::read_volatile(self.word(offset)) }
        }

        fn write32(&mut self, offset: usize, value: u32) {
            unsafe { ptr::write_volatile(self.word(offset), value) }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn volatile_access_reaches_memory() {
            let mut page = [0u32; 16];
            {
                let base = NonNull::new(page.as_mut_ptr()).unwrap();
                let mut region = unsafe { MmioRegion::new(base, 64) };
                region.write32(0x1C, 1 << 4);
                region.write32(0x3C, 0xDEAD_BEEF);
                assert_eq!(region.read32(0x1C), 1 << 4);
                assert_eq!(region.read32(0x00), 0);
            }
            assert_eq!(page[7], 1 << 4);
            assert_eq!(page[15], 0xDEAD_BEEF);
        }

        #[test]
        #[should_panic]
        fn access_past_end_panics() {
            let mut page = [0u32; 4];
            let base = NonNull::new(page.as_mut_ptr()).unwrap();
            let region = unsafe { MmioRegion::new(base, 16) };
            region.read32(16);
        }

        #[test]
        #[should_panic]
        fn unaligned_access_panics() {
            let mut page = [0u32; 4];
            let base = NonNull::new(page.as_mut_ptr()).unwrap();
            let region = unsafe { MmioRegion::new(base, 16) };
            region.read32(2);
        }
    }
}

#[cfg(feature = "devmem")]
pub mod devmem {
    //! Maps physical memory through `/dev/mem`. Needs privileges to open that file.

    use core::convert::TryFrom;
    use core::ptr::{self, NonNull};
    use std::fmt;
    use std::fs::OpenOptions;
    use std::io;
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;
    use std::path::PathBuf;

    use log::{debug, warn};

    use super::mmio::MmioRegion;
    use super::{CachePolicy, MemoryMapper};

    /// Errors from mapping physical memory through `/dev/mem`.
    #[derive(Debug)]
    pub enum DevMemError {
        /// The memory device could not be opened.
        Open(io::Error),
        /// `mmap` refused the request.
        Map(io::Error),
    }

    impl fmt::Display for DevMemError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            match self {
                DevMemError::Open(e) => write!(f, "cannot open memory device: {}", e),
                DevMemError::Map(e) => write!(f, "cannot map physical memory: {}", e),
            }
        }
    }

    impl std::error::Error for DevMemError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match self {
                DevMemError::Open(e) | DevMemError::Map(e) => Some(e),
            }
        }
    }

    /// A `MemoryMapper` over the kernel's physical memory device.
    pub struct DevMem {
        path: PathBuf,
    }

    impl DevMem {
        pub fn new() -> Self {
            Self::with_path("/dev/mem")
        }

        pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
            Self { path: path.into() }
        }
    }

    impl Default for DevMem {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryMapper for DevMem {
        type Region = MmioRegion;
        type Error = DevMemError;

        fn map(
            &mut self,
            phys: usize,
            len: usize,
            cache: CachePolicy,
        ) -> Result<MmioRegion, DevMemError> {
            let offset = libc::off_t::try_from(phys).map_err(|_| {
                DevMemError::Map(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "physical address does not fit in a file offset",
                ))
            })?;
            let flags = match cache {
                CachePolicy::Uncached => libc::O_SYNC,
                CachePolicy::Cached => 0,
            };
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(flags)
                .open(&self.path)
                .map_err(DevMemError::Open)?;

            // The mapping outlives the descriptor, which is closed when `file` drops.
            let addr = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    file.as_raw_fd(),
                    offset,
                )
            };
            if addr == libc::MAP_FAILED {
                return Err(DevMemError::Map(io::Error::last_os_error()));
            }
            let base = NonNull::new(addr as *mut u32)
                .ok_or_else(|| DevMemError::Map(io::Error::from(io::ErrorKind::Other)))?;
            debug!("mapped {:#x} bytes of physical memory at {:#x}", len, phys);
            Ok(unsafe { MmioRegion::new(base, len) })
        }

        fn unmap(&mut self, region: MmioRegion) {
            let rc = unsafe { libc::munmap(region.as_ptr() as *mut libc::c_void, region.len()) };
            if rc != 0 {
                warn!("munmap failed: {}", io::Error::last_os_error());
            }
        }
    }

}

// This is here (and has to be pub) for doctests only. It's useless otherwise.
#[doc(hidden)]
pub mod noop {
    use super::{CachePolicy, MappedRegion, MemoryMapper};

    pub struct NoopMapper;
    pub struct NoopRegion;

    impl MappedRegion for NoopRegion {
        fn read32(&self, _offset: usize) -> u32 {
            0
        }
        fn write32(&mut self, _offset: usize, _value: u32) {}
    }

    impl MemoryMapper for NoopMapper {
        type Region = NoopRegion;
        type Error = core::convert::Infallible;

        fn map(
            &mut self,
            _phys: usize,
            _len: usize,
            _cache: CachePolicy,
        ) -> Result<NoopRegion, Self::Error> {
            Ok(NoopRegion)
        }
        fn unmap(&mut self, _region: NoopRegion) {}
    }
}
