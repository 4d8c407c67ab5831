//! Mutual exclusion for a session shared between callers.

/// Any type implementing `SessionMutex` can serialize access to a shared [`Session`], so that one
/// caller's configure/write/read sequence runs without another's interleaving inside it.
///
/// With the `std` feature this is implemented for `std::sync::Mutex`; with `cortexm` (and without
/// `std`) for `cortex_m::interrupt::Mutex<core::cell::RefCell>`. [`DefaultMutex<T>`] names
/// whichever of the two is enabled.
///
/// [`Session`]: crate::session::Session
pub trait SessionMutex<T> {
    /// Construct a new instance of this mutex containing the value `v`.
    fn new(v: T) -> Self;

    /// Lock the mutex and call `f` as a critical section with a mutable reference to the owned
    /// value. Returns the value returned by `f`.
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R;
}

#[cfg(feature = "std")]
pub type DefaultMutex<T> = std::sync::Mutex<T>;

#[cfg(all(feature = "cortexm", not(feature = "std")))]
pub type DefaultMutex<T> = cortex_m::interrupt::Mutex<core::cell::RefCell<T>>;

#[cfg(feature = "std")]
impl<T> SessionMutex<T> for std::sync::Mutex<T> {
    fn new(v: T) -> Self {
        std::sync::Mutex::new(v)
    }
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        // Session state is consistent between commands; a poisoned lock is safe to reuse.
        let mut v = match std::sync::Mutex::lock(self) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut v)
    }
}

#[cfg(feature = "cortexm")]
impl<T> SessionMutex<T> for cortex_m::interrupt::Mutex<core::cell::RefCell<T>> {
    fn new(v: T) -> Self {
        cortex_m::interrupt::Mutex::new(core::cell::RefCell::new(v))
    }
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        cortex_m::interrupt::free(|cs| {
            let mut v = self.borrow(cs).borrow_mut();
            f(&mut v)
        })
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lock_recovers_from_poison() {
        let m = Arc::new(<DefaultMutex<u32> as SessionMutex<u32>>::new(7));
        let poisoner = m.clone();
        let _ = thread::spawn(move || {
            SessionMutex::lock(&*poisoner, |_| panic!("poison"));
        })
        .join();
        assert_eq!(SessionMutex::lock(&*m, |v| *v), 7);
    }
}
