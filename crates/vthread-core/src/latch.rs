//! Blocking completion primitives
//!
//! `Latch` is a one-shot gate (closed until released, then open forever).
//! `Promise<T>` is a one-shot value slot whose readers block until it is
//! fulfilled. Both park on a condvar; there is no spinning.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// One-shot gate that threads can wait on
pub struct Latch {
    /// true once released
    released: Mutex<bool>,

    /// Woken on release
    condvar: Condvar,
}

impl Latch {
    pub fn new() -> Self {
        Self {
            released: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Open the gate and wake every waiter
    pub fn release(&self) {
        let mut released = self.released.lock();
        if !*released {
            *released = true;
            self.condvar.notify_all();
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        *self.released.lock()
    }

    /// Block until released
    pub fn wait(&self) {
        let mut released = self.released.lock();
        while !*released {
            self.condvar.wait(&mut released);
        }
    }

    /// Block until released or the timeout elapses
    ///
    /// Returns true if the latch was released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut released = self.released.lock();
        if *released {
            return true;
        }
        self.condvar
            .wait_while_for(&mut released, |r| !*r, timeout);
        *released
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Latch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latch")
            .field("released", &self.is_released())
            .finish()
    }
}

/// One-shot value slot
///
/// The first `fulfill` wins; later calls are ignored. `take` blocks until
/// a value is present and moves it out, so only one reader gets it.
pub struct Promise<T> {
    slot: Mutex<PromiseSlot<T>>,
    condvar: Condvar,
}

enum PromiseSlot<T> {
    Pending,
    Ready(T),
    Taken,
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(PromiseSlot::Pending),
            condvar: Condvar::new(),
        }
    }

    /// Store the value; returns false if the promise was already fulfilled
    pub fn fulfill(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        match *slot {
            PromiseSlot::Pending => {
                *slot = PromiseSlot::Ready(value);
                self.condvar.notify_all();
                true
            }
            _ => false,
        }
    }

    /// True once a value was stored (even if it was taken since)
    pub fn is_fulfilled(&self) -> bool {
        !matches!(*self.slot.lock(), PromiseSlot::Pending)
    }

    /// Block until fulfilled and move the value out
    ///
    /// Returns `None` if another reader already took it.
    pub fn take(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        while matches!(*slot, PromiseSlot::Pending) {
            self.condvar.wait(&mut slot);
        }
        match std::mem::replace(&mut *slot, PromiseSlot::Taken) {
            PromiseSlot::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}
