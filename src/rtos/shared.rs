//! Mutual exclusion for peripherals and settings touched by several tasks

use std::sync::{Mutex, PoisonError};

/// A value owned by one task and accessed by many.
///
/// Access only happens inside a callback, so no reference to the value can
/// outlive the lock.
pub struct SharedResource<T> {
    value: Mutex<T>,
}

impl<T> SharedResource<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }

    /// Run `f` while holding the lock. Waits for the lock without bound.
    ///
    /// The lock is released on every exit path. A panic inside `f` does not
    /// wedge the resource for other tasks.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    /// Like `with_lock`, but `f` also runs inside the global critical section.
    ///
    /// Meant for short non-reentrant register sequences. `f` must not block or
    /// sleep.
    pub fn with_locked_critical_section<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        critical_section::with(|_cs| f(&mut *guard))
    }

    pub fn into_inner(self) -> T {
        self.value
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Default> Default for SharedResource<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
