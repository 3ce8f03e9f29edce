//! Usage: Mutex extension trait that recovers from poisoned locks instead of panicking.

use std::sync::{Mutex, MutexGuard};

pub(crate) trait MutexExt<T> {
    /// Acquire the lock; if it is poisoned, recover the inner value and log.
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[track_caller]
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    mutex_type = std::any::type_name::<T>(),
                    file = loc.file(),
                    line = loc.line(),
                    "mutex poisoned by a panicked thread; recovering inner state"
                );
                poisoned.into_inner()
            }
        }
    }
}
