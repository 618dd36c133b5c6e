//! Wake-one thread signal built on a mutex-guarded flag.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A sticky wake-one signal.
///
/// [`set`](Self::set) is idempotent: setting an already-set signal is a
/// no-op. [`wait`](Self::wait) sleeps until the signal is set and
/// consumes the set state, so one `set` wakes exactly one `wait`. The
/// set state is sticky, which means a `set` racing ahead of the waiter
/// is never lost. Safe to call from any thread.
pub struct Signal {
    flag: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Set the signal, waking one waiter if present.
    pub fn set(&self) {
        let mut flag = self.flag.lock();
        if !*flag {
            *flag = true;
            self.condvar.notify_one();
        }
    }

    /// Sleep until the signal is set, then consume the set state.
    pub fn wait(&self) {
        let mut flag = self.flag.lock();
        while !*flag {
            self.condvar.wait(&mut flag);
        }
        *flag = false;
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`. Returns
    /// `true` if the signal was consumed, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut flag = self.flag.lock();
        while !*flag {
            if self.condvar.wait_until(&mut flag, deadline).timed_out() {
                break;
            }
        }
        let was_set = *flag;
        *flag = false;
        was_set
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
