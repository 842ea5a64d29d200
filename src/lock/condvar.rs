//! Mesa condition variables.

use std::sync::{Condvar as StdCondvar, Mutex as StdMutex};

use super::{unpoison, Guard, RawLock};

/// A condition variable with Mesa semantics: waking a waiter does not hand
/// over the monitor lock, so a woken thread must re-check its predicate
/// after the lock is regained. Always paired with one predicate evaluated
/// under one lock.
pub struct Condvar {
    /// Bumped on every signal and broadcast. A waiter sleeps until the
    /// generation it observed under the monitor lock moves on, which makes
    /// a wakeup sent while the waiter is falling asleep impossible to lose.
    generation: StdMutex<u64>,

    waiting: StdCondvar,
}

impl Condvar {
    pub const fn new() -> Self {
        Self {
            generation: StdMutex::new(0),
            waiting: StdCondvar::new(),
        }
    }

    /// Atomically releases the monitor lock and sleeps until the condition
    /// is signalled, then reacquires the lock. Spurious wakeups are
    /// possible; callers loop over their predicate.
    pub fn wait<R: RawLock, T>(&self, guard: &mut Guard<'_, R, T>) {
        // Read under the monitor lock. Every signaller holds that lock, so
        // a wakeup racing with our release bumps the generation we compare
        // against and we return immediately instead of sleeping forever.
        let seen = *unpoison(self.generation.lock());
        guard.reacquire_after(|| {
            let mut generation = unpoison(self.generation.lock());
            while *generation == seen {
                generation = unpoison(self.waiting.wait(generation));
            }
        });
    }

    /// Wakes one waiter.
    pub fn signal(&self) {
        *unpoison(self.generation.lock()) += 1;
        self.waiting.notify_one();
    }

    /// Wakes every waiter.
    pub fn broadcast(&self) {
        *unpoison(self.generation.lock()) += 1;
        self.waiting.notify_all();
    }
}
