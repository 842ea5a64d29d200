//! Sleeping locks.

use std::sync::{Condvar as StdCondvar, Mutex as StdMutex};
use std::thread::{self, ThreadId};

use super::{unpoison, Guard, Lock, RawLock};

/// Mutual exclusion lock that puts contending threads to sleep. Holders may
/// release it mid-operation through `Condvar::wait`, so critical sections
/// may be long.
pub struct RawSleeplock {
    /// Name of lock, for assertion messages.
    name: &'static str,

    /// The thread currently holding the lock, if any.
    owner: StdMutex<Option<ThreadId>>,

    /// Threads sleeping until the lock is free.
    waiting: StdCondvar,
}

/// Locks that sleep while contended.
pub type Sleeplock<T> = Lock<RawSleeplock, T>;
/// Guards of `Sleeplock<T>`.
pub type SleeplockGuard<'s, T> = Guard<'s, RawSleeplock, T>;

impl RawSleeplock {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            owner: StdMutex::new(None),
            waiting: StdCondvar::new(),
        }
    }
}

impl RawLock for RawSleeplock {
    fn acquire(&self) {
        let me = thread::current().id();
        let mut owner = unpoison(self.owner.lock());
        assert!(*owner != Some(me), "acquire {}", self.name);
        while owner.is_some() {
            owner = unpoison(self.waiting.wait(owner));
        }
        *owner = Some(me);
    }

    fn release(&self) {
        let mut owner = unpoison(self.owner.lock());
        assert!(*owner == Some(thread::current().id()), "release {}", self.name);
        *owner = None;
        drop(owner);
        self.waiting.notify_one();
    }

    fn holding(&self) -> bool {
        *unpoison(self.owner.lock()) == Some(thread::current().id())
    }
}

impl<T> Sleeplock<T> {
    /// Returns a new `Sleeplock` with name `name` and data `data`.
    pub const fn new(name: &'static str, data: T) -> Self {
        Self::from_raw(RawSleeplock::new(name), data)
    }
}
