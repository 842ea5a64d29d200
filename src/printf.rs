//! Kernel-style debug tracing. Classes of trace output are toggled at
//! runtime through a process-wide flag word; disabled classes cost one
//! atomic load per call site.

use core::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;

bitflags! {
    /// Classes of debug output.
    pub struct DbFlags: u32 {
        /// Syscall entry and exit.
        const SYSCALL = 0x1;
        /// Process table lifecycle (add, link, reap).
        const PROC = 0x2;
        /// Intersection admissions and departures.
        const SYNCH = 0x4;
    }
}

static DBFLAGS: AtomicU32 = AtomicU32::new(0);

/// Enables exactly the given trace classes.
pub fn set_dbflags(flags: DbFlags) {
    DBFLAGS.store(flags.bits(), Ordering::Relaxed);
}

/// The currently enabled trace classes.
pub fn dbflags() -> DbFlags {
    DbFlags::from_bits_truncate(DBFLAGS.load(Ordering::Relaxed))
}

/// kdebug! traces to stderr when its class is enabled.
#[macro_export]
macro_rules! kdebug {
    ($class:expr, $($arg:tt)*) => {
        if $crate::printf::dbflags().contains($class) {
            eprintln!($($arg)*);
        }
    };
}
