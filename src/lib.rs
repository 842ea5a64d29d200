//! ksynch: the two concurrency cores of a teaching kernel.
//!
//! The first core is a Unix-style process table: pid allocation with
//! lowest-slot reuse, parent/child reference counting, and the exit-code
//! rendezvous behind fork, waitpid, _exit, getpid, and execv. The second
//! is a traffic-intersection synchronizer that admits a vehicle only
//! while nothing conflicting is inside and wakes waiters per movement
//! class on departure.
//!
//! Both are monitors: shared state behind one sleeping lock, condition
//! variables with Mesa semantics, carefully ordered signalling. The rest
//! of a kernel -- scheduler, MMU, loader, file system -- enters through
//! the collaborator traits in the hal, vm, and fs modules.

#![warn(rust_2018_idioms)]
#![warn(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod exec;
pub mod fcntl;
pub mod fs;
pub mod hal;
pub mod intersection;
pub mod kernel;
pub mod lock;
pub mod param;
pub mod printf;
pub mod proc;
pub mod syscall;
pub mod vm;

pub use error::{KernelError, Result};
pub use kernel::Kernel;
