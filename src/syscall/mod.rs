//! Syscall adapters over the process table. Each adapter composes the
//! table operations with the platform collaborators and owns the
//! multi-step invariants that must hold under one critical section. The
//! trap layer above turns `KernelError` into the negative-errno return
//! convention; execv lives in the exec module.

mod proc;

/// The wait status word for a voluntary exit: exit code in the high byte,
/// low bits reserved for signalled exits, which this kernel does not have.
pub fn mkwait_exit(exitcode: i32) -> i32 {
    exitcode << 8
}
