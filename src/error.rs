//! Error kinds shared by the process table, the syscall adapters, and the
//! collaborator traits. Syscalls surface these to userland as conventional
//! errno values through the trap layer.

use core::fmt;

/// Everything that can go wrong inside the cores or at a collaborator
/// boundary. `_exit` and the intersection operations cannot fail; their
/// invariants are assertions instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// Null pointer where one is required, or non-zero waitpid options.
    InvalidArgument,
    /// A user pointer did not map to valid user memory.
    BadAddress,
    /// Pid outside `[PID_MIN, PID_MAX]`.
    OutOfRange,
    /// No live or zombie entry holds that pid.
    NotFound,
    /// The pid exists but is not a child of the caller.
    NoSuchChild,
    /// A collaborator ran out of memory.
    OutOfMemory,
    /// Every pid in `[PID_MIN, PID_MAX]` is taken.
    NoProcSlots,
    /// exec argument bytes exceed `ARG_MAX`.
    TooBig,
    /// A path or argument string exceeds its length bound.
    NameTooLong,
    /// The executable path does not resolve.
    NoSuchFile,
    /// The file is not a loadable executable.
    NotExecutable,
}

pub type Result<T> = core::result::Result<T, KernelError>;

impl KernelError {
    /// The errno this kind travels as through the syscall return convention.
    pub fn errno(self) -> i32 {
        match self {
            KernelError::InvalidArgument => 22, // EINVAL
            KernelError::BadAddress => 14,      // EFAULT
            KernelError::OutOfRange => 33,      // EDOM
            KernelError::NotFound => 3,         // ESRCH
            KernelError::NoSuchChild => 10,     // ECHILD
            KernelError::OutOfMemory => 12,     // ENOMEM
            KernelError::NoProcSlots => 11,     // EAGAIN
            KernelError::TooBig => 7,           // E2BIG
            KernelError::NameTooLong => 36,     // ENAMETOOLONG
            KernelError::NoSuchFile => 2,       // ENOENT
            KernelError::NotExecutable => 8,    // ENOEXEC
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            KernelError::InvalidArgument => "invalid argument",
            KernelError::BadAddress => "bad user address",
            KernelError::OutOfRange => "pid out of range",
            KernelError::NotFound => "no such process",
            KernelError::NoSuchChild => "not a child of the caller",
            KernelError::OutOfMemory => "out of memory",
            KernelError::NoProcSlots => "process table full",
            KernelError::TooBig => "argument list too long",
            KernelError::NameTooLong => "name too long",
            KernelError::NoSuchFile => "no such file",
            KernelError::NotExecutable => "exec format error",
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (errno {})", self.as_str(), self.errno())
    }
}

impl std::error::Error for KernelError {}
