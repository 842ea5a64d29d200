use static_assertions::const_assert;

use crate::proc::Pid;

/// Smallest pid handed out by the process table.
pub const PID_MIN: Pid = 1;

/// Largest pid handed out by the process table. Modest, which keeps the
/// dense slot vector dense and pid-space exhaustion reachable in tests.
pub const PID_MAX: Pid = 4096;

/// Maximum file path name, including the terminating null.
pub const PATH_MAX: usize = 1024;

/// Maximum total bytes of exec arguments, terminators included.
pub const ARG_MAX: usize = 64 * 1024;

/// Alignment of argument strings and the argv array on the user stack.
pub const ARG_ALIGN: usize = 8;

// Slot 0 of the process table is never handed out.
const_assert!(PID_MIN >= 1);
const_assert!(PID_MAX > PID_MIN);
const_assert!(ARG_ALIGN.is_power_of_two());
