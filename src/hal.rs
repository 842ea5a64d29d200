//! The platform boundary: thread creation, address-space allocation, and
//! the file system. A real port backs this with its scheduler and MMU; the
//! test suite backs it with plain threads over byte buffers.

use std::sync::Arc;

use crate::error::Result;
use crate::fs::Vfs;
use crate::proc::Proc;
use crate::vm::AddrSpace;

/// Architectural snapshot of user-mode CPU state. The cores copy it around
/// whole; only platform code looks inside. The platform arranges for fork
/// to return 0 in the child by editing the child's copy.
#[derive(Clone, Debug, Default)]
pub struct Trapframe {
    pub regs: [usize; 32],
}

/// Platform services the syscall adapters depend on.
pub trait Hal: Send + Sync {
    /// Creates an empty address space.
    fn as_create(&self) -> Result<Box<dyn AddrSpace>>;

    /// Starts a kernel thread that enters `proc` in user mode with `tf` as
    /// its register file. Called with the process-table lock held, so the
    /// new thread cannot observe a half-linked table.
    fn thread_fork(&self, name: &str, proc: Arc<Proc>, tf: Box<Trapframe>) -> Result<()>;

    /// The file system execv resolves programs against.
    fn vfs(&self) -> &dyn Vfs;
}
