//! Process objects and the process table.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use cstr_core::CString;
use zerocopy::{AsBytes, FromBytes};

use crate::error::{KernelError, Result};
use crate::vm::{self, AddrSpace, UVAddr};

mod table;

pub use table::{Entries, ProcTable, ProcTableEntry, TableGuard};

pub type Pid = i32;

/// A process object. The table keeps one `Arc` per live or zombie process;
/// the scheduler side of the platform holds the others.
pub struct Proc {
    /// Process ID. Assigned once, by the table, when the process is added;
    /// immutable afterwards, so readers need no lock.
    pid: AtomicI32,

    /// Process name (debugging).
    name: String,

    /// The user address space, absent until one is attached. Only the
    /// owning process swaps it (execv, exit), so the lock is never
    /// contended for long.
    addrspace: spin::Mutex<Option<Box<dyn AddrSpace>>>,
}

impl Proc {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            pid: AtomicI32::new(0),
            name: name.to_string(),
            addrspace: spin::Mutex::new(None),
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid.load(Ordering::Acquire)
    }

    pub(crate) fn set_pid(&self, pid: Pid) {
        self.pid.store(pid, Ordering::Release);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches `space` and returns the one it displaces.
    pub fn set_addrspace(&self, space: Box<dyn AddrSpace>) -> Option<Box<dyn AddrSpace>> {
        self.addrspace.lock().replace(space)
    }

    /// Detaches the address space, as exit does before teardown.
    pub fn take_addrspace(&self) -> Option<Box<dyn AddrSpace>> {
        self.addrspace.lock().take()
    }

    /// Runs `f` on the attached address space. Fails with `BadAddress`
    /// when the process has none.
    pub fn with_addrspace<U>(
        &self,
        f: impl FnOnce(&mut dyn AddrSpace) -> Result<U>,
    ) -> Result<U> {
        let mut guard = self.addrspace.lock();
        let space = guard.as_mut().ok_or(KernelError::BadAddress)?;
        f(&mut **space)
    }
}

/// The process a syscall runs on behalf of. Wraps the platform's notion of
/// "current" and carries the copyin/copyout helpers the adapters use.
pub struct CurrentProc<'p> {
    proc: &'p Arc<Proc>,
}

impl<'p> CurrentProc<'p> {
    pub fn new(proc: &'p Arc<Proc>) -> Self {
        Self { proc }
    }

    pub fn proc(&self) -> &'p Arc<Proc> {
        self.proc
    }

    pub fn pid(&self) -> Pid {
        self.proc.pid()
    }

    pub fn name(&self) -> &str {
        self.proc.name()
    }

    /// Fetches a `T` at `src` from the current process.
    pub fn copy_in<T: AsBytes + FromBytes>(&self, src: UVAddr) -> Result<T> {
        self.proc.with_addrspace(|space| vm::copy_in(space, src))
    }

    /// Copies a `T` out to `dst` in the current process.
    pub fn copy_out<T: AsBytes>(&self, dst: UVAddr, value: &T) -> Result<()> {
        self.proc
            .with_addrspace(|space| vm::copy_out(space, dst, value))
    }

    /// Fetches the null-terminated string at `src`, at most `max` bytes
    /// including the terminator.
    pub fn copy_in_str(&self, src: UVAddr, max: usize) -> Result<CString> {
        self.proc.with_addrspace(|space| {
            let mut buf = vec![0u8; max];
            let len = space.copy_in_str(&mut buf, src)?;
            buf.truncate(len);
            Ok(CString::new(buf).expect("copy_in_str: interior null"))
        })
    }

    pub fn with_addrspace<U>(
        &self,
        f: impl FnOnce(&mut dyn AddrSpace) -> Result<U>,
    ) -> Result<U> {
        self.proc.with_addrspace(f)
    }
}
