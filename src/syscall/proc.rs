use std::sync::Arc;

use crate::error::{KernelError, Result};
use crate::hal::Trapframe;
use crate::kdebug;
use crate::kernel::Kernel;
use crate::printf::DbFlags;
use crate::proc::{CurrentProc, Pid, Proc};
use crate::syscall::mkwait_exit;
use crate::vm::UVAddr;

impl Kernel {
    /// Create a process, copying the parent. Returns the child's pid; the
    /// platform arranges for the child itself to see 0.
    ///
    /// Every step after the child is linked into the table must either
    /// succeed or undo the linking before the table lock is released, so
    /// a failed fork leaves no trace.
    pub fn sys_fork(&self, proc: &CurrentProc<'_>, tf: &Trapframe) -> Result<Pid> {
        kdebug!(DbFlags::SYSCALL, "syscall: fork() pid {}", proc.pid());

        // The child process object, named after the parent, with a copy of
        // the parent's address space. Until the table knows about it, an
        // early return reclaims both by drop.
        let child = Proc::new(proc.name());
        let memory = proc.with_addrspace(|space| space.copy())?;
        let _ = child.set_addrspace(memory);

        let parent_pid = proc.pid();
        let mut table = self.procs().lock();
        let child_pid = table.add(&child)?;
        // From here on the undo action runs on any early exit and severs
        // exactly what add and link recorded.
        let mut table = scopeguard::guard(table, |mut table| {
            table.unlink(parent_pid, child_pid);
            table
                .remove(child_pid)
                .expect("fork: rolling back a child that was just added");
        });
        table.link(parent_pid, child_pid);

        // Hand the child its own copy of the trapframe and a thread to run
        // on. The table lock is still held, so even a child that runs
        // immediately cannot observe a half-linked table.
        self.hal()
            .thread_fork(child.name(), Arc::clone(&child), Box::new(tf.clone()))?;

        drop(scopeguard::ScopeGuard::into_inner(table));
        Ok(child_pid)
    }

    /// Terminate the current process, publishing `exitcode` to waitpid.
    /// The entry may be reclaimed before this returns; the caller must
    /// only let the current thread die afterwards.
    pub fn sys_exit(&self, proc: &CurrentProc<'_>, exitcode: i32) {
        kdebug!(
            DbFlags::SYSCALL,
            "syscall: _exit({}) pid {}",
            exitcode,
            proc.pid()
        );
        let pid = proc.pid();
        let mut table = self.procs().lock();

        let entry = table
            .get(pid)
            .expect("exit: no table entry for the current process");
        assert!(!entry.isdead(), "exit: exiting twice");
        let parent = entry.parent();
        let children = entry.children().to_vec();

        // Drop the reference on the parent first; a zombie parent whose
        // last relative leaves is reclaimed right here.
        if let Some(parent_pid) = parent {
            table.unref(parent_pid);
        }

        // Then the references on the children, reclaiming dead ones.
        for child_pid in children {
            table.unref(child_pid);
        }

        // Publish the exit and wake every waiter. An orphan that no one
        // references disappears immediately.
        table
            .get_mut(pid)
            .expect("exit: entry vanished underneath its owner")
            .publish_exit(exitcode);
        table.broadcast_for(pid).expect("exit: broadcast");
        if table.get(pid).expect("exit: entry").numref() == 0 {
            table.remove(pid).expect("exit: reaping an orphan");
        }
        drop(table);

        // The user image goes now; the thread itself is the platform's to
        // reclaim after we return.
        if let Some(space) = proc.proc().take_addrspace() {
            space.deactivate();
        }
    }

    /// Wait for the child `pid` to exit, store the encoded status word
    /// through `status`, and reap the child. Returns the pid waited on.
    pub fn sys_waitpid(
        &self,
        proc: &CurrentProc<'_>,
        pid: Pid,
        status: UVAddr,
        options: i32,
    ) -> Result<Pid> {
        kdebug!(
            DbFlags::SYSCALL,
            "syscall: waitpid({}) pid {}",
            pid,
            proc.pid()
        );
        if status.is_null() {
            return Err(KernelError::BadAddress);
        }
        if options != 0 {
            return Err(KernelError::InvalidArgument);
        }

        let exitcode = {
            let mut table = self.procs().lock();
            table.wait_on(pid, proc.pid())?;
            let exitcode = table.get(pid)?.exitcode();
            // Reap in the same critical section as the rendezvous: the
            // edge to the child goes, and with it the child's last
            // reference, so a second waitpid for this pid reports
            // NotFound.
            table.unlink(proc.pid(), pid);
            exitcode
        };

        // The copy can fault; by then the child is gone either way.
        proc.copy_out(status, &mkwait_exit(exitcode))?;
        Ok(pid)
    }

    /// Return the current process's pid. The pid never changes once the
    /// table assigns it, so no lock is taken.
    pub fn sys_getpid(&self, proc: &CurrentProc<'_>) -> Pid {
        proc.pid()
    }
}
