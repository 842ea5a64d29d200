//! The process table: a pid-indexed slot vector of entries carrying the
//! parent/child graph, the exit rendezvous state, and the reference counts
//! that decide when an entry may be reclaimed.
//!
//! One sleeping lock guards the whole table. Every entry field, every
//! structural mutation, and every exit-condvar signal happens under it;
//! waiters sleep against it with Mesa re-check loops.

use core::fmt;
use std::sync::Arc;

use crate::error::{KernelError, Result};
use crate::kdebug;
use crate::lock::{Condvar, Guard, RawSleeplock, Sleeplock, SleeplockGuard};
use crate::param::{PID_MAX, PID_MIN};
use crate::printf::DbFlags;
use crate::proc::{Pid, Proc};

/// One live or zombie process.
pub struct ProcTableEntry {
    /// Pid, equal to the index of the slot holding this entry.
    pid: Pid,

    /// The process object this entry stands for.
    proc: Arc<Proc>,

    /// The process has exited and `exitcode` is meaningful.
    isdead: bool,

    exitcode: i32,

    /// Waiters sleep here, against the table lock, until `isdead`. Shared
    /// so a waiter can keep it across the sleep while the table is
    /// borrowed mutably.
    exitcv: Arc<Condvar>,

    /// Pid of the parent entry; `None` for the boot process.
    parent: Option<Pid>,

    /// Pids of the children, in fork order. Entries of children reaped by
    /// waitpid are removed; a zombie's list may keep pids of children that
    /// exited later, and nothing reads it after the owner's exit.
    children: Vec<Pid>,

    /// Live relatives (parent plus still-live children) whose edges still
    /// reference this entry. The entry is reclaimed exactly when
    /// `isdead && numref == 0`.
    numref: u32,
}

impl ProcTableEntry {
    fn new(proc: Arc<Proc>, pid: Pid) -> Self {
        Self {
            pid,
            proc,
            isdead: false,
            exitcode: 0,
            exitcv: Arc::new(Condvar::new()),
            parent: None,
            children: Vec::new(),
            numref: 0,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn proc(&self) -> &Arc<Proc> {
        &self.proc
    }

    pub fn isdead(&self) -> bool {
        self.isdead
    }

    /// Meaningful only once `isdead`.
    pub fn exitcode(&self) -> i32 {
        self.exitcode
    }

    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    pub fn children(&self) -> &[Pid] {
        &self.children
    }

    pub fn numref(&self) -> u32 {
        self.numref
    }

    /// Marks the entry dead and records the code waiters will read.
    pub(crate) fn publish_exit(&mut self, exitcode: i32) {
        self.isdead = true;
        self.exitcode = exitcode;
    }
}

impl fmt::Debug for ProcTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcTableEntry")
            .field("pid", &self.pid)
            .field("isdead", &self.isdead)
            .field("exitcode", &self.exitcode)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("numref", &self.numref)
            .finish()
    }
}

/// The slot vector. Slot `i` holds the entry whose pid is `i` or nothing;
/// slot 0 is never handed out.
pub struct Entries {
    slots: Vec<Option<ProcTableEntry>>,
}

impl Entries {
    fn new() -> Self {
        Self { slots: vec![None] }
    }

    fn slot_index(pid: Pid) -> Result<usize> {
        if pid < PID_MIN || pid > PID_MAX {
            return Err(KernelError::OutOfRange);
        }
        Ok(pid as usize)
    }

    /// Looks an entry up by pid.
    pub fn get(&self, pid: Pid) -> Result<&ProcTableEntry> {
        self.slots
            .get(Self::slot_index(pid)?)
            .and_then(|slot| slot.as_ref())
            .ok_or(KernelError::NotFound)
    }

    pub(crate) fn get_mut(&mut self, pid: Pid) -> Result<&mut ProcTableEntry> {
        self.slots
            .get_mut(Self::slot_index(pid)?)
            .and_then(|slot| slot.as_mut())
            .ok_or(KernelError::NotFound)
    }

    /// Adds a process and returns its pid, which is also stored into the
    /// process object. The lowest vacant slot wins, so reaped pids are
    /// reused deterministically; a fresh slot is appended only when no
    /// vacancy exists, and `NoProcSlots` reports an exhausted pid space.
    pub fn add(&mut self, proc: &Arc<Proc>) -> Result<Pid> {
        let vacancy = (PID_MIN as usize..self.slots.len()).find(|&i| self.slots[i].is_none());
        let pid = match vacancy {
            Some(index) => index as Pid,
            None => {
                let pid = self.slots.len() as Pid;
                if pid > PID_MAX {
                    return Err(KernelError::NoProcSlots);
                }
                self.slots.push(None);
                pid
            }
        };
        proc.set_pid(pid);
        self.slots[pid as usize] = Some(ProcTableEntry::new(Arc::clone(proc), pid));
        kdebug!(DbFlags::PROC, "proc table: add pid {}", pid);
        Ok(pid)
    }

    /// Destroys the entry and frees its pid for reuse. The caller must
    /// have severed every edge first.
    pub fn remove(&mut self, pid: Pid) -> Result<()> {
        let slot = self
            .slots
            .get_mut(Self::slot_index(pid)?)
            .ok_or(KernelError::NotFound)?;
        let entry = slot.as_ref().ok_or(KernelError::NotFound)?;
        assert!(entry.numref == 0, "remove: pid {} is still referenced", pid);
        *slot = None;
        kdebug!(DbFlags::PROC, "proc table: remove pid {}", pid);
        Ok(())
    }

    /// Records the parent/child edge both ways and accounts a reference in
    /// each direction.
    pub(crate) fn link(&mut self, parent: Pid, child: Pid) {
        {
            let entry = self.get_mut(child).expect("link: child entry");
            assert!(entry.parent.is_none(), "link: child already has a parent");
            entry.parent = Some(parent);
            entry.numref += 1;
        }
        let entry = self.get_mut(parent).expect("link: parent entry");
        entry.children.push(child);
        entry.numref += 1;
    }

    /// Severs the parent/child edge and drops the parent's reference to
    /// the child, reaping the child if that was the last one.
    pub(crate) fn unlink(&mut self, parent: Pid, child: Pid) {
        let child_is_live = !self.get(child).expect("unlink: child entry").isdead;
        {
            let entry = self.get_mut(parent).expect("unlink: parent entry");
            let index = entry
                .children
                .iter()
                .position(|&pid| pid == child)
                .expect("unlink: edge is not recorded");
            let _ = entry.children.remove(index);
            // A dead child already dropped its reference to the parent
            // when it exited.
            if child_is_live {
                assert!(entry.numref > 0, "unlink: parent refcount underflow");
                entry.numref -= 1;
            }
        }
        self.unref(child);
    }

    /// Drops one reference and reclaims the entry once it is both dead and
    /// unreferenced.
    pub(crate) fn unref(&mut self, pid: Pid) {
        let entry = self.get_mut(pid).expect("unref: no entry");
        assert!(entry.numref > 0, "unref: refcount underflow");
        entry.numref -= 1;
        if entry.isdead && entry.numref == 0 {
            self.remove(pid).expect("unref: reaping");
        }
    }

    /// Wakes every waiter sleeping on the entry's exit. Called by the
    /// process identified by `pid` while publishing its own death.
    pub fn broadcast_for(&self, pid: Pid) -> Result<()> {
        self.get(pid)?.exitcv.broadcast();
        Ok(())
    }

    /// Consistency audit, in the tradition of kernels that would rather
    /// panic than run on a corrupt table. Verifies that every entry sits
    /// in the slot its pid names, that live entries' edges are mirrored,
    /// and that every refcount equals the number of live entries whose
    /// edges reference it.
    pub fn check(&self) {
        for (index, slot) in self.slots.iter().enumerate() {
            let entry = match slot {
                Some(entry) => entry,
                None => continue,
            };
            assert_eq!(entry.pid as usize, index, "check: pid disagrees with slot");
            assert!(
                entry.pid >= PID_MIN && entry.pid <= PID_MAX,
                "check: pid {} out of range",
                entry.pid
            );

            if !entry.isdead {
                if let Some(parent) = entry.parent {
                    let parent = self.get(parent).expect("check: live entry, absent parent");
                    assert!(
                        parent.children.contains(&entry.pid),
                        "check: parent of {} does not record the edge",
                        entry.pid
                    );
                }
                for &child in &entry.children {
                    let child = self.get(child).expect("check: live entry, absent child");
                    assert_eq!(
                        child.parent,
                        Some(entry.pid),
                        "check: child of {} does not record the edge",
                        entry.pid
                    );
                }
            }

            let expected = self.references_to(entry.pid);
            assert_eq!(
                entry.numref, expected,
                "check: pid {} has numref {} but {} referencing entries",
                entry.pid, entry.numref, expected
            );
        }
    }

    /// Number of live entries whose parent or child edges point at `pid`.
    fn references_to(&self, pid: Pid) -> u32 {
        let mut count = 0;
        for slot in self.slots.iter().flatten() {
            if slot.isdead {
                continue;
            }
            if slot.parent == Some(pid) {
                count += 1;
            }
            if slot.children.contains(&pid) {
                count += 1;
            }
        }
        count
    }
}

/// The table: the slot vector behind its lock.
pub struct ProcTable {
    entries: Sleeplock<Entries>,
}

/// Guards of the table lock. Structural operations live on `Entries` and
/// are reached through the guard; the operations that sleep or signal live
/// here, on the guard itself.
pub type TableGuard<'s> = SleeplockGuard<'s, Entries>;

impl ProcTable {
    pub fn new() -> Self {
        Self {
            entries: Sleeplock::new("proc_table", Entries::new()),
        }
    }

    /// Acquires the table lock. Multi-step invariants (fork's linking,
    /// exit's reap cascade) compose under a single guard.
    pub fn lock(&self) -> TableGuard<'_> {
        self.entries.lock()
    }

    /// Adds a process under a lock of its own; see `Entries::add`.
    pub fn add(&self, proc: &Arc<Proc>) -> Result<Pid> {
        self.lock().add(proc)
    }

    /// Runs the consistency audit under the table lock.
    pub fn check(&self) {
        self.lock().check();
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Guard<'_, RawSleeplock, Entries> {
    /// Sleeps until the entry named by `pid` has published its exit.
    /// `caller` must be the entry's parent. The table lock is released
    /// while sleeping; the loop re-checks `isdead` after every wakeup.
    pub fn wait_on(&mut self, pid: Pid, caller: Pid) -> Result<()> {
        loop {
            let entry = self.get(pid)?;
            if entry.parent != Some(caller) {
                return Err(KernelError::NoSuchChild);
            }
            if entry.isdead {
                return Ok(());
            }
            let exitcv = Arc::clone(&entry.exitcv);
            exitcv.wait(self);
        }
    }
}
