//! The kernel aggregate: the process table plus the platform it runs on.
//! Syscall adapters hang off this type; see the syscall and exec modules.

use crate::hal::Hal;
use crate::proc::ProcTable;

pub struct Kernel {
    procs: ProcTable,
    hal: Box<dyn Hal>,
}

impl Kernel {
    pub fn new(hal: Box<dyn Hal>) -> Self {
        Self {
            procs: ProcTable::new(),
            hal,
        }
    }

    /// The process table.
    pub fn procs(&self) -> &ProcTable {
        &self.procs
    }

    pub(crate) fn hal(&self) -> &dyn Hal {
        &*self.hal
    }
}
