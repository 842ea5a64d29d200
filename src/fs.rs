//! The VFS boundary consumed by execv. Path resolution, file formats, and
//! the loader live on the far side; the cores see an open-load-close
//! protocol and nothing else.

use cstr_core::CStr;

use crate::error::Result;
use crate::fcntl::FcntlFlags;
use crate::vm::AddrSpace;

/// An open file. Dropping it closes it.
pub trait Vnode: Send {
    /// Loads the executable image into `space` and returns its entry
    /// point. Fails with `NotExecutable` for files the loader rejects.
    fn load_elf(&mut self, space: &mut dyn AddrSpace) -> Result<usize>;
}

/// The file system execv resolves programs against.
pub trait Vfs: Send + Sync {
    /// Resolves `path` and opens it. Fails with `NoSuchFile` when the path
    /// does not resolve.
    fn open(&self, path: &CStr, flags: FcntlFlags) -> Result<Box<dyn Vnode>>;
}
