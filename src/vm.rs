//! The user-memory boundary: user virtual addresses, the address-space
//! collaborator trait, and typed copy helpers. The cores never walk page
//! tables; they hand byte slices across this trait and let the platform
//! decide what a fault looks like.

use core::ops::Add;

use zerocopy::{AsBytes, FromBytes};

use crate::error::Result;

/// A user virtual address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct UVAddr(usize);

impl UVAddr {
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    pub const fn into_usize(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Add<usize> for UVAddr {
    type Output = Self;

    fn add(self, rhs: usize) -> Self {
        Self(self.0 + rhs)
    }
}

/// A process's user address space. Supplied by the platform; the cores use
/// it for fork-time duplication, exec-time image construction, and the
/// copyin/copyout traffic of waitpid and execv.
pub trait AddrSpace: Send {
    /// Duplicates this address space, contents included, as fork needs.
    fn copy(&self) -> Result<Box<dyn AddrSpace>>;

    /// Makes this address space the one user-mode translation goes
    /// through. A no-op on platforms without address translation.
    fn activate(&self) {}

    /// Counterpart of `activate` for an address space about to go away.
    fn deactivate(&self) {}

    /// Reserves the user stack region and returns its initial top, aligned
    /// to `ARG_ALIGN`.
    fn define_stack(&mut self) -> Result<UVAddr>;

    /// Copies `src` into user memory at `dst`. Fails with `BadAddress` if
    /// the range does not fit the address space.
    fn copy_out_bytes(&mut self, dst: UVAddr, src: &[u8]) -> Result<()>;

    /// Fills `dst` from user memory at `src`.
    fn copy_in_bytes(&self, dst: &mut [u8], src: UVAddr) -> Result<()>;

    /// Copies a null-terminated string from user memory into `dst` and
    /// returns its length, terminator excluded. Fails with `NameTooLong`
    /// when no terminator shows up within `dst`.
    fn copy_in_str(&self, dst: &mut [u8], src: UVAddr) -> Result<usize>;
}

/// Copies a `T` out to user memory at `dst`.
pub fn copy_out<T: AsBytes>(space: &mut dyn AddrSpace, dst: UVAddr, src: &T) -> Result<()> {
    space.copy_out_bytes(dst, src.as_bytes())
}

/// Fetches a `T` from user memory at `src`.
pub fn copy_in<T: AsBytes + FromBytes>(space: &dyn AddrSpace, src: UVAddr) -> Result<T> {
    let mut value = T::new_zeroed();
    space.copy_in_bytes(value.as_bytes_mut(), src)?;
    Ok(value)
}

