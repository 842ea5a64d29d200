//! execv: replace the current process image with a program loaded from the
//! file system, passing it a marshalled argument vector. The loader and
//! the address space are collaborators; what lives here is the ordering
//! contract (copy everything in, build the image aside, install last) and
//! the user-stack layout of argv.

use core::mem;

use cstr_core::CString;
use itertools::izip;
use zerocopy::AsBytes;

use crate::error::{KernelError, Result};
use crate::fcntl::FcntlFlags;
use crate::kdebug;
use crate::kernel::Kernel;
use crate::param::{ARG_ALIGN, ARG_MAX, PATH_MAX};
use crate::printf::DbFlags;
use crate::proc::CurrentProc;
use crate::vm::UVAddr;

/// What the trap layer needs to warp into the fresh image. execv does not
/// return to the old program; on success the caller hands these to
/// enter_new_process and never comes back.
#[derive(Debug)]
pub struct UserImage {
    /// First instruction of the loaded program.
    pub entrypoint: usize,

    /// Initial user stack pointer.
    pub stackptr: UVAddr,

    /// Number of non-null argv entries.
    pub argc: usize,

    /// User address of the argv pointer array.
    pub argv: UVAddr,
}

const fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

impl Kernel {
    /// Replace the current image with the program at `path`, passing the
    /// null-terminated pointer array at `argv`.
    pub fn sys_execv(
        &self,
        proc: &CurrentProc<'_>,
        path: UVAddr,
        argv: UVAddr,
    ) -> Result<UserImage> {
        if path.is_null() || argv.is_null() {
            return Err(KernelError::BadAddress);
        }
        let path = proc.copy_in_str(path, PATH_MAX)?;
        kdebug!(
            DbFlags::SYSCALL,
            "syscall: execv({:?}) pid {}",
            path,
            proc.pid()
        );

        // Bring every argument string into kernel buffers before anything
        // touches the address space; the user pointers die with the old
        // image. The pointer array counts a terminating null, so argc is
        // its length minus one.
        let mut args: Vec<CString> = Vec::new();
        let mut arg_bytes = 0usize;
        loop {
            let slot = argv + args.len() * mem::size_of::<usize>();
            let ptr = proc.copy_in::<usize>(slot)?;
            if ptr == 0 {
                break;
            }
            let arg = proc.copy_in_str(UVAddr::new(ptr), ARG_MAX)?;
            arg_bytes += arg.as_bytes_with_nul().len();
            if arg_bytes > ARG_MAX {
                return Err(KernelError::TooBig);
            }
            args.push(arg);
        }
        let argc = args.len();

        // Open and load the replacement image off to the side. A failure
        // anywhere in here leaves the old image running and undisturbed.
        let mut vnode = self.hal().vfs().open(&path, FcntlFlags::O_RDONLY)?;
        let mut memory = self.hal().as_create()?;
        let entrypoint = vnode.load_elf(&mut *memory)?;
        drop(vnode);
        let stacktop = memory.define_stack()?;

        // Argument strings go below the stack top in reverse order, each
        // padded out to ARG_ALIGN, which leaves argv[0] lowest. ustack[i]
        // collects the user address of argument i, with one slot left zero
        // for the terminator.
        let mut sp = stacktop.into_usize();
        let mut ustack = vec![0usize; argc + 1];
        for (arg, slot) in izip!(args.iter().rev(), ustack[..argc].iter_mut().rev()) {
            let bytes = arg.as_bytes_with_nul();
            sp -= round_up(bytes.len(), ARG_ALIGN);
            memory.copy_out_bytes(UVAddr::new(sp), bytes)?;
            *slot = sp;
        }
        assert!(sp % ARG_ALIGN == 0, "execv: unaligned argument block");

        // The argv array itself sits right below the strings.
        sp -= (argc + 1) * mem::size_of::<usize>();
        let argv_base = UVAddr::new(sp);
        memory.copy_out_bytes(argv_base, ustack.as_bytes())?;

        // Commit: install the new image and release the old one. Nothing
        // past this point can fail.
        if let Some(old) = proc.proc().set_addrspace(memory) {
            old.deactivate();
        }
        proc.with_addrspace(|space| {
            space.activate();
            Ok(())
        })
        .expect("execv: image was just installed");

        Ok(UserImage {
            entrypoint,
            stackptr: argv_base,
            argc,
            argv: argv_base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_is_identity_on_aligned_sizes() {
        assert_eq!(round_up(0, 8), 0);
        assert_eq!(round_up(8, 8), 8);
        assert_eq!(round_up(9, 8), 16);
        assert_eq!(round_up(15, 8), 16);
    }
}
