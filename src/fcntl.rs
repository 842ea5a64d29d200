use bitflags::bitflags;

bitflags! {
    /// Open flags passed across the VFS boundary.
    pub struct FcntlFlags: i32 {
        const O_RDONLY = 0;
        const O_WRONLY = 0x1;
        const O_RDWR = 0x2;
        const O_CREATE = 0x200;
    }
}
