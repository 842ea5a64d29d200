//! Test doubles for the platform boundary: address spaces over plain byte
//! buffers, a path-to-entrypoint file system, and a HAL that runs forked
//! children on ordinary threads.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

use cstr_core::CStr;
use ksynch::error::{KernelError, Result};
use ksynch::fcntl::FcntlFlags;
use ksynch::fs::{Vfs, Vnode};
use ksynch::hal::{Hal, Trapframe};
use ksynch::proc::Proc;
use ksynch::vm::{AddrSpace, UVAddr};
use ksynch::Kernel;

/// Size of every fake user address space.
pub const USER_SIZE: usize = 256 * 1024;

/// A user address space that is just a byte buffer. The buffer sits
/// behind an Arc so a test can keep inspecting an image after it is
/// installed into a process.
pub struct FakeAddrSpace {
    mem: Arc<Mutex<Vec<u8>>>,
}

impl FakeAddrSpace {
    pub fn new(size: usize) -> Self {
        Self {
            mem: Arc::new(Mutex::new(vec![0; size])),
        }
    }

    pub fn contents(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.mem)
    }
}

impl AddrSpace for FakeAddrSpace {
    fn copy(&self) -> Result<Box<dyn AddrSpace>> {
        let contents = self.mem.lock().unwrap().clone();
        Ok(Box::new(FakeAddrSpace {
            mem: Arc::new(Mutex::new(contents)),
        }))
    }

    fn define_stack(&mut self) -> Result<UVAddr> {
        Ok(UVAddr::new(self.mem.lock().unwrap().len()))
    }

    fn copy_out_bytes(&mut self, dst: UVAddr, src: &[u8]) -> Result<()> {
        let mut mem = self.mem.lock().unwrap();
        let start = dst.into_usize();
        let end = start.checked_add(src.len()).ok_or(KernelError::BadAddress)?;
        if end > mem.len() {
            return Err(KernelError::BadAddress);
        }
        mem[start..end].copy_from_slice(src);
        Ok(())
    }

    fn copy_in_bytes(&self, dst: &mut [u8], src: UVAddr) -> Result<()> {
        let mem = self.mem.lock().unwrap();
        let start = src.into_usize();
        let end = start.checked_add(dst.len()).ok_or(KernelError::BadAddress)?;
        if end > mem.len() {
            return Err(KernelError::BadAddress);
        }
        dst.copy_from_slice(&mem[start..end]);
        Ok(())
    }

    fn copy_in_str(&self, dst: &mut [u8], src: UVAddr) -> Result<usize> {
        let mem = self.mem.lock().unwrap();
        let start = src.into_usize();
        for (i, slot) in dst.iter_mut().enumerate() {
            let byte = *mem.get(start + i).ok_or(KernelError::BadAddress)?;
            *slot = byte;
            if byte == 0 {
                return Ok(i);
            }
        }
        Err(KernelError::NameTooLong)
    }
}

/// Path-to-entrypoint "file system".
pub struct FakeVfs {
    programs: Mutex<HashMap<String, usize>>,
}

impl FakeVfs {
    fn new() -> Self {
        Self {
            programs: Mutex::new(HashMap::new()),
        }
    }

    fn install(&self, path: &str, entrypoint: usize) {
        let _ = self
            .programs
            .lock()
            .unwrap()
            .insert(path.to_string(), entrypoint);
    }
}

impl Vfs for FakeVfs {
    fn open(&self, path: &CStr, _flags: FcntlFlags) -> Result<Box<dyn Vnode>> {
        let key = path.to_str().map_err(|_| KernelError::NoSuchFile)?;
        let entrypoint = self
            .programs
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .ok_or(KernelError::NoSuchFile)?;
        Ok(Box::new(FakeVnode { entrypoint }))
    }
}

struct FakeVnode {
    entrypoint: usize,
}

impl Vnode for FakeVnode {
    fn load_elf(&mut self, _space: &mut dyn AddrSpace) -> Result<usize> {
        Ok(self.entrypoint)
    }
}

type ChildBody = Box<dyn FnOnce(Arc<Kernel>, Arc<Proc>) + Send>;

struct HalInner {
    kernel: Mutex<Option<Weak<Kernel>>>,
    spawned: Mutex<Vec<Arc<Proc>>>,
    bodies: Mutex<VecDeque<ChildBody>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    fail_thread_fork: AtomicBool,
    last_memory: Mutex<Option<Arc<Mutex<Vec<u8>>>>>,
    vfs: FakeVfs,
}

/// The test platform. Forked children run on `std::thread` threads when a
/// body has been queued for them; otherwise the child is only recorded
/// and the test drives it synchronously.
#[derive(Clone)]
pub struct TestHal {
    inner: Arc<HalInner>,
}

impl TestHal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HalInner {
                kernel: Mutex::new(None),
                spawned: Mutex::new(Vec::new()),
                bodies: Mutex::new(VecDeque::new()),
                handles: Mutex::new(Vec::new()),
                fail_thread_fork: AtomicBool::new(false),
                last_memory: Mutex::new(None),
                vfs: FakeVfs::new(),
            }),
        }
    }

    pub fn bind(&self, kernel: &Arc<Kernel>) {
        *self.inner.kernel.lock().unwrap() = Some(Arc::downgrade(kernel));
    }

    /// Queues the body the next forked child thread will run.
    pub fn queue_body(&self, body: impl FnOnce(Arc<Kernel>, Arc<Proc>) + Send + 'static) {
        self.inner.bodies.lock().unwrap().push_back(Box::new(body));
    }

    /// Makes the next thread_fork fail, as a thread-creation failure
    /// would.
    pub fn fail_next_thread_fork(&self) {
        self.inner.fail_thread_fork.store(true, Ordering::SeqCst);
    }

    /// Every process handed to thread_fork so far, fork order.
    pub fn spawned(&self) -> Vec<Arc<Proc>> {
        self.inner.spawned.lock().unwrap().clone()
    }

    pub fn install_program(&self, path: &str, entrypoint: usize) {
        self.inner.vfs.install(path, entrypoint);
    }

    /// The backing buffer of the most recently created address space.
    pub fn last_memory(&self) -> Arc<Mutex<Vec<u8>>> {
        self.inner
            .last_memory
            .lock()
            .unwrap()
            .clone()
            .expect("no address space was created")
    }

    pub fn join_all(&self) {
        let handles: Vec<_> = self.inner.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

impl Hal for TestHal {
    fn as_create(&self) -> Result<Box<dyn AddrSpace>> {
        let space = FakeAddrSpace::new(USER_SIZE);
        *self.inner.last_memory.lock().unwrap() = Some(space.contents());
        Ok(Box::new(space))
    }

    fn thread_fork(&self, _name: &str, proc: Arc<Proc>, _tf: Box<Trapframe>) -> Result<()> {
        if self.inner.fail_thread_fork.swap(false, Ordering::SeqCst) {
            return Err(KernelError::OutOfMemory);
        }
        self.inner.spawned.lock().unwrap().push(Arc::clone(&proc));
        if let Some(body) = self.inner.bodies.lock().unwrap().pop_front() {
            let kernel = self
                .inner
                .kernel
                .lock()
                .unwrap()
                .as_ref()
                .expect("TestHal::bind was not called")
                .upgrade()
                .expect("kernel dropped");
            let handle = std::thread::spawn(move || body(kernel, proc));
            self.inner.handles.lock().unwrap().push(handle);
        }
        Ok(())
    }

    fn vfs(&self) -> &dyn Vfs {
        &self.inner.vfs
    }
}

/// A kernel over a fresh test platform.
pub fn kernel() -> (Arc<Kernel>, TestHal) {
    let hal = TestHal::new();
    let kernel = Arc::new(Kernel::new(Box::new(hal.clone())));
    hal.bind(&kernel);
    (kernel, hal)
}

/// Creates a process with an address space and a table entry, the way the
/// boot path brings up the first process.
pub fn boot_proc(kernel: &Kernel, hal: &TestHal, name: &str) -> Arc<Proc> {
    let proc = Proc::new(name);
    let space = hal.as_create().unwrap();
    let _ = proc.set_addrspace(space);
    kernel.procs().add(&proc).unwrap();
    proc
}
