//! Page-aligned MMIO mappings shared by the memory-mapped bridge drivers.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

/// One mapped window of a physical-memory-like file (`/dev/mem`, a PCI
/// resource file), with volatile 32-bit accessors.
pub(crate) struct PhysMap {
    ptr: *mut u8,
    map_len: usize,
    page_offset: usize,
    len: usize,
}

impl PhysMap {
    /// Map `len` bytes of `file` starting at `offset`.
    ///
    /// The mapping is widened to page boundaries internally; accessor
    /// offsets are relative to the requested `offset`.
    pub(crate) fn map(file: &File, offset: u64, len: usize) -> io::Result<Self> {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let page_mask = page_size - 1;

        let page_offset = (offset as usize) & page_mask;
        let aligned_offset = offset & !(page_mask as u64);
        let map_len = (len + page_offset + page_mask) & !page_mask;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned_offset as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            ptr: ptr as *mut u8,
            map_len,
            page_offset,
            len,
        })
    }

    /// Number of bytes the mapping was requested to cover.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.len);
        debug_assert!(offset & 3 == 0, "unaligned MMIO read");
        unsafe {
            std::ptr::read_volatile(self.ptr.add(self.page_offset + offset) as *const u32)
        }
    }

    pub(crate) fn write32(&self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.len);
        debug_assert!(offset & 3 == 0, "unaligned MMIO write");
        unsafe {
            std::ptr::write_volatile(self.ptr.add(self.page_offset + offset) as *mut u32, value);
        }
    }
}

impl Drop for PhysMap {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.map_len);
        }
    }
}

impl std::fmt::Debug for PhysMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysMap").field("len", &self.len).finish()
    }
}

// The mapping targets MMIO registers, not aliased host memory.
unsafe impl Send for PhysMap {}
