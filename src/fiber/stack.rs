use std::io;
use std::ptr;

/// A private, guarded stack for a [`super::Fiber`].
///
/// Allocated with `mmap` so that an unmapped guard page can be placed
/// below it; a fiber that overruns its stack segfaults immediately
/// rather than corrupting an adjacent allocation.
#[derive(Debug)]
pub(crate) struct Stack {
    ptr: *mut libc::c_void,
    len: usize,
}

impl Stack {
    pub(crate) fn new(len: usize) -> io::Result<Stack> {
        let page_size = page_size();
        let len = round_up(len, page_size);
        // One extra guard page below the usable region.
        let map_len = len + page_size;

        // SAFETY: `mmap` with `MAP_PRIVATE | MAP_ANONYMOUS` allocates
        // fresh, zeroed pages not backed by any file.
        let map = unsafe {
            libc::mmap(
                ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if map == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: `map` is a valid mapping of `map_len` bytes; the guard
        // page is the first page of it.
        let guard_result = unsafe { libc::mprotect(map, page_size, libc::PROT_NONE) };
        if guard_result == -1 {
            let err = io::Error::last_os_error();
            unsafe { libc::munmap(map, map_len) };
            return Err(err);
        }

        Ok(Stack { ptr: map, len: map_len })
    }

    /// Returns the base address and usable length (excluding the guard
    /// page), for `uc_stack.ss_sp` / `ss_size`.
    pub(crate) fn base_and_len(&self) -> (*mut libc::c_void, usize) {
        let page_size = page_size();
        // SAFETY: the guard page occupies the first `page_size` bytes.
        let base = unsafe { self.ptr.add(page_size) };
        (base, self.len - page_size)
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        // SAFETY: `self.ptr`/`self.len` describe the mapping created in
        // `new` and have not been unmapped yet.
        unsafe {
            libc::munmap(self.ptr, self.len);
        }
    }
}

fn page_size() -> usize {
    // SAFETY: `sysconf` with `_SC_PAGESIZE` is always safe to call.
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

fn round_up(value: usize, multiple: usize) -> usize {
    ((value + multiple - 1) / multiple) * multiple
}
