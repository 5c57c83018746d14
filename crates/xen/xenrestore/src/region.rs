//! Scoped foreign-memory mappings: map a set of mfns into our address space,
//! work on them, then unmap before returning on every path.

use crate::error::{Error, Result};
use crate::frame::Mfn;
use crate::sys::PAGE_SIZE;
use libc::{c_void, munmap};
use nix::errno::Errno;
use std::slice;
use xencall::XenCall;

pub struct MappedRegion {
    ptr: u64,
    pages: usize,
    unmapped: bool,
}

impl MappedRegion {
    pub async fn map_batch(call: &XenCall, domid: u32, mfns: &[Mfn]) -> Result<Self> {
        let pfns: Vec<u64> = mfns.iter().map(|m| m.get()).collect();
        let len = pfns.len() as u64 * PAGE_SIZE;
        let addr = call
            .mmap(0, len)
            .await
            .ok_or(Error::Resource("mmap reservation failed"))?;
        call.mmap_batch(domid, pfns.len() as u64, addr, pfns)
            .await?;
        Ok(MappedRegion {
            ptr: addr,
            pages: mfns.len(),
            unmapped: false,
        })
    }

    pub fn page_mut(&mut self, index: usize) -> &mut [u8] {
        assert!(index < self.pages);
        unsafe {
            let base = (self.ptr as *mut u8).add(index * PAGE_SIZE as usize);
            slice::from_raw_parts_mut(base, PAGE_SIZE as usize)
        }
    }

    pub fn unmap(mut self) -> Result<()> {
        self.unmap_inner()
    }

    fn unmap_inner(&mut self) -> Result<()> {
        if self.unmapped {
            return Ok(());
        }
        unsafe {
            let rc = munmap(self.ptr as *mut c_void, self.pages * PAGE_SIZE as usize);
            if rc != 0 {
                return Err(Error::XenCall(xencall::error::Error::Kernel(Errno::last())));
            }
        }
        self.unmapped = true;
        Ok(())
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        let _ = self.unmap_inner();
    }
}
