//! Batched machine→physical (m2p) update queue. The hypervisor is told, in
//! atomic batches, which pfn a given mfn now corresponds to.

use crate::error::Result;
use crate::frame::{Mfn, Pfn};
use crate::sys::MMU_MACHPHYS_UPDATE;
use xencall::sys::MmuUpdate;
use xencall::XenCall;

pub struct MmuUpdateQueue<'a> {
    call: &'a XenCall,
    domid: u32,
    pending: Vec<MmuUpdate>,
}

impl<'a> MmuUpdateQueue<'a> {
    pub fn new(call: &'a XenCall, domid: u32) -> Self {
        MmuUpdateQueue {
            call,
            domid,
            pending: Vec::new(),
        }
    }

    pub fn add(&mut self, mfn: Mfn, pfn: Pfn) {
        self.pending.push(MmuUpdate {
            ptr: (mfn.get() << 12) | MMU_MACHPHYS_UPDATE,
            val: pfn.get(),
        });
    }

    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.call.mmu_update(self.domid, &mut self.pending).await?;
        self.pending.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
