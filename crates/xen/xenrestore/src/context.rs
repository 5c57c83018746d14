//! The engine's explicit, reentrant state: everything the source kept as
//! process-wide globals (`max_mfn`, `hvirt_start`, `pt_levels`, `p2m`, ...)
//! bundled so two restores can run concurrently against the same process.

use crate::mmu::MmuUpdateQueue;
use crate::p2m::P2MTable;
use crate::platform::Platform;
use xencall::XenCall;

pub struct RestoreContext<'a> {
    pub call: &'a XenCall,
    pub domid: u32,
    pub platform: Platform,
    pub pae_extended_cr3: bool,
    pub p2m: P2MTable,
    pub mmu: MmuUpdateQueue<'a>,
    /// Count of PTERewriter races recovered during this restore (§8, S4).
    pub nraces: u64,
}

impl<'a> RestoreContext<'a> {
    pub fn new(
        call: &'a XenCall,
        domid: u32,
        platform: Platform,
        pae_extended_cr3: bool,
        p2m: P2MTable,
    ) -> Self {
        RestoreContext {
            call,
            domid,
            platform,
            pae_extended_cr3,
            mmu: MmuUpdateQueue::new(call, domid),
            p2m,
            nraces: 0,
        }
    }

    pub fn pt_levels(&self) -> u32 {
        self.platform.pt_levels
    }
}
