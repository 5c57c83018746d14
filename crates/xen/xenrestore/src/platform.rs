//! Queries the hypervisor for the facts the rest of the engine treats as
//! constant for the lifetime of a restore: the top of machine memory, the
//! hypervisor's reserved virtual range, and the guest's page-table depth.

use crate::error::Result;
use crate::frame::Mfn;
use xencall::XenCall;

#[derive(Copy, Clone, Debug)]
pub struct Platform {
    pub max_mfn: Mfn,
    pub hvirt_start: u64,
    pub pt_levels: u32,
}

pub struct PlatformProbe<'a> {
    call: &'a XenCall,
}

impl<'a> PlatformProbe<'a> {
    pub fn new(call: &'a XenCall) -> Self {
        PlatformProbe { call }
    }

    /// `pt_levels` cannot be recovered from the hypervisor alone (a 32-bit
    /// address size is ambiguous between 2-level and 3-level/PAE guests), so
    /// the caller supplies it from the domain configuration it is restoring.
    pub async fn probe(&self, pt_levels: u32) -> Result<Platform> {
        let max_page = self.call.maximum_ram_page().await?;
        let params = self.call.get_platform_parameters().await?;
        Ok(Platform {
            max_mfn: Mfn::new(max_page),
            hvirt_start: params.virt_start,
            pt_levels,
        })
    }
}
